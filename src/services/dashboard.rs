//! The dashboard controller.
//!
//! Holds the in-memory dashboard state (filter, page, latest rows, charts)
//! and runs every user action against the transactions service. State lives
//! for the lifetime of the process.
//!
//! Remote calls are made without holding the lock. Each table reload takes
//! a generation number when it starts; a response that arrives after a newer
//! reload was started is dropped, so overlapping filter changes cannot paint
//! an older result over a newer one. The filter and page a reload asked for
//! are committed together with its rows, so a failed reload leaves the
//! previous page on screen unchanged.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{
    select_options, DashboardFilter, FilterOptions, Prediction, SelectOption, Transaction,
    TransactionInput, TransactionPage, TransactionQuery, UploadSummary,
};
use crate::pagination::PageState;
use crate::services::charts::{self, ChartConfig, SummaryCharts};
use crate::services::insights_client::InsightsClient;
use crate::services::summary::PageSummary;

pub const EXPORT_FILE_NAME: &str = "transactions_export.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub filter: DashboardFilter,
    pub pages: PageState,
    pub options: FilterOptions,
    pub rows: Vec<Transaction>,
    pub summary: PageSummary,
    /// Charts currently drawn for the visible page.
    pub charts: Option<SummaryCharts>,
    /// Forecast chart, replaced only by a forecast fetch.
    pub forecast: Option<ChartConfig>,
    pub forecast_values: BTreeMap<String, f64>,
    pub last_upload: Option<UploadSummary>,
    pub notice: Option<Notice>,
    /// True once a table load has succeeded.
    pub loaded: bool,
    generation: u64,
}

impl Dashboard {
    pub fn new(page_size: i64) -> Self {
        Self {
            filter: DashboardFilter::default(),
            pages: PageState::new(page_size),
            options: FilterOptions::default(),
            rows: Vec::new(),
            summary: PageSummary::default(),
            charts: None,
            forecast: None,
            forecast_values: BTreeMap::new(),
            last_upload: None,
            notice: None,
            loaded: false,
            generation: 0,
        }
    }

    /// Start a reload of `filter` at `pages`. Nothing visible changes until
    /// [`Dashboard::finish_reload`].
    fn begin_reload(&mut self, filter: DashboardFilter, pages: PageState) -> Reload {
        self.generation += 1;
        Reload {
            generation: self.generation,
            filter,
            pages,
        }
    }

    /// Commit a fetched page with the filter and page index it was fetched
    /// for, unless a newer reload has started since. Returns whether the
    /// page was applied.
    fn finish_reload(&mut self, reload: Reload, page: TransactionPage) -> bool {
        if reload.generation != self.generation {
            return false;
        }
        self.filter = reload.filter;
        self.pages = reload.pages;
        self.pages.set_total(page.total);
        self.summary = PageSummary::from_rows(&page.data);
        self.charts = Some(charts::summary_charts(&self.summary));
        self.rows = page.data;
        self.loaded = true;
        true
    }

    fn set_forecast(&mut self, values: BTreeMap<String, f64>) {
        self.forecast = Some(charts::forecast_chart(&values));
        self.forecast_values = values;
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            loaded: self.loaded,
            total_transactions: self.pages.total_rows,
            anomalies_on_page: self.summary.anomalies.anomaly,
            page: self.pages,
            page_label: self.pages.label(),
            has_next: self.pages.has_next(),
            has_prev: self.pages.has_prev(),
            filter: self.filter.clone(),
            category_options: select_options(
                &self.options.categories,
                self.filter.category.as_deref(),
            ),
            account_options: select_options(
                &self.options.accounts,
                self.filter.account.as_deref(),
            ),
            rows: self.rows.clone(),
            summary: self.summary.clone(),
            charts: self.charts.clone(),
            forecast: self.forecast.clone(),
            forecast_values: self.forecast_values.clone(),
            last_upload: self.last_upload.clone(),
            notice: self.notice.clone(),
        }
    }
}

/// A table load in flight: the filter and page it targets.
#[derive(Debug, Clone)]
struct Reload {
    generation: u64,
    filter: DashboardFilter,
    pages: PageState,
}

impl Reload {
    fn query(&self) -> TransactionQuery {
        TransactionQuery {
            filter: self.filter.clone(),
            limit: self.pages.page_size,
            offset: self.pages.offset(),
        }
    }
}

/// A copy of the dashboard state for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub loaded: bool,
    pub total_transactions: i64,
    pub anomalies_on_page: i64,
    pub page: PageState,
    pub page_label: String,
    pub has_next: bool,
    pub has_prev: bool,
    pub filter: DashboardFilter,
    pub category_options: Vec<SelectOption>,
    pub account_options: Vec<SelectOption>,
    pub rows: Vec<Transaction>,
    pub summary: PageSummary,
    pub charts: Option<SummaryCharts>,
    pub forecast: Option<ChartConfig>,
    pub forecast_values: BTreeMap<String, f64>,
    pub last_upload: Option<UploadSummary>,
    pub notice: Option<Notice>,
}

impl DashboardSnapshot {
    pub fn has_forecast(&self) -> bool {
        self.forecast.is_some()
    }

    pub fn can_forecast(&self) -> bool {
        !self.summary.is_empty()
    }

    /// Forecast points formatted for the table under the chart.
    pub fn forecast_rows(&self) -> Vec<(String, String)> {
        self.forecast_values
            .iter()
            .map(|(date, value)| (date.clone(), crate::filters::format_amount(*value)))
            .collect()
    }

    /// Chart configurations keyed by canvas id, for the chart bootstrap script.
    pub fn charts_json(&self) -> String {
        let mut charts = serde_json::Map::new();
        if let Some(summary) = &self.charts {
            if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(summary) {
                charts.extend(map);
            }
        }
        if let Some(forecast) = &self.forecast {
            if let Ok(value) = serde_json::to_value(forecast) {
                charts.insert(charts::FORECAST_CANVAS.to_string(), value);
            }
        }
        // A `</script>` inside a label must not end the embedding script tag.
        serde_json::Value::Object(charts)
            .to_string()
            .replace("</", "<\\/")
    }

    pub fn export_query(&self) -> String {
        serde_urlencoded::to_string(self.filter.query_pairs()).unwrap_or_default()
    }
}

/// Shared handle to the dashboard state plus the client it drives.
#[derive(Clone)]
pub struct DashboardController {
    state: Arc<Mutex<Dashboard>>,
    client: InsightsClient,
}

impl DashboardController {
    pub fn new(client: InsightsClient, page_size: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(Dashboard::new(page_size))),
            client,
        }
    }

    pub fn client(&self) -> &InsightsClient {
        &self.client
    }

    fn lock(&self) -> MutexGuard<'_, Dashboard> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.lock().snapshot()
    }

    pub fn set_notice(&self, notice: Notice) {
        self.lock().notice = Some(notice);
    }

    pub fn take_notice(&self) -> Option<Notice> {
        self.lock().notice.take()
    }

    /// Send a CSV file to the service, then show its first page.
    pub async fn upload(&self, file_name: &str, content: Vec<u8>) -> AppResult<UploadSummary> {
        if content.is_empty() {
            return Err(AppError::Validation("Choose a CSV file to upload".into()));
        }

        info!(file_name = %file_name, size_bytes = content.len(), "Uploading transactions");
        let summary = self.client.upload_csv(file_name, content).await?;

        {
            let mut dashboard = self.lock();
            dashboard.last_upload = Some(summary.clone());
            dashboard.notice = Some(Notice::info(format!(
                "Uploaded {} transactions, {} flagged as anomalies",
                summary.total_transactions, summary.anomalies_detected
            )));
        }

        self.load_filter_options().await?;
        let (filter, mut pages) = self.current_view();
        pages.reset();
        self.load(filter, pages).await?;

        Ok(summary)
    }

    /// Reload the category and account dropdowns.
    pub async fn load_filter_options(&self) -> AppResult<()> {
        let options = self.client.filter_options().await?;
        debug!(
            categories = options.categories.len(),
            accounts = options.accounts.len(),
            "Loaded filter options"
        );
        self.lock().options = options;
        Ok(())
    }

    fn current_view(&self) -> (DashboardFilter, PageState) {
        let dashboard = self.lock();
        (dashboard.filter.clone(), dashboard.pages)
    }

    /// Replace the filter and show its first page.
    pub async fn change_filter(&self, filter: DashboardFilter) -> AppResult<()> {
        filter.validate()?;
        let (_, mut pages) = self.current_view();
        pages.reset();
        self.load(filter, pages).await
    }

    /// Fetch the current page for the current filter and redraw the table
    /// and summary charts.
    pub async fn apply_filters(&self) -> AppResult<()> {
        let (filter, pages) = self.current_view();
        self.load(filter, pages).await
    }

    /// Fetch `filter` at `pages` and, on success, make both current along
    /// with the rows, summary and charts.
    async fn load(&self, filter: DashboardFilter, pages: PageState) -> AppResult<()> {
        let reload = self.lock().begin_reload(filter, pages);
        let query = reload.query();
        debug!(
            generation = reload.generation,
            offset = query.offset,
            limit = query.limit,
            "Applying filters"
        );

        let page = self.client.list_transactions(&query).await?;

        let generation = reload.generation;
        let total = page.total;
        if self.lock().finish_reload(reload, page) {
            debug!(generation, total, "Dashboard updated");
        } else {
            debug!(generation, "Discarded stale transactions page");
        }
        Ok(())
    }

    pub async fn next_page(&self) -> AppResult<bool> {
        let (filter, mut pages) = self.current_view();
        if !pages.next() {
            return Ok(false);
        }
        self.load(filter, pages).await?;
        Ok(true)
    }

    pub async fn prev_page(&self) -> AppResult<bool> {
        let (filter, mut pages) = self.current_view();
        if !pages.prev() {
            return Ok(false);
        }
        self.load(filter, pages).await?;
        Ok(true)
    }

    /// Reload dropdowns and the current page without changing the filter.
    pub async fn refresh(&self) -> AppResult<()> {
        self.load_filter_options().await?;
        self.apply_filters().await
    }

    /// Request a forecast continuing the monthly totals on screen.
    pub async fn fetch_forecast(&self) -> AppResult<BTreeMap<String, f64>> {
        let monthly = self.lock().summary.monthly.clone();
        if monthly.is_empty() {
            return Err(AppError::Validation(
                "Load transactions before requesting a forecast".into(),
            ));
        }

        let forecast = self.client.forecast_monthly(&monthly).await?;
        info!(months = monthly.len(), points = forecast.len(), "Received forecast");
        self.lock().set_forecast(forecast.clone());
        Ok(forecast)
    }

    /// CSV of every row matching `filter`.
    pub async fn export(&self, filter: &DashboardFilter) -> AppResult<axum::body::Bytes> {
        filter.validate()?;
        self.client.export_csv(filter).await
    }

    /// Category and anomaly verdict for a single transaction.
    pub async fn predict(&self, description: String, amount: f64) -> AppResult<Prediction> {
        let input = TransactionInput {
            description,
            amount,
        };
        let (category, is_anomaly) = tokio::try_join!(
            self.client.predict_category(&input),
            self.client.predict_anomaly(&input)
        )?;

        Ok(Prediction {
            description: input.description,
            amount: input.amount,
            category,
            is_anomaly,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: &str, category: &str, amount: f64, is_anomaly: bool) -> Transaction {
        Transaction {
            id: None,
            date: date.into(),
            description: "row".into(),
            amount,
            transaction_type: None,
            account_name: None,
            predicted_category: category.into(),
            is_anomaly,
        }
    }

    #[test]
    fn test_new_dashboard_is_empty() {
        let snapshot = Dashboard::new(20).snapshot();
        assert!(!snapshot.loaded);
        assert_eq!(snapshot.page_label, "Page 1 of 1");
        assert!(!snapshot.has_next);
        assert!(!snapshot.can_forecast());
        assert_eq!(snapshot.charts_json(), "{}");
    }

    fn reload_current(dashboard: &mut Dashboard) -> Reload {
        let (filter, pages) = (dashboard.filter.clone(), dashboard.pages);
        dashboard.begin_reload(filter, pages)
    }

    #[test]
    fn test_reload_applies_page_and_charts() {
        let mut dashboard = Dashboard::new(20);
        let reload = reload_current(&mut dashboard);
        let query = reload.query();
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 20);

        let applied = dashboard.finish_reload(
            reload,
            TransactionPage {
                total: 45,
                data: vec![
                    tx("2024-02-01", "Rent", 900.0, false),
                    tx("2024-01-05", "Travel", 2500.0, true),
                ],
            },
        );

        assert!(applied);
        let snapshot = dashboard.snapshot();
        assert!(snapshot.loaded);
        assert_eq!(snapshot.total_transactions, 45);
        assert_eq!(snapshot.anomalies_on_page, 1);
        assert!(snapshot.has_next);
        assert_eq!(snapshot.page_label, "Page 1 of 3");
        assert!(snapshot.charts.is_some());
    }

    #[test]
    fn test_target_filter_and_page_committed_with_rows() {
        let mut dashboard = Dashboard::new(20);
        dashboard.pages.set_total(45);

        let filter = DashboardFilter {
            category: Some("Rent".into()),
            ..Default::default()
        };
        let mut pages = dashboard.pages;
        pages.next();
        let reload = dashboard.begin_reload(filter.clone(), pages);
        assert_eq!(reload.query().offset, 20);

        // In flight: still the old view
        assert_eq!(dashboard.pages.current_page, 1);
        assert!(dashboard.filter.is_empty());

        dashboard.finish_reload(
            reload,
            TransactionPage {
                total: 45,
                data: vec![tx("2024-02-01", "Rent", 900.0, false)],
            },
        );
        assert_eq!(dashboard.pages.current_page, 2);
        assert_eq!(dashboard.filter, filter);
    }

    #[test]
    fn test_stale_reload_is_discarded() {
        let mut dashboard = Dashboard::new(20);
        let pages = dashboard.pages;
        let first = dashboard.begin_reload(
            DashboardFilter {
                account: Some("Savings".into()),
                ..Default::default()
            },
            pages,
        );
        let second = reload_current(&mut dashboard);

        assert!(dashboard.finish_reload(
            second,
            TransactionPage {
                total: 1,
                data: vec![tx("2024-02-01", "Rent", 900.0, false)],
            },
        ));
        assert!(!dashboard.finish_reload(
            first,
            TransactionPage {
                total: 99,
                data: vec![],
            },
        ));

        assert_eq!(dashboard.pages.total_rows, 1);
        assert_eq!(dashboard.rows.len(), 1);
        assert!(dashboard.filter.account.is_none());
    }

    #[test]
    fn test_forecast_replaced_independently_of_summary_charts() {
        let mut dashboard = Dashboard::new(20);
        dashboard.set_forecast(BTreeMap::from([("2024-03-31".to_string(), 812.4)]));

        let reload = reload_current(&mut dashboard);
        dashboard.finish_reload(reload, TransactionPage::default());

        let snapshot = dashboard.snapshot();
        assert!(snapshot.has_forecast());
        assert_eq!(
            snapshot.forecast_rows(),
            vec![("2024-03-31".to_string(), "812.40".to_string())]
        );
        let json: serde_json::Value = serde_json::from_str(&snapshot.charts_json()).unwrap();
        assert!(json.get("forecastChart").is_some());
        assert!(json.get("categoryChart").is_some());
    }

    #[test]
    fn test_charts_json_escapes_script_end() {
        let mut dashboard = Dashboard::new(20);
        let reload = reload_current(&mut dashboard);
        dashboard.finish_reload(
            reload,
            TransactionPage {
                total: 1,
                data: vec![tx("2024-02-01", "</script><b>", 1.0, false)],
            },
        );
        let json = dashboard.snapshot().charts_json();
        assert!(!json.contains("</script>"));
    }

    #[test]
    fn test_export_query_uses_filter_only() {
        let mut dashboard = Dashboard::new(20);
        dashboard.filter.category = Some("Dining Out".into());
        dashboard.pages.set_total(100);
        dashboard.pages.next();
        assert_eq!(dashboard.snapshot().export_query(), "category=Dining+Out");
    }
}
