use askama::Template;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect};
use axum::Form;
use tracing::{debug, info};

use crate::error::{AppResult, RenderHtml};
use crate::handlers::back_to_dashboard;
use crate::models::DashboardFilter;
use crate::services::dashboard::{DashboardSnapshot, Notice, EXPORT_FILE_NAME};
use crate::state::AppState;
use crate::VERSION;

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub title: String,
    pub version: &'static str,
    pub xsrf_token: String,
    pub api_base_url: String,
    pub notice: Option<Notice>,
    pub dashboard: DashboardSnapshot,
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let notice = state.dashboard.take_notice();
    let dashboard = state.dashboard.snapshot();

    debug!(
        loaded = dashboard.loaded,
        rows = dashboard.rows.len(),
        page = dashboard.page.current_page,
        "Rendering dashboard"
    );

    let template = DashboardTemplate {
        title: "Dashboard".into(),
        version: VERSION,
        xsrf_token: state.xsrf_value(),
        api_base_url: state.config.api_base_url.clone(),
        notice,
        dashboard,
    };

    template.render_html()
}

pub async fn change_filter(
    State(state): State<AppState>,
    Form(filter): Form<DashboardFilter>,
) -> AppResult<Redirect> {
    info!(?filter, "Filter changed");
    let result = state.dashboard.change_filter(filter).await;
    back_to_dashboard(&state, result)
}

pub async fn next_page(State(state): State<AppState>) -> AppResult<Redirect> {
    let result = state.dashboard.next_page().await;
    back_to_dashboard(&state, result)
}

pub async fn prev_page(State(state): State<AppState>) -> AppResult<Redirect> {
    let result = state.dashboard.prev_page().await;
    back_to_dashboard(&state, result)
}

pub async fn refresh(State(state): State<AppState>) -> AppResult<Redirect> {
    let result = state.dashboard.refresh().await;
    back_to_dashboard(&state, result)
}

pub async fn forecast(State(state): State<AppState>) -> AppResult<Redirect> {
    let result = state.dashboard.fetch_forecast().await;
    back_to_dashboard(&state, result)
}

/// Download the rows matching the filter in the query string; the dashboard
/// links here with its current filter.
pub async fn export(
    State(state): State<AppState>,
    Query(filter): Query<DashboardFilter>,
) -> AppResult<impl IntoResponse> {
    let csv = state.dashboard.export(&filter).await?;
    info!(?filter, size_bytes = csv.len(), "Exporting transactions");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        csv,
    ))
}
