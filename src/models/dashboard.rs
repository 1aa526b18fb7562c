use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Filter applied to the transactions table. Unset fields mean "All".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFilter {
    #[serde(
        default,
        deserialize_with = "crate::form_utils::deserialize_optional_date"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "crate::form_utils::deserialize_optional_date"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "crate::form_utils::deserialize_optional_string"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::form_utils::deserialize_optional_string"
    )]
    pub account: Option<String>,
}

impl DashboardFilter {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::Validation(format!(
                    "Start date {} is after end date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Query pairs for the filter fields that are set, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(account) = &self.account {
            pairs.push(("account", account.clone()));
        }
        pairs
    }

    pub fn start_date_value(&self) -> String {
        self.start_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn end_date_value(&self) -> String {
        self.end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Parameters of one `GET /transactions` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    pub filter: DashboardFilter,
    pub limit: i64,
    pub offset: i64,
}

impl TransactionQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        pairs.extend(self.filter.query_pairs());
        pairs
    }
}

/// One `<option>` of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Options for a dropdown: a leading "All" entry with an empty value, then
/// the given values in service order.
pub fn select_options(values: &[String], selected: Option<&str>) -> Vec<SelectOption> {
    let mut options = Vec::with_capacity(values.len() + 1);
    options.push(SelectOption {
        value: String::new(),
        label: "All".into(),
        selected: selected.is_none(),
    });
    options.extend(values.iter().map(|v| SelectOption {
        value: v.clone(),
        label: v.clone(),
        selected: selected == Some(v.as_str()),
    }));
    options
}

/// Form body of the single transaction check.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictForm {
    pub description: String,
    pub amount: String,
}

impl PredictForm {
    pub fn parse(&self) -> AppResult<(String, f64)> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("Description is required".into()));
        }
        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Invalid amount".into()))?;
        if !amount.is_finite() {
            return Err(AppError::Validation("Invalid amount".into()));
        }
        Ok((description.to_string(), amount))
    }
}
