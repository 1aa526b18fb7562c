use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A categorized transaction as returned by the transactions service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    pub predicted_category: String,
    pub is_anomaly: bool,
}

impl Transaction {
    /// The `YYYY-MM-DD` part of the date. The service may append a time.
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }

    /// The `YYYY-MM` bucket used for monthly totals.
    pub fn month(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }

    pub fn amount_display(&self) -> String {
        crate::filters::format_amount(self.amount)
    }

    pub fn anomaly_marker(&self) -> &'static str {
        crate::filters::anomaly_marker(self.is_anomaly)
    }
}

/// One page of `GET /transactions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    pub total: i64,
    #[serde(default)]
    pub data: Vec<Transaction>,
}

/// Distinct values offered by the filter dropdowns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnomalySummary {
    pub normal: i64,
    pub anomaly: i64,
}

/// Summary returned by the service after a CSV upload. Only the aggregate
/// fields are kept; the row payload is fetched page by page afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_transactions: i64,
    pub anomalies_detected: i64,
    #[serde(default)]
    pub category_summary: BTreeMap<String, f64>,
    #[serde(default)]
    pub anomaly_summary: AnomalySummary,
    #[serde(default)]
    pub monthly_spending: BTreeMap<String, f64>,
}

/// Body for the single-transaction prediction endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryPrediction {
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyPrediction {
    pub is_anomaly: bool,
}

/// Combined outcome of asking the service about one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub is_anomaly: bool,
}

impl Prediction {
    pub fn amount_display(&self) -> String {
        crate::filters::format_amount(self.amount)
    }

    pub fn anomaly_marker(&self) -> &'static str {
        crate::filters::anomaly_marker(self.is_anomaly)
    }
}
