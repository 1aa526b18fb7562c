use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// A single call made to the transactions service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLog {
    pub id: i64,
    pub action: String,
    pub method: String,
    pub endpoint: String,
    pub request_params: String,
    pub status: String,
    pub http_status: Option<i64>,
    pub response_summary: Option<String>,
    pub response_details: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: String,
}

impl ApiLog {
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }

    pub fn status_class(&self) -> &'static str {
        if self.is_error() {
            "status-error"
        } else {
            "status-ok"
        }
    }

    pub fn http_status_display(&self) -> String {
        self.http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into())
    }

    pub fn summary_display(&self) -> &str {
        self.response_summary.as_deref().unwrap_or("")
    }

    pub fn details_display(&self) -> &str {
        self.response_details.as_deref().unwrap_or("")
    }

    pub fn duration_display(&self) -> String {
        crate::filters::format_duration_ms(self.duration_ms)
    }
}

/// New log entry for insertion
#[derive(Debug, Clone)]
pub struct NewApiLog {
    pub action: String,
    pub method: String,
    pub endpoint: String,
    pub request_params: String,
    pub status: String,
    pub http_status: Option<i64>,
    pub response_summary: Option<String>,
    pub response_details: Option<String>,
    pub duration_ms: Option<i64>,
}
