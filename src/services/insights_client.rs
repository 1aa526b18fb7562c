//! HTTP client for the remote transactions service.
//!
//! The service owns classification, anomaly detection and forecasting. This
//! client only shapes requests, decodes responses and records every call in
//! the request log.

use axum::body::Bytes;
use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::db::queries::api_logs;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::api_log::{STATUS_ERROR, STATUS_SUCCESS};
use crate::models::{
    AnomalyPrediction, CategoryPrediction, DashboardFilter, FilterOptions, NewApiLog,
    TransactionInput, TransactionPage, TransactionQuery, UploadSummary,
};

/// Longest response body kept in the request log.
const MAX_LOGGED_BODY: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
}

#[derive(Serialize)]
struct ForecastRequest<'a> {
    monthly_spending: &'a BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    forecast: BTreeMap<String, f64>,
}

/// What a single call was, for logging.
struct CallInfo {
    action: &'static str,
    method: Method,
    path: &'static str,
    params: String,
}

#[derive(Clone)]
pub struct InsightsClient {
    http: Client,
    base_url: Arc<str>,
    db: DbPool,
}

impl InsightsClient {
    pub fn new(base_url: &str, timeout: Duration, db: DbPool) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            db,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> AppResult<ServiceStatus> {
        let call = CallInfo {
            action: "health",
            method: Method::GET,
            path: "/",
            params: String::new(),
        };
        let request = self.http.get(self.url(call.path));
        let body = self.send(&call, request).await?;
        decode(&call, &body)
    }

    /// Forward a CSV file untouched as the multipart field `file`.
    pub async fn upload_csv(&self, file_name: &str, content: Vec<u8>) -> AppResult<UploadSummary> {
        let call = CallInfo {
            action: "upload_csv",
            method: Method::POST,
            path: "/transactions/upload",
            params: format!("file={} ({} bytes)", file_name, content.len()),
        };

        let part = multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(format!("Invalid upload part: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let request = self.http.post(self.url(call.path)).multipart(form);
        let body = self.send(&call, request).await?;
        let summary: UploadSummary = decode(&call, &body)?;

        info!(
            total = summary.total_transactions,
            anomalies = summary.anomalies_detected,
            "CSV accepted by transactions service"
        );
        Ok(summary)
    }

    pub async fn list_transactions(&self, query: &TransactionQuery) -> AppResult<TransactionPage> {
        let pairs = query.query_pairs();
        let call = CallInfo {
            action: "list_transactions",
            method: Method::GET,
            path: "/transactions",
            params: encode_pairs(&pairs),
        };
        let request = self.http.get(self.url(call.path)).query(&pairs);
        let body = self.send(&call, request).await?;
        decode(&call, &body)
    }

    pub async fn filter_options(&self) -> AppResult<FilterOptions> {
        let call = CallInfo {
            action: "filter_options",
            method: Method::GET,
            path: "/transactions/filters",
            params: String::new(),
        };
        let request = self.http.get(self.url(call.path));
        let body = self.send(&call, request).await?;
        decode(&call, &body)
    }

    /// The full filtered result set as CSV, newest first.
    pub async fn export_csv(&self, filter: &DashboardFilter) -> AppResult<Bytes> {
        let pairs = filter.query_pairs();
        let call = CallInfo {
            action: "export_csv",
            method: Method::GET,
            path: "/transactions/export",
            params: encode_pairs(&pairs),
        };
        let request = self.http.get(self.url(call.path)).query(&pairs);
        self.send(&call, request).await
    }

    /// Ask for a forecast continuing `monthly` (keys `YYYY-MM`). Returned
    /// keys are reduced to their `YYYY-MM-DD` part.
    pub async fn forecast_monthly(
        &self,
        monthly: &BTreeMap<String, f64>,
    ) -> AppResult<BTreeMap<String, f64>> {
        let call = CallInfo {
            action: "forecast_monthly",
            method: Method::POST,
            path: "/forecast/monthly",
            params: format!("{} months", monthly.len()),
        };
        let request = self
            .http
            .post(self.url(call.path))
            .json(&ForecastRequest {
                monthly_spending: monthly,
            });
        let body = self.send(&call, request).await?;
        let response: ForecastResponse = decode(&call, &body)?;

        Ok(response
            .forecast
            .into_iter()
            .map(|(date, value)| (date.get(..10).unwrap_or(&date).to_string(), value))
            .collect())
    }

    pub async fn predict_category(&self, input: &TransactionInput) -> AppResult<String> {
        let call = CallInfo {
            action: "predict_category",
            method: Method::POST,
            path: "/predict/category",
            params: format!("{} ({})", input.description, input.amount),
        };
        let request = self.http.post(self.url(call.path)).json(input);
        let body = self.send(&call, request).await?;
        let prediction: CategoryPrediction = decode(&call, &body)?;
        Ok(prediction.category)
    }

    pub async fn predict_anomaly(&self, input: &TransactionInput) -> AppResult<bool> {
        let call = CallInfo {
            action: "predict_anomaly",
            method: Method::POST,
            path: "/predict/anomaly",
            params: format!("{} ({})", input.description, input.amount),
        };
        let request = self.http.post(self.url(call.path)).json(input);
        let body = self.send(&call, request).await?;
        let prediction: AnomalyPrediction = decode(&call, &body)?;
        Ok(prediction.is_anomaly)
    }

    /// Perform the request, record it, and return the body of a 2xx
    /// response. Non-2xx responses become `AppError::Upstream` carrying the
    /// service's `detail` message when it sent one.
    async fn send(&self, call: &CallInfo, request: RequestBuilder) -> AppResult<Bytes> {
        debug!(action = call.action, method = %call.method, path = call.path, "Calling transactions service");
        let start_time = Instant::now();

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) => Ok((status, body)),
                    Err(e) => Err(AppError::from(e)),
                }
            }
            Err(e) => Err(AppError::from(e)),
        };
        let duration_ms = start_time.elapsed().as_millis() as i64;

        match outcome {
            Ok((status, body)) if status.is_success() => {
                self.record(
                    call,
                    STATUS_SUCCESS,
                    Some(status.as_u16()),
                    format!("{} ({} bytes)", status, body.len()),
                    None,
                    duration_ms,
                );
                Ok(body)
            }
            Ok((status, body)) => {
                let message = error_detail(&body).unwrap_or_else(|| {
                    format!("Transactions service returned {}", status)
                });
                warn!(action = call.action, %status, message = %message, "Transactions service rejected request");
                self.record(
                    call,
                    STATUS_ERROR,
                    Some(status.as_u16()),
                    message.clone(),
                    Some(truncate_body(&body)),
                    duration_ms,
                );
                Err(AppError::upstream(Some(status.as_u16()), message))
            }
            Err(e) => {
                warn!(action = call.action, error = %e, "Transactions service call failed");
                self.record(call, STATUS_ERROR, None, e.user_message(), Some(e.to_string()), duration_ms);
                Err(e)
            }
        }
    }

    fn record(
        &self,
        call: &CallInfo,
        status: &str,
        http_status: Option<u16>,
        summary: String,
        details: Option<String>,
        duration_ms: i64,
    ) {
        let entry = NewApiLog {
            action: call.action.to_string(),
            method: call.method.to_string(),
            endpoint: call.path.to_string(),
            request_params: call.params.clone(),
            status: status.to_string(),
            http_status: http_status.map(i64::from),
            response_summary: Some(summary),
            response_details: details,
            duration_ms: Some(duration_ms),
        };

        let result = self
            .db
            .get()
            .map_err(AppError::from)
            .and_then(|conn| api_logs::insert_api_log(&conn, &entry).map_err(AppError::from));
        if let Err(e) = result {
            warn!(action = call.action, error = %e, "Failed to record request log entry");
        }
    }
}

fn decode<T: DeserializeOwned>(call: &CallInfo, body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(action = call.action, error = %e, "Failed to decode transactions service response");
        AppError::upstream(None, format!("Unexpected response from {}: {}", call.path, e))
    })
}

fn encode_pairs(pairs: &[(&'static str, String)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_LOGGED_BODY {
        return text.into_owned();
    }
    let mut end = MAX_LOGGED_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Pull a readable message out of an error body. The service answers
/// `{"detail": "..."}` for its own errors and `{"detail": [{"msg": ...}]}`
/// for request validation failures.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(String::from)
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        let body = br#"{"detail": "This file has already been uploaded."}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("This file has already been uploaded.")
        );
    }

    #[test]
    fn test_error_detail_validation_list() {
        let body = br#"{"detail": [{"loc": ["query", "limit"], "msg": "value is not a valid integer"}]}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("value is not a valid integer")
        );
    }

    #[test]
    fn test_error_detail_missing() {
        assert!(error_detail(b"Internal Server Error").is_none());
        assert!(error_detail(br#"{"error": "x"}"#).is_none());
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_LOGGED_BODY);
        let truncated = truncate_body(body.as_bytes());
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= MAX_LOGGED_BODY + 3);
    }
}
