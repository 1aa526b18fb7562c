use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::services::dashboard::DashboardSnapshot;
use crate::state::AppState;

/// Current dashboard state: page info, rows, summaries and chart configs.
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardSnapshot>> {
    Ok(Json(state.dashboard.snapshot()))
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub reachable: bool,
    pub base_url: String,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Whether the transactions service answers at all. Always 200; the body
/// says what happened.
pub async fn service_health(State(state): State<AppState>) -> Json<ServiceHealth> {
    let client = state.dashboard.client();
    let base_url = client.base_url().to_string();

    let health = match client.health().await {
        Ok(status) => ServiceHealth {
            reachable: true,
            base_url,
            status: Some(status.status),
            error: None,
        },
        Err(e) => ServiceHealth {
            reachable: false,
            base_url,
            status: None,
            error: Some(e.user_message()),
        },
    };

    Json(health)
}
