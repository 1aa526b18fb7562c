pub mod api;
pub mod api_logs;
pub mod dashboard;
pub mod predict;
pub mod upload;

use axum::response::Redirect;
use axum::routing::{get, post};
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::services::dashboard::Notice;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Pages
        .route("/", get(dashboard::index))
        .route("/predict", get(predict::index))
        .route("/api-logs", get(api_logs::index))
        .route("/api-logs/:id", get(api_logs::detail))
        // Dashboard actions
        .route("/upload", post(upload::upload))
        .route("/dashboard/filters", post(dashboard::change_filter))
        .route("/dashboard/next", post(dashboard::next_page))
        .route("/dashboard/prev", post(dashboard::prev_page))
        .route("/dashboard/refresh", post(dashboard::refresh))
        .route("/dashboard/forecast", post(dashboard::forecast))
        .route("/dashboard/export", get(dashboard::export))
        .route("/predict", post(predict::submit))
        // API (JSON)
        .route("/api/dashboard", get(api::dashboard))
        .route("/api/service/health", get(api::service_health))
        .route("/api/api-logs/errors", get(api_logs::poll_errors))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

/// Finish a dashboard form action by going back to the dashboard.
///
/// Failures the user can act on (bad input, a rejected or unreachable
/// service) are shown as a notice on the dashboard instead of an error
/// page; anything else propagates.
pub(crate) fn back_to_dashboard<T>(state: &AppState, result: AppResult<T>) -> AppResult<Redirect> {
    match result {
        Ok(_) => Ok(Redirect::to("/")),
        Err(e @ (AppError::Validation(_) | AppError::Upstream { .. })) => {
            tracing::info!(error = %e, "Dashboard action failed");
            state.dashboard.set_notice(Notice::error(e.user_message()));
            Ok(Redirect::to("/"))
        }
        Err(e) => Err(e),
    }
}
