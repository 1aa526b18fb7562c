use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, Json};
use serde::{Deserialize, Serialize};

use crate::db::queries::api_logs;
use crate::error::{AppError, AppResult, RenderHtml};
use crate::models::ApiLog;
use crate::state::AppState;
use crate::VERSION;

const LOG_PAGE_LIMIT: i64 = 100;

#[derive(Template)]
#[template(path = "pages/api_logs.html")]
pub struct ApiLogsTemplate {
    pub title: String,
    pub version: &'static str,
    pub xsrf_token: String,
    pub logs: Vec<ApiLog>,
    pub latest_log_id: i64,
}

pub async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let conn = state.db.get()?;
    let logs = api_logs::get_all_logs(&conn, LOG_PAGE_LIMIT)?;
    let latest_log_id = api_logs::get_latest_log_id(&conn)?;

    let template = ApiLogsTemplate {
        title: "Service Requests".into(),
        version: VERSION,
        xsrf_token: state.xsrf_value(),
        logs,
        latest_log_id,
    };

    template.render_html()
}

#[derive(Template)]
#[template(path = "pages/api_log_detail.html")]
pub struct ApiLogDetailTemplate {
    pub title: String,
    pub version: &'static str,
    pub xsrf_token: String,
    pub log: ApiLog,
}

pub async fn detail(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Html<String>> {
    let conn = state.db.get()?;
    let log = api_logs::get_log_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Request log entry not found".into()))?;

    let template = ApiLogDetailTemplate {
        title: format!("Request #{}", id),
        version: VERSION,
        xsrf_token: state.xsrf_value(),
        log,
    };

    template.render_html()
}

#[derive(Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    since_id: i64,
}

#[derive(Serialize)]
pub struct PollResponse {
    pub new_errors: Vec<ApiLogSummary>,
    pub latest_id: i64,
}

#[derive(Serialize)]
pub struct ApiLogSummary {
    pub id: i64,
    pub action: String,
    pub error_message: String,
}

pub async fn poll_errors(
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> AppResult<Json<PollResponse>> {
    let conn = state.db.get()?;
    let failed_logs = api_logs::get_failed_logs_since(&conn, query.since_id)?;
    let latest_id = api_logs::get_latest_log_id(&conn)?;

    let new_errors: Vec<ApiLogSummary> = failed_logs
        .into_iter()
        .map(|log| ApiLogSummary {
            id: log.id,
            action: log.action,
            error_message: log
                .response_summary
                .unwrap_or_else(|| "Unknown error".into()),
        })
        .collect();

    Ok(Json(PollResponse {
        new_errors,
        latest_id,
    }))
}
