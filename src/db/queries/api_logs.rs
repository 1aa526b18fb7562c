use crate::models::api_log::{ApiLog, NewApiLog, STATUS_ERROR};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LOG_COLUMNS: &str = "id, action, method, endpoint, request_params, status, http_status, \
     response_summary, response_details, duration_ms, created_at";

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<ApiLog> {
    Ok(ApiLog {
        id: row.get(0)?,
        action: row.get(1)?,
        method: row.get(2)?,
        endpoint: row.get(3)?,
        request_params: row.get(4)?,
        status: row.get(5)?,
        http_status: row.get(6)?,
        response_summary: row.get(7)?,
        response_details: row.get(8)?,
        duration_ms: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Insert a new log entry
pub fn insert_api_log(conn: &Connection, log: &NewApiLog) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO api_logs (action, method, endpoint, request_params, status, http_status, response_summary, response_details, duration_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            log.action,
            log.method,
            log.endpoint,
            log.request_params,
            log.status,
            log.http_status,
            log.response_summary,
            log.response_details,
            log.duration_ms,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first
pub fn get_all_logs(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<ApiLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM api_logs ORDER BY id DESC LIMIT ?1",
        LOG_COLUMNS
    ))?;

    let logs = stmt
        .query_map([limit], row_to_log)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(logs)
}

pub fn get_log_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<ApiLog>> {
    conn.query_row(
        &format!("SELECT {} FROM api_logs WHERE id = ?1", LOG_COLUMNS),
        [id],
        row_to_log,
    )
    .optional()
}

/// Failed calls newer than `since_id`, oldest first (for polling)
pub fn get_failed_logs_since(conn: &Connection, since_id: i64) -> rusqlite::Result<Vec<ApiLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM api_logs WHERE id > ?1 AND status = ?2 ORDER BY id ASC",
        LOG_COLUMNS
    ))?;

    let logs = stmt
        .query_map(params![since_id, STATUS_ERROR], row_to_log)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(logs)
}

pub fn get_latest_log_id(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(id), 0) FROM api_logs", [], |row| {
        row.get(0)
    })
}
