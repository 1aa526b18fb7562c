use axum::extract::{Multipart, State};
use axum::response::Redirect;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::handlers::back_to_dashboard;
use crate::state::AppState;

/// Name of the file input in the upload form.
const FILE_FIELD: &str = "file";

/// Read the uploaded file out of the form. An absent or empty file yields
/// `None`.
async fn read_file(multipart: &mut Multipart) -> AppResult<Option<(String, Vec<u8>)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "transactions.csv".to_string());

        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {}", e)))?
            .to_vec();

        if content.is_empty() {
            return Ok(None);
        }
        debug!(file_name = %file_name, size_bytes = content.len(), "Received CSV file");
        return Ok(Some((file_name, content)));
    }
    Ok(None)
}

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Redirect> {
    let result = match read_file(&mut multipart).await {
        Ok(Some((file_name, content))) => state.dashboard.upload(&file_name, content).await,
        Ok(None) => {
            warn!("Upload submitted without a file");
            Err(AppError::Validation("Choose a CSV file to upload".into()))
        }
        Err(e) => Err(e),
    };
    back_to_dashboard(&state, result)
}
