use std::path::Path;

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tracing::{error, info};

use crate::errors::AppError;
use crate::services::batch_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/csv", post(upload_csv))
}

/// Upload a semicolon-delimited CSV with a `URL` column, look up every row
/// in order, and get the same table back with `Trend Price` and `30-Day
/// Avg Price` appended, as a downloadable file. Both the upload and the
/// augmented output are kept under the storage directory.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/imports/csv - CSV batch lookup");

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = sanitize_filename(field.file_name().unwrap_or("upload.csv"));
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) = upload
        .ok_or_else(|| AppError::Validation("Multipart field 'file' is required".to_string()))?;

    let storage_dir = &state.config.storage_dir;
    tokio::fs::create_dir_all(storage_dir)
        .await
        .map_err(|e| AppError::Validation(format!("Storage directory unavailable: {e}")))?;
    tokio::fs::write(storage_dir.join(&filename), &data)
        .await
        .map_err(|e| AppError::Validation(format!("Failed to store upload: {e}")))?;

    let policy = state.config.fetch_policy();
    let output =
        batch_service::run_csv_batch(&state.pool, &state.session, &policy, &filename, &data)
            .await
            .map_err(|e| {
                error!("CSV batch failed for {}: {}", filename, e);
                e
            })?;

    tokio::fs::write(storage_dir.join(&output.filename), &output.content)
        .await
        .map_err(|e| AppError::Validation(format!("Failed to store output: {e}")))?;

    info!(
        "CSV batch completed: {} rows written to {}",
        output.rows, output.filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", output.filename),
            ),
        ],
        output.content,
    ))
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_filename(raw: &str) -> String {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload.csv")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_components() {
        assert_eq!(sanitize_filename("cards.csv"), "cards.csv");
        assert_eq!(sanitize_filename("../../etc/cards.csv"), "cards.csv");
        assert_eq!(sanitize_filename(""), "upload.csv");
    }
}
