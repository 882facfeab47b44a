//! PDF upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the PDFs
const FILES_FIELD: &str = "files";

/// POST /api/upload - Replace the corpus with the uploaded PDFs
pub async fn upload_pdfs(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("file_{}.pdf", Uuid::new_v4()));

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_request(format!("Failed to read '{}': {}", filename, e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push((filename, data.to_vec()));
    }

    Ok(Json(state.upload_pdfs(files).await))
}
