//! Session inspection endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::state::AppState;
use crate::types::{ChatTurn, DocumentSummary};

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ChatTurn>,
}

/// GET /api/documents - Documents of the current session
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents = state.documents().await;
    Json(DocumentListResponse {
        total: documents.len(),
        documents,
    })
}

/// GET /api/history - Conversation so far
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        turns: state.history().await,
    })
}

/// DELETE /api/history - Start a fresh conversation over the same PDFs
pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.clear_history().await;
    StatusCode::NO_CONTENT
}
