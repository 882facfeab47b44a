//! Question answering endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /api/ask - Answer a question over the uploaded PDFs
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    tracing::info!("Question: \"{}\"", request.question);

    let response = state.ask(&request.question, &request.chat_history).await?;
    Ok(Json(response))
}
