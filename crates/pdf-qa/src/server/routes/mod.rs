//! API routes for the chatbot server

pub mod ask;
pub mod session;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload - with larger body limit for PDFs
        .route(
            "/upload",
            post(upload::upload_pdfs).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask_question))
        .route("/documents", get(session::list_documents))
        .route(
            "/history",
            get(session::get_history).delete(session::clear_history),
        )
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "pdf-qa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with your PDFs using retrieval-augmented generation",
        "models": {
            "embedding": config.embeddings.model,
            "generation": state.llm_provider().model(),
        },
        "retrieval": {
            "chunk_size": config.chunking.chunk_size,
            "chunk_overlap": config.chunking.chunk_overlap,
            "top_k": config.retrieval.top_k,
            "metric": config.retrieval.metric,
        },
        "endpoints": {
            "POST /api/upload": "Upload PDFs (multipart field 'files'), replacing the current set",
            "POST /api/ask": "Ask a question about the uploaded PDFs",
            "GET /api/documents": "List the uploaded documents",
            "GET /api/history": "Show the conversation so far",
            "DELETE /api/history": "Clear the conversation"
        }
    }))
}
