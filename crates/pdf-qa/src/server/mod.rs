//! HTTP server for the PDF chatbot

pub mod routes;
pub mod state;

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Two-panel chat page
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Chatbot HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server backed by Ollama
    pub fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Shared application state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/", get(index))
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // applied bottom to top
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting PDF chatbot on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Chat page
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint, OK once PDFs have been processed
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
