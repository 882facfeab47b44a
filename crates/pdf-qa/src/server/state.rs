//! Application state for the chatbot server

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::chain::{ChainOptions, ConversationalChain};
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::IngestPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};
use crate::retrieval::VectorIndex;
use crate::types::{
    AskResponse, ChatTurn, Chunk, Citation, Document, DocumentSummary, UploadError,
    UploadResponse,
};

/// The active corpus: its documents and the chain built over them
pub struct Session {
    pub documents: Vec<Document>,
    pub chain: ConversationalChain,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// PDF parsing and splitting
    pipeline: Arc<IngestPipeline>,
    /// Embedding provider
    embedding_provider: Arc<dyn EmbeddingProvider>,
    /// LLM provider
    llm_provider: Arc<dyn LlmProvider>,
    /// Current session, replaced on every successful upload
    session: RwLock<Option<Arc<Session>>>,
}

impl AppState {
    /// Create application state backed by Ollama
    pub fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let (embedder, llm) = OllamaProvider::new(&config)?.split();
        tracing::info!(
            "Using Ollama at {} (embeddings: {}, generation: {})",
            config.llm.base_url,
            embedder.model(),
            llm.model()
        );

        Self::with_providers(config, Arc::new(embedder), Arc::new(llm))
    }

    /// Create application state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm_provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let pipeline = Arc::new(IngestPipeline::new(
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        ));

        tracing::debug!(
            "Providers: embeddings={} ({} dims), llm={} ({})",
            embedding_provider.name(),
            embedding_provider.dimensions(),
            llm_provider.name(),
            llm_provider.model()
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                embedding_provider,
                llm_provider,
                session: RwLock::new(None),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    /// Process a set of PDFs into a fresh session
    ///
    /// Any failure leaves the previous session in place.
    pub async fn upload_pdfs(&self, files: Vec<(String, Vec<u8>)>) -> UploadResponse {
        let start = Instant::now();

        if files.is_empty() {
            return UploadResponse::failed(
                vec![UploadError {
                    filename: String::new(),
                    error: "No files uploaded".to_string(),
                }],
                elapsed_ms(start),
            );
        }

        let file_count = files.len();
        match self.build_session(files).await {
            Ok(session) => {
                let documents: Vec<DocumentSummary> =
                    session.documents.iter().map(DocumentSummary::from).collect();
                *self.inner.session.write().await = Some(Arc::new(session));

                let response = UploadResponse::succeeded(documents, elapsed_ms(start));
                tracing::info!(
                    "Indexed {} files ({} chunks) in {}ms",
                    file_count,
                    response.total_chunks,
                    response.processing_time_ms
                );
                response
            }
            Err(errors) => {
                for e in &errors {
                    tracing::error!("Failed to process '{}': {}", e.filename, e.error);
                }
                UploadResponse::failed(errors, elapsed_ms(start))
            }
        }
    }

    async fn build_session(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> std::result::Result<Session, Vec<UploadError>> {
        let mut documents = Vec::with_capacity(files.len());
        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut errors = Vec::new();

        for (filename, data) in files {
            let pipeline = Arc::clone(&self.inner.pipeline);
            let name = filename.clone();
            let result = tokio::task::spawn_blocking(move || pipeline.ingest(&name, &data))
                .await
                .map_err(|e| Error::internal(format!("Ingestion task failed: {}", e)))
                .and_then(|r| r);

            match result {
                Ok((doc, chunks)) => match self.embed_chunks(chunks).await {
                    Ok(chunks) => {
                        all_chunks.extend(chunks);
                        documents.push(doc);
                    }
                    Err(e) => errors.push(UploadError {
                        filename,
                        error: e.to_string(),
                    }),
                },
                Err(e) => errors.push(UploadError {
                    filename,
                    error: e.to_string(),
                }),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let index = VectorIndex::build(all_chunks, self.inner.config.retrieval.metric).map_err(|e| {
            vec![UploadError {
                filename: String::new(),
                error: e.to_string(),
            }]
        })?;

        let chain = ConversationalChain::new(
            Arc::clone(&self.inner.llm_provider),
            Arc::clone(&self.inner.embedding_provider),
            index,
            ChainOptions::from(&self.inner.config),
        );

        Ok(Session { documents, chain })
    }

    async fn embed_chunks(&self, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.inner.embedding_provider.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let expected = self.inner.embedding_provider.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(Error::embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected,
                bad.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(chunks)
    }

    /// Answer a question against the current session
    pub async fn ask(&self, question: &str, chat_history: &[ChatTurn]) -> Result<AskResponse> {
        let start = Instant::now();

        // Without a corpus every question gets the same reply, blank or not
        let Some(session) = self.current_session().await else {
            return Ok(AskResponse::no_documents());
        };

        let question = question.trim();
        if question.is_empty() {
            return Err(Error::invalid_request("Question cannot be empty"));
        }

        let output = session.chain.invoke(question, chat_history).await?;

        let terms: Vec<&str> = question.split_whitespace().collect();
        let citations = output
            .source_chunks
            .iter()
            .map(|result| {
                let mut citation = Citation::from_chunk(&result.chunk, result.similarity);
                citation.highlight_terms(&terms);
                citation
            })
            .collect();

        let mut response = AskResponse::new(output.answer, citations, elapsed_ms(start));
        response.generated_question = output.generated_question;

        tracing::info!(
            "Answered in {}ms with {} sources",
            response.processing_time_ms,
            response.citations.len()
        );

        Ok(response)
    }

    async fn current_session(&self) -> Option<Arc<Session>> {
        self.inner.session.read().await.clone()
    }

    /// Documents of the current session
    pub async fn documents(&self) -> Vec<DocumentSummary> {
        match self.current_session().await {
            Some(session) => session.documents.iter().map(DocumentSummary::from).collect(),
            None => Vec::new(),
        }
    }

    /// Conversation so far
    pub async fn history(&self) -> Vec<ChatTurn> {
        match self.current_session().await {
            Some(session) => session.chain.history(),
            None => Vec::new(),
        }
    }

    /// Forget the conversation, keeping the documents
    pub async fn clear_history(&self) {
        if let Some(session) = self.current_session().await {
            session.chain.clear_history();
        }
    }

    /// Whether a corpus has been uploaded
    pub async fn is_ready(&self) -> bool {
        self.inner.session.read().await.is_some()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
