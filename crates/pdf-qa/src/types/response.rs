//! Response types for uploads and questions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Chunk, Document, FileType};

/// Status reported after a successful upload
pub const UPLOAD_SUCCESS_STATUS: &str = "PDFs successfully processed. You can now ask questions!";

/// Status reported when an upload could not be processed
pub const UPLOAD_FAILURE_STATUS: &str = "Failed to process PDFs. Please try again.";

/// Answer returned when a question arrives before any upload
pub const NO_DOCUMENTS_ANSWER: &str = "Please upload PDFs first.";

/// Maximum snippet length in citations
const MAX_SNIPPET_CHARS: usize = 300;

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Page number (if known)
    pub page_number: Option<u32>,
    /// Leading part of the chunk text
    pub snippet: String,
    /// Snippet with highlighted query terms (<mark> tags)
    pub snippet_highlighted: String,
    /// Similarity score (higher is closer)
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        let snippet = truncate_snippet(&chunk.content, MAX_SNIPPET_CHARS);
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            snippet_highlighted: escape_html(&snippet),
            snippet,
            similarity_score,
        }
    }

    /// Highlight query terms in the snippet
    ///
    /// Terms are matched against the raw snippet and every segment is
    /// HTML-escaped on output. Terms of two characters or fewer are ignored.
    pub fn highlight_terms(&mut self, terms: &[&str]) {
        let pattern = terms
            .iter()
            .filter(|t| t.chars().count() > 2)
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        let re = match regex::RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(re) if !pattern.is_empty() => re,
            _ => {
                self.snippet_highlighted = escape_html(&self.snippet);
                return;
            }
        };

        let mut highlighted = String::with_capacity(self.snippet.len() + 16);
        let mut last = 0;
        for m in re.find_iter(&self.snippet) {
            highlighted.push_str(&escape_html(&self.snippet[last..m.start()]));
            highlighted.push_str("<mark>");
            highlighted.push_str(&escape_html(m.as_str()));
            highlighted.push_str("</mark>");
            last = m.end();
        }
        highlighted.push_str(&escape_html(&self.snippet[last..]));
        self.snippet_highlighted = highlighted;
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Truncate a snippet to `max_chars` characters, ending at a word boundary
pub fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    if snippet.chars().count() <= max_chars {
        return snippet.to_string();
    }

    let end = snippet
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(snippet.len());

    if let Some(pos) = snippet[..end].rfind(' ') {
        return format!("{}...", &snippet[..pos]);
    }

    format!("{}...", &snippet[..end])
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer
    pub answer: String,
    /// Standalone question used for retrieval, when the history rewrote it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_question: Option<String>,
    /// Chunks the answer was conditioned on
    pub citations: Vec<Citation>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl AskResponse {
    /// Create a response with citations
    pub fn new(answer: String, citations: Vec<Citation>, processing_time_ms: u64) -> Self {
        Self {
            answer,
            generated_question: None,
            citations,
            processing_time_ms,
        }
    }

    /// Response for a question asked before any upload
    pub fn no_documents() -> Self {
        Self::new(NO_DOCUMENTS_ANSWER.to_string(), Vec::new(), 0)
    }
}

/// Summary of an indexed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Total pages
    pub total_pages: Option<u32>,
    /// Total chunks
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            total_pages: doc.total_pages,
            total_chunks: doc.total_chunks,
            file_size: doc.file_size,
        }
    }
}

/// Per-file upload failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadError {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Result of processing an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Whether a new corpus is now active
    pub success: bool,
    /// Human-readable status line
    pub status: String,
    /// Documents in the new corpus
    pub documents: Vec<DocumentSummary>,
    /// Total chunks indexed
    pub total_chunks: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Errors encountered
    pub errors: Vec<UploadError>,
}

impl UploadResponse {
    /// Successful upload
    pub fn succeeded(documents: Vec<DocumentSummary>, processing_time_ms: u64) -> Self {
        let total_chunks = documents.iter().map(|d| d.total_chunks).sum();
        Self {
            success: true,
            status: UPLOAD_SUCCESS_STATUS.to_string(),
            documents,
            total_chunks,
            processing_time_ms,
            errors: Vec::new(),
        }
    }

    /// Failed upload
    pub fn failed(errors: Vec<UploadError>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            status: UPLOAD_FAILURE_STATUS.to_string(),
            documents: Vec::new(),
            total_chunks: 0,
            processing_time_ms,
            errors,
        }
    }
}
