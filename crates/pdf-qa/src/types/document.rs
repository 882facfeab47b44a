//! Document and chunk types with page tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Self {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

/// An uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename as uploaded by the user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, file_type: FileType, content_hash: String, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            file_type,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Filename as uploaded
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page number (1-indexed)
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Create source info for a PDF page
    pub fn pdf(filename: String, page: u32, total_pages: u32) -> Self {
        Self {
            filename,
            file_type: FileType::Pdf,
            page_number: Some(page),
            page_count: Some(total_pages),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Character position within the page text
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }
}
