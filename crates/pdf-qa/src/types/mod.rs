//! Core types for the PDF Q&A service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, FileType};
pub use query::{AskRequest, ChatTurn};
pub use response::{
    AskResponse, Citation, DocumentSummary, UploadError, UploadResponse, NO_DOCUMENTS_ANSWER,
    UPLOAD_FAILURE_STATUS, UPLOAD_SUCCESS_STATUS,
};
