//! Document ingestion pipeline: PDF loading and text splitting

mod chunker;
mod parser;
mod processor;

pub use chunker::{TextChunker, DEFAULT_SEPARATORS};
pub use parser::{cleanup_pdf_text, hash_content, FileParser, PageContent, ParsedDocument};
pub use processor::IngestPipeline;

#[cfg(test)]
pub(crate) use parser::sample_pdf;
