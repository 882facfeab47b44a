//! Retrieval over embedded chunks

pub mod index;

pub use index::{SearchResult, VectorIndex};
