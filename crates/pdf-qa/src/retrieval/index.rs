//! In-memory vector index with exact nearest-neighbour search

use std::cmp::Ordering;

use crate::config::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Raw metric value (L2 distance or cosine similarity)
    pub score: f32,
    /// Similarity score, higher is better
    pub similarity: f32,
}

/// Flat index over a fixed set of embedded chunks
///
/// Built once per upload and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Build an index from chunks that already carry embeddings
    pub fn build(chunks: Vec<Chunk>, metric: DistanceMetric) -> Result<Self> {
        let first = chunks
            .first()
            .ok_or_else(|| Error::vector_db("Cannot build an index without chunks"))?;

        let dimensions = first.embedding.len();
        if dimensions == 0 {
            return Err(Error::vector_db("Chunk has no embedding"));
        }

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
            return Err(Error::vector_db(format!(
                "Dimension mismatch: expected {}, chunk {} has {}",
                dimensions,
                bad.chunk_index,
                bad.embedding.len()
            )));
        }

        tracing::debug!("Built {:?} index: {} chunks x {} dims", metric, chunks.len(), dimensions);

        Ok(Self {
            chunks,
            dimensions,
            metric,
        })
    }

    /// Return the `k` chunks closest to the query, best first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Dimension mismatch: index has {}, query has {}",
                self.dimensions,
                query.len()
            )));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, self.score(query, &chunk.embedding)))
            .collect();

        // sort_by is stable, so equal scores keep insertion order
        match self.metric {
            DistanceMetric::Euclidean => {
                scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            }
            DistanceMetric::Cosine => {
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
            }
        }

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchResult {
                chunk: self.chunks[i].clone(),
                score,
                similarity: self.similarity(score),
            })
            .collect())
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => cosine_similarity(a, b),
        }
    }

    fn similarity(&self, score: f32) -> f32 {
        match self.metric {
            DistanceMetric::Euclidean => 1.0 / (1.0 + score),
            DistanceMetric::Cosine => score,
        }
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkSource;
    use uuid::Uuid;

    fn chunk(index: u32, content: &str, embedding: Vec<f32>) -> Chunk {
        let source = ChunkSource::pdf("notes.pdf".to_string(), 1, 1);
        let mut chunk = Chunk::new(Uuid::nil(), content.to_string(), source, 0, content.len(), index);
        chunk.embedding = embedding;
        chunk
    }

    fn sample_index(metric: DistanceMetric) -> VectorIndex {
        VectorIndex::build(
            vec![
                chunk(0, "east", vec![1.0, 0.0]),
                chunk(1, "north", vec![0.0, 1.0]),
                chunk(2, "far east", vec![3.0, 0.0]),
            ],
            metric,
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_empty_input() {
        let result = VectorIndex::build(Vec::new(), DistanceMetric::Euclidean);
        assert!(matches!(result, Err(Error::VectorDb(_))));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let result = VectorIndex::build(
            vec![chunk(0, "a", vec![1.0, 0.0]), chunk(1, "b", vec![1.0])],
            DistanceMetric::Euclidean,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_missing_embeddings() {
        let result = VectorIndex::build(vec![chunk(0, "a", Vec::new())], DistanceMetric::Cosine);
        assert!(result.is_err());
    }

    #[test]
    fn test_euclidean_orders_by_distance() {
        let index = sample_index(DistanceMetric::Euclidean);
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimensions(), 2);

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "east");
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[0].similarity, 1.0);
        // north is sqrt(2) away, far east is 2.0 away
        assert_eq!(results[1].chunk.content, "north");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let index = sample_index(DistanceMetric::Cosine);
        let results = index.search(&[2.0, 0.0], 3).unwrap();

        assert_eq!(results[0].chunk.content, "east");
        assert_eq!(results[1].chunk.content, "far east");
        assert!((results[1].similarity - 1.0).abs() < 1e-6);
        assert_eq!(results[2].chunk.content, "north");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::build(
            vec![
                chunk(0, "first", vec![0.0, 1.0]),
                chunk(1, "second", vec![0.0, 1.0]),
            ],
            DistanceMetric::Euclidean,
        )
        .unwrap();

        let results = index.search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(results[0].chunk.content, "first");
        assert_eq!(results[1].chunk.content, "second");
    }

    #[test]
    fn test_search_limits_and_validates() {
        let index = sample_index(DistanceMetric::Euclidean);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 3);
        assert!(index.search(&[1.0, 0.0, 0.0], 2).is_err());
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
