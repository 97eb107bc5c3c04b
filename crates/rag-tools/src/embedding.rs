//! Embedding model trait and the default hashing embedder.
//!
//! Defines the interface for turning text into vectors for the
//! vector_search tool. The default [`HashingEmbedder`] needs no model
//! files: it feature-hashes word tokens into a fixed-size vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Errors that can occur during embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Input cannot be embedded
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model backend failure
    #[error("Model error: {0}")]
    Model(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// True for the all-zero vector (text with no usable tokens).
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        // Since both are normalized, dot product = cosine similarity
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub dimension: usize,
}

/// Trait for embedding models.
///
/// Implementations must be thread-safe (Send + Sync) for concurrent use.
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts.
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when",
    "where", "which", "who", "why", "with",
];

/// Lowercase word tokens with stopwords and single characters removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Feature-hashing bag-of-words embedder.
///
/// Each token (and each adjacent token pair, at half weight) is hashed into
/// one of `dimension` buckets. Deterministic across runs.
pub struct HashingEmbedder {
    info: ModelInfo,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "hashing-bow".to_string(),
                dimension: dimension.max(1),
            },
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        (hasher.finish() % self.info.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let tokens = tokenize(text);
        let mut values = vec![0.0f32; self.info.dimension];

        for token in &tokens {
            values[self.bucket(token)] += 1.0;
        }
        for pair in tokens.windows(2) {
            values[self.bucket(&format!("{} {}", pair[0], pair[1]))] += 0.5;
        }

        Ok(Embedding::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_normalization() {
        let e = Embedding::new(vec![3.0, 4.0]);
        assert!((e.values[0] - 0.6).abs() < 1e-6);
        assert!((e.values[1] - 0.8).abs() < 1e-6);
        assert!((e.cosine_similarity(&e) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_similarity_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
    }

    #[test]
    fn test_tokenize_drops_stopwords() {
        assert_eq!(
            tokenize("What is Machine Learning?"),
            vec!["machine".to_string(), "learning".to_string()]
        );
    }

    #[test]
    fn test_hashing_embedder_similarity() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("What is machine learning?").unwrap();
        let related = embedder
            .embed("Machine learning is a field of artificial intelligence.")
            .unwrap();
        let unrelated = embedder
            .embed("The mortgage rate in Austin rose last quarter.")
            .unwrap();

        assert_eq!(query.dimension(), HashingEmbedder::DEFAULT_DIMENSION);
        assert!(query.cosine_similarity(&related) > query.cosine_similarity(&unrelated));
        assert!(query.cosine_similarity(&related) > 0.3);
    }

    #[test]
    fn test_empty_text_gives_zero_vector() {
        let embedder = HashingEmbedder::default();
        assert!(embedder.embed("the a of").unwrap().is_zero());
    }
}
