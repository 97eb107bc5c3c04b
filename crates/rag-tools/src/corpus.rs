//! In-memory document corpus for semantic retrieval.
//!
//! Documents are split into sentence-aligned chunks with byte offsets into
//! the original content, embedded once at load time, and ranked by cosine
//! similarity at query time.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedding::{Embedding, EmbeddingModel, HashingEmbedder};
use crate::error::CorpusError;

/// A source document supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub content: String,

    /// Origin label (file name, collection)
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub page_number: Option<u32>,
}

impl Document {
    pub fn new(document_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            content: content.into(),
            source: String::new(),
            page_number: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }
}

/// A retrievable slice of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    /// Byte offset of the chunk start in the document content
    pub start_offset: usize,
    /// Byte offset one past the chunk end
    pub end_offset: usize,
    pub page_number: Option<u32>,
    pub source: String,
}

/// A chunk with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Sentences are packed into a chunk until it would exceed this many bytes.
    /// A single longer sentence becomes its own chunk.
    pub max_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 500,
        }
    }
}

struct IndexedChunk {
    chunk: Chunk,
    embedding: Embedding,
}

/// Embedded chunk collection searched by the vector_search tool.
pub struct Corpus {
    chunks: Vec<IndexedChunk>,
    embedder: Arc<dyn EmbeddingModel>,
    chunking: ChunkingConfig,
    document_count: usize,
}

impl Corpus {
    /// Create an empty corpus with the default hashing embedder.
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::default()), ChunkingConfig::default())
    }

    pub fn with_embedder(embedder: Arc<dyn EmbeddingModel>, chunking: ChunkingConfig) -> Self {
        Self {
            chunks: Vec::new(),
            embedder,
            chunking,
            document_count: 0,
        }
    }

    /// Build a corpus from documents with default settings.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self, CorpusError> {
        let mut corpus = Self::new();
        for document in documents {
            corpus.add_document(document)?;
        }
        Ok(corpus)
    }

    /// Load a JSON array of documents.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let documents: Vec<Document> = serde_json::from_str(&raw)?;
        let corpus = Self::from_documents(documents)?;
        info!(
            path = %path.as_ref().display(),
            documents = corpus.document_count(),
            chunks = corpus.len(),
            "Loaded corpus"
        );
        Ok(corpus)
    }

    /// Chunk, embed and index a document.
    pub fn add_document(&mut self, document: Document) -> Result<(), CorpusError> {
        if document.document_id.trim().is_empty() {
            return Err(CorpusError::InvalidDocument(
                "document_id must not be empty".to_string(),
            ));
        }

        let chunks = chunk_document(&document, &self.chunking);
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        debug!(
            document_id = %document.document_id,
            chunks = chunks.len(),
            "Indexed document"
        );

        self.chunks.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexedChunk { chunk, embedding }),
        );
        self.document_count += 1;
        Ok(())
    }

    /// Top `top_k` chunks scoring at least `min_score`, best first.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, CorpusError> {
        let query_embedding = self.embedder.embed(query)?;
        if query_embedding.is_zero() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|indexed| ScoredChunk {
                chunk: indexed.chunk.clone(),
                score: query_embedding.cosine_similarity(&indexed.embedding),
            })
            .filter(|s| s.score >= min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a document into sentence-aligned chunks.
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    let flush = |span: (usize, usize), chunks: &mut Vec<Chunk>| {
        let index = chunks.len();
        chunks.push(Chunk {
            chunk_id: format!("{}#{}", document.document_id, index),
            document_id: document.document_id.clone(),
            content: document.content[span.0..span.1].to_string(),
            start_offset: span.0,
            end_offset: span.1,
            page_number: document.page_number,
            source: document.source.clone(),
        });
    };

    for (start, end) in sentence_spans(&document.content) {
        current = match current {
            None => Some((start, end)),
            Some((cs, _)) if end - cs <= config.max_chunk_chars => Some((cs, end)),
            Some(span) => {
                flush(span, &mut chunks);
                Some((start, end))
            }
        };
    }
    if let Some(span) = current {
        flush(span, &mut chunks);
    }

    chunks
}

/// Byte spans of sentences, trimmed of surrounding whitespace.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    let push = |s: usize, e: usize, spans: &mut Vec<(usize, usize)>| {
        let end = s + text[s..e].trim_end().len();
        if end > s {
            spans.push((s, end));
        }
    };

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }

        let terminal = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |(_, next)| next.is_whitespace());

        if c == '\n' {
            if let Some(s) = start.take() {
                push(s, i, &mut spans);
            }
        } else if terminal {
            if let Some(s) = start.take() {
                push(s, i + c.len_utf8(), &mut spans);
            }
        }
    }

    if let Some(s) = start {
        push(s, text.len(), &mut spans);
    }

    spans
}
