use serde::{Deserialize, Serialize};

pub const DEFAULT_VECTOR_DIMENSIONS: usize = 1536;

/// A token window of one page, numbered densely over emitted chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub chunk_id: u32,
    pub page_number: u32,
}

/// One indexed chunk. `content_vector` stays empty until the batch is embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub content: String,
    pub source_file: String,
    pub page_number: u32,
    pub chunk_id: u32,
    pub content_vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub source_file: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub workers: usize,
    pub vector_dimensions: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            batch_size: 64,
            workers: 4,
            vector_dimensions: DEFAULT_VECTOR_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub uploaded: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub files: usize,
    pub documents: usize,
    pub batches: usize,
    pub uploaded: usize,
}
