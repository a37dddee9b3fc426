use crate::error::ServiceError;
use crate::models::{DocumentRecord, TextChunk};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of `"{source_file}-{page_number}-{chunk_id}"`.
pub fn build_document_id(source_file: &str, page_number: u32, chunk_id: u32) -> String {
    let raw_id = format!("{source_file}-{page_number}-{chunk_id}");
    let mut hasher = Sha256::new();
    hasher.update(raw_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl DocumentRecord {
    pub fn from_chunk(source_file: &str, chunk: TextChunk) -> Self {
        Self {
            id: build_document_id(source_file, chunk.page_number, chunk.chunk_id),
            content: chunk.text,
            source_file: source_file.to_string(),
            page_number: chunk.page_number,
            chunk_id: chunk.chunk_id,
            content_vector: Vec::new(),
        }
    }

    pub fn attach_vector(
        &mut self,
        vector: Vec<f32>,
        dimensions: usize,
    ) -> Result<(), ServiceError> {
        if vector.len() != dimensions {
            return Err(ServiceError::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }
        self.content_vector = vector;
        Ok(())
    }
}

pub fn build_documents(source_file: &str, chunks: Vec<TextChunk>) -> Vec<DocumentRecord> {
    chunks
        .into_iter()
        .map(|chunk| DocumentRecord::from_chunk(source_file, chunk))
        .collect()
}

/// Attaches vectors to a batch in order. Counts and dimensions must line up.
pub fn attach_vectors(
    batch: &mut [DocumentRecord],
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
) -> Result<(), ServiceError> {
    if batch.len() != vectors.len() {
        return Err(ServiceError::decode(
            crate::error::Backend::Embedding,
            format!(
                "received {} embeddings for {} documents",
                vectors.len(),
                batch.len()
            ),
        ));
    }

    for (document, vector) in batch.iter_mut().zip(vectors) {
        document.attach_vector(vector, dimensions)?;
    }
    Ok(())
}
