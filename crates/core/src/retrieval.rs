use crate::error::{Backend, QueryError, ServiceError};
use crate::models::RetrievedChunk;
use crate::store::SearchRow;
use crate::traits::IndexStore;
use serde_json::Value;

pub const RETRIEVED_FIELDS: [&str; 3] = ["content", "source_file", "page_number"];

pub struct Retriever<S> {
    store: S,
}

impl<S: IndexStore> Retriever<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Nearest chunks to `query_vector`, in the store's relevance order.
    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, QueryError> {
        if top_k == 0 {
            return Err(QueryError::InvalidTopK(top_k));
        }

        let rows = self
            .store
            .vector_search(query_vector, top_k, &RETRIEVED_FIELDS)
            .await?;

        rows.into_iter()
            .map(|row| to_retrieved_chunk(row).map_err(QueryError::from))
            .collect()
    }
}

fn to_retrieved_chunk(row: SearchRow) -> Result<RetrievedChunk, ServiceError> {
    serde_json::from_value(Value::Object(row)).map_err(|error| {
        ServiceError::decode(Backend::Index, format!("malformed search row: {error}"))
    })
}

/// Renders chunks as `Source: {file} (page {n})` blocks separated by a blank line.
pub fn assemble_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Source: {} (page {})\n{}",
                chunk.source_file, chunk.page_number, chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
