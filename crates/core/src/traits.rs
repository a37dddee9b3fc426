use crate::store::{IndexSchema, SearchRow};
use crate::{DocumentRecord, ServiceError};
use async_trait::async_trait;

/// Persistent chunk index with nearest-neighbour search over `content_vector`.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn create_or_replace_index(&self, schema: &IndexSchema) -> Result<(), ServiceError>;

    /// Writes documents keyed by `id`; an existing id is replaced, never duplicated.
    async fn upsert(&self, documents: &[DocumentRecord]) -> Result<(), ServiceError>;

    /// Returns at most `k` rows in descending similarity, each holding only `fields`.
    async fn vector_search(
        &self,
        vector: &[f32],
        k: usize,
        fields: &[&str],
    ) -> Result<Vec<SearchRow>, ServiceError>;
}
