use crate::error::{Backend, ServiceError};
use crate::store::{IndexSchema, SearchRow};
use crate::traits::IndexStore;
use crate::DocumentRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process index with cosine-similarity search.
#[derive(Debug)]
pub struct MemoryIndex {
    vector_size: RwLock<usize>,
    documents: RwLock<BTreeMap<String, DocumentRecord>>,
}

impl MemoryIndex {
    pub fn new(vector_size: usize) -> Self {
        Self {
            vector_size: RwLock::new(vector_size),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> Result<usize, ServiceError> {
        self.documents.read().map(|docs| docs.len()).map_err(poisoned)
    }

    pub fn is_empty(&self) -> Result<bool, ServiceError> {
        Ok(self.len()? == 0)
    }

    /// Stored document ids in ascending order.
    pub fn ids(&self) -> Result<Vec<String>, ServiceError> {
        self.documents
            .read()
            .map(|docs| docs.keys().cloned().collect())
            .map_err(poisoned)
    }

    fn vector_size(&self) -> Result<usize, ServiceError> {
        self.vector_size.read().map(|size| *size).map_err(poisoned)
    }
}

fn poisoned<T>(_: T) -> ServiceError {
    ServiceError::decode(Backend::Index, "memory index lock poisoned")
}

fn cosine(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|v| v * v).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

#[async_trait]
impl IndexStore for MemoryIndex {
    async fn create_or_replace_index(&self, schema: &IndexSchema) -> Result<(), ServiceError> {
        if let Some(dimensions) = schema.vector_dimensions() {
            *self.vector_size.write().map_err(poisoned)? = dimensions;
        }
        self.documents.write().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn upsert(&self, documents: &[DocumentRecord]) -> Result<(), ServiceError> {
        let vector_size = self.vector_size()?;
        if let Some(bad) = documents
            .iter()
            .find(|document| document.content_vector.len() != vector_size)
        {
            return Err(ServiceError::DimensionMismatch {
                expected: vector_size,
                actual: bad.content_vector.len(),
            });
        }

        let mut stored = self.documents.write().map_err(poisoned)?;
        for document in documents {
            stored.insert(document.id.clone(), document.clone());
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        k: usize,
        fields: &[&str],
    ) -> Result<Vec<SearchRow>, ServiceError> {
        let vector_size = self.vector_size()?;
        if vector.len() != vector_size {
            return Err(ServiceError::DimensionMismatch {
                expected: vector_size,
                actual: vector.len(),
            });
        }

        let stored = self.documents.read().map_err(poisoned)?;
        let mut scored = stored
            .values()
            .map(|document| (cosine(vector, &document.content_vector), document))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        scored
            .into_iter()
            .take(k)
            .map(|(_, document)| {
                let value = serde_json::to_value(document)
                    .map_err(|error| ServiceError::decode(Backend::Index, error.to_string()))?;
                let mut row = match value {
                    Value::Object(row) => row,
                    _ => SearchRow::new(),
                };
                row.retain(|name, _| fields.contains(&name.as_str()));
                Ok(row)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, vector: Vec<f32>) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            content: format!("content {id}"),
            source_file: "laws.pdf".to_string(),
            page_number: 1,
            chunk_id: 0,
            content_vector: vector,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = MemoryIndex::new(2);
        index.upsert(&[record("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(&[record("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_projects_fields() {
        let index = MemoryIndex::new(2);
        index
            .upsert(&[
                record("far", vec![0.0, 1.0]),
                record("near", vec![1.0, 0.1]),
                record("mid", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let rows = index
            .vector_search(&[1.0, 0.0], 2, &["content", "page_number"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["content"], "content near");
        assert_eq!(rows[1]["content"], "content mid");
        assert_eq!(rows[0].len(), 2);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let index = MemoryIndex::new(3);
        assert!(matches!(
            index.upsert(&[record("a", vec![1.0])]).await,
            Err(ServiceError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn recreating_the_index_clears_it() {
        let index = MemoryIndex::new(2);
        index.upsert(&[record("a", vec![1.0, 0.0])]).await.unwrap();
        index
            .create_or_replace_index(&IndexSchema::for_chunks("laws", 4))
            .await
            .unwrap();
        assert!(index.is_empty().unwrap());
        assert!(index.upsert(&[record("b", vec![1.0; 4])]).await.is_ok());
    }

    #[test]
    fn poisoned_lock_is_reported_not_hidden() {
        let index = std::sync::Arc::new(MemoryIndex::new(2));
        let writer = std::sync::Arc::clone(&index);
        let _ = std::thread::spawn(move || {
            let _guard = writer.documents.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(index.len(), Err(ServiceError::Decode { .. })));
        assert!(index.ids().is_err());
        assert!(index.is_empty().is_err());
    }
}
