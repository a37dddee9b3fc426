use crate::config::AppConfig;
use crate::error::{Backend, ServiceError};
use crate::openai::AzureOpenAiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Turns texts into dense vectors, one remote round trip per call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct AzureOpenAiEmbedder {
    client: AzureOpenAiClient,
    deployment: String,
}

impl AzureOpenAiEmbedder {
    pub fn new(client: AzureOpenAiClient, deployment: impl Into<String>) -> Self {
        Self {
            client,
            deployment: deployment.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(
            AzureOpenAiClient::from_config(config)?,
            &config.openai_embedding_deployment,
        ))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl Embedder for AzureOpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.client.deployment_url(&self.deployment, "embeddings")?;
        let response: EmbeddingResponse = self
            .client
            .post_json(Backend::Embedding, url, &EmbeddingRequest { input: texts })
            .await?;

        into_ordered_vectors(response, texts.len())
    }
}

fn into_ordered_vectors(
    mut response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, ServiceError> {
    response.data.sort_by_key(|entry| entry.index);

    let in_sequence = response
        .data
        .iter()
        .enumerate()
        .all(|(position, entry)| entry.index == position);
    if response.data.len() != expected || !in_sequence {
        return Err(ServiceError::decode(
            Backend::Embedding,
            format!(
                "returned {} embeddings for {} inputs",
                response.data.len(),
                expected
            ),
        ));
    }

    Ok(response
        .data
        .into_iter()
        .map(|entry| entry.embedding)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic hashed character-trigram embedder for offline tests.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct TrigramEmbedder {
        pub dimensions: usize,
    }

    impl TrigramEmbedder {
        pub(crate) fn vector(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0f32; self.dimensions.max(1)];
            let chars: Vec<char> = text.to_lowercase().chars().collect();

            for window in chars.windows(3) {
                let mut hash = 1469598103934665603u64;
                for byte in window.iter().collect::<String>().bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
                let bucket = (hash % vector.len() as u64) as usize;
                vector[bucket] += 1.0;
            }

            let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for value in &mut vector {
                    *value /= magnitude;
                }
            }
            vector
        }
    }

    #[async_trait]
    impl Embedder for TrigramEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
            Ok(texts.iter().map(|text| self.vector(text)).collect())
        }
    }

    fn entry(index: usize, value: f32) -> EmbeddingData {
        EmbeddingData {
            embedding: vec![value; 2],
            index,
        }
    }

    #[test]
    fn response_is_reordered_by_index() {
        let response = EmbeddingResponse {
            data: vec![entry(2, 2.0), entry(0, 0.0), entry(1, 1.0)],
        };
        let vectors = into_ordered_vectors(response, 3).expect("complete response");
        assert_eq!(vectors, vec![vec![0.0; 2], vec![1.0; 2], vec![2.0; 2]]);
    }

    #[test]
    fn short_response_is_an_embedding_error() {
        let response = EmbeddingResponse {
            data: vec![entry(0, 0.0)],
        };
        let error = into_ordered_vectors(response, 2).unwrap_err();
        assert_eq!(error.backend(), Some(Backend::Embedding));
    }

    #[test]
    fn response_payload_deserializes() {
        let payload = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.25,-0.5]}],"model":"ada"}"#;
        let response: EmbeddingResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(into_ordered_vectors(response, 1).unwrap(), vec![vec![0.25, -0.5]]);
    }

    #[tokio::test]
    async fn trigram_embedder_is_deterministic() {
        let embedder = TrigramEmbedder { dimensions: 32 };
        let texts = vec!["Setback requirements".to_string()];
        let first = embedder.embed(&texts).await.unwrap();
        let second = embedder.embed(&texts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 32);
    }
}
