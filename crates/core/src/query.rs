use crate::config::AppConfig;
use crate::embeddings::{AzureOpenAiEmbedder, Embedder};
use crate::error::{Backend, QueryError, ServiceError};
use crate::generation::{Answerer, AzureOpenAiChat, ChatModel};
use crate::models::QueryAnswer;
use crate::retrieval::{assemble_context, Retriever};
use crate::stores::AzureSearchStore;
use crate::traits::IndexStore;
use tracing::debug;

/// Embed, retrieve, assemble and answer for one question at a time.
pub struct QueryPipeline<E, S, C> {
    embedder: E,
    retriever: Retriever<S>,
    answerer: Answerer<C>,
}

pub type AzureQueryPipeline = QueryPipeline<AzureOpenAiEmbedder, AzureSearchStore, AzureOpenAiChat>;

impl AzureQueryPipeline {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(QueryPipeline::new(
            AzureOpenAiEmbedder::from_config(config)?,
            AzureSearchStore::query(config)?,
            AzureOpenAiChat::from_config(config)?,
        ))
    }
}

impl<E, S, C> QueryPipeline<E, S, C>
where
    E: Embedder,
    S: IndexStore,
    C: ChatModel,
{
    pub fn new(embedder: E, store: S, chat: C) -> Self {
        Self {
            embedder,
            retriever: Retriever::new(store),
            answerer: Answerer::new(chat),
        }
    }

    pub async fn ask(&self, question: &str, top_k: usize) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        if top_k == 0 {
            return Err(QueryError::InvalidTopK(top_k));
        }

        let query_vector = self
            .embedder
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::decode(Backend::Embedding, "no embedding for question"))?;

        let chunks = self.retriever.retrieve(&query_vector, top_k).await?;
        debug!(retrieved = chunks.len(), top_k, "retrieved context chunks");

        let context = assemble_context(&chunks);
        let answer = self.answerer.answer(question, &context).await?;

        Ok(QueryAnswer { answer, chunks })
    }
}
