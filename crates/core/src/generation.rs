use crate::config::AppConfig;
use crate::error::{Backend, ServiceError};
use crate::openai::AzureOpenAiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about zoning laws. \
Use only the provided context. If the answer is not in the context, say you do not have enough \
information. Include citations with the source file and page number.";

pub const ANSWER_TEMPERATURE: f32 = 0.2;
pub const ANSWER_MAX_TOKENS: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct AzureOpenAiChat {
    client: AzureOpenAiClient,
    deployment: String,
}

impl AzureOpenAiChat {
    pub fn new(client: AzureOpenAiClient, deployment: impl Into<String>) -> Self {
        Self {
            client,
            deployment: deployment.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(
            AzureOpenAiClient::from_config(config)?,
            &config.openai_chat_deployment,
        ))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for AzureOpenAiChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<String, ServiceError> {
        let url = self.client.deployment_url(&self.deployment, "chat/completions")?;
        let request = ChatRequest {
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let response: ChatResponse = self
            .client
            .post_json(Backend::Generation, url, &request)
            .await?;

        first_completion(response)
    }
}

fn first_completion(response: ChatResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::decode(Backend::Generation, "completion has no content"))
}

/// Asks the chat model to answer from the supplied context only.
pub struct Answerer<C> {
    model: C,
}

impl<C> Answerer<C> {
    pub fn model(&self) -> &C {
        &self.model
    }
}

impl<C: ChatModel> Answerer<C> {
    pub fn new(model: C) -> Self {
        Self { model }
    }

    pub fn build_messages(question: &str, context: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: format!("Context:\n{context}\n\nQuestion: {question}"),
            },
        ]
    }

    pub async fn answer(&self, question: &str, context: &str) -> Result<String, ServiceError> {
        let messages = Self::build_messages(question, context);
        self.model
            .chat(
                &messages,
                ChatOptions {
                    temperature: ANSWER_TEMPERATURE,
                    max_tokens: ANSWER_MAX_TOKENS,
                },
            )
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every request and replies with a canned answer or error status.
    #[derive(Default)]
    pub(crate) struct ScriptedChat {
        pub reply: Option<String>,
        pub requests: Mutex<Vec<(Vec<ChatMessage>, ChatOptions)>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            options: ChatOptions,
        ) -> Result<String, ServiceError> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), options));
            self.reply.clone().ok_or(ServiceError::BackendResponse {
                backend: Backend::Generation,
                status: 503,
                details: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn answer_sends_grounding_instruction_and_context() {
        let chat = ScriptedChat {
            reply: Some("Five feet (f.pdf, page 2).".to_string()),
            ..Default::default()
        };
        let answerer = Answerer::new(chat);

        let answer = answerer
            .answer("What is the setback?", "Source: f.pdf (page 2)\nFive feet.")
            .await
            .unwrap();
        assert_eq!(answer, "Five feet (f.pdf, page 2).");

        let requests = answerer.model.requests.lock().unwrap();
        let (messages, options) = &requests[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Use only the provided context"));
        assert_eq!(
            messages[1].content,
            "Context:\nSource: f.pdf (page 2)\nFive feet.\n\nQuestion: What is the setback?"
        );
        assert_eq!(options.temperature, ANSWER_TEMPERATURE);
        assert_eq!(options.max_tokens, ANSWER_MAX_TOKENS);
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let answerer = Answerer::new(ScriptedChat::default());
        let error = answerer.answer("q", "").await.unwrap_err();
        assert_eq!(error.backend(), Some(Backend::Generation));
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let messages = Answerer::<ScriptedChat>::build_messages("q", "c");
        let json = serde_json::to_value(&messages).unwrap();
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
    }

    #[test]
    fn null_completion_is_a_generation_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        let error = first_completion(response).unwrap_err();
        assert_eq!(error.backend(), Some(Backend::Generation));
    }
}
