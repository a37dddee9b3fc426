use crate::config::AppConfig;
use crate::error::{Backend, ServiceError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP handle for one Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ServiceError::HttpClient)?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: api_version.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.openai_endpoint,
            &config.openai_api_key,
            &config.openai_api_version,
        )
    }

    pub(crate) fn deployment_url(
        &self,
        deployment: &str,
        operation: &str,
    ) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&format!(
            "{}/openai/deployments/{}/{}",
            self.endpoint, deployment, operation
        ))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    pub(crate) async fn post_json<B, T>(
        &self,
        backend: Backend,
        url: Url,
        body: &B,
    ) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ServiceError::transport(backend))?;

        let status = response.status();
        if !status.is_success() {
            let details = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::BackendResponse {
                backend,
                status: status.as_u16(),
                details,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|error| ServiceError::decode(backend, error.to_string()))
    }
}
