use crate::config::AppConfig;
use crate::error::{Backend, ServiceError};
use crate::store::{IndexSchema, SearchRow, VECTOR_FIELD};
use crate::traits::IndexStore;
use crate::DocumentRecord;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AzureSearchStore {
    client: Client,
    endpoint: String,
    index_name: String,
    api_key: String,
    api_version: String,
}

impl AzureSearchStore {
    pub fn new(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ServiceError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            api_key: api_key.into(),
            api_version: api_version.into(),
        })
    }

    /// Store authenticated with the admin key, for provisioning and uploads.
    pub fn admin(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.search_endpoint,
            &config.search_index_name,
            &config.search_admin_key,
            &config.search_api_version,
        )
    }

    /// Store authenticated with the query key, for retrieval.
    pub fn query(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.search_endpoint,
            &config.search_index_name,
            &config.search_query_key,
            &config.search_api_version,
        )
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn url(&self, path: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&format!("{}/{}", self.endpoint, path))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("api-key", &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        request
            .send()
            .await
            .map_err(ServiceError::transport(Backend::Index))
    }

    async fn list_index_names(&self) -> Result<Vec<String>, ServiceError> {
        let mut url = self.url("indexes")?;
        url.query_pairs_mut().append_pair("$select", "name");

        let response = self.send(self.request(Method::GET, url)).await?;
        let body = json_body(ensure_success(response).await?).await?;

        Ok(body
            .pointer("/value")
            .and_then(Value::as_array)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|index| index.pointer("/name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_index(&self, name: &str) -> Result<(), ServiceError> {
        let url = self.url(&format!("indexes/{name}"))?;
        let response = self.send(self.request(Method::DELETE, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl IndexStore for AzureSearchStore {
    async fn create_or_replace_index(&self, schema: &IndexSchema) -> Result<(), ServiceError> {
        if self.list_index_names().await?.contains(&schema.name) {
            info!(index = %schema.name, "deleting existing index");
            self.delete_index(&schema.name).await?;
        }

        let url = self.url("indexes")?;
        let response = self
            .send(self.request(Method::POST, url).json(schema))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn upsert(&self, documents: &[DocumentRecord]) -> Result<(), ServiceError> {
        if documents.is_empty() {
            return Ok(());
        }

        let actions = documents
            .iter()
            .map(|document| {
                let mut action = serde_json::to_value(document)
                    .map_err(|error| ServiceError::decode(Backend::Index, error.to_string()))?;
                if let Value::Object(fields) = &mut action {
                    fields.insert("@search.action".to_string(), json!("upload"));
                }
                Ok(action)
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let url = self.url(&format!("indexes/{}/docs/index", self.index_name))?;
        let response = self
            .send(self.request(Method::POST, url).json(&json!({ "value": actions })))
            .await?;
        let body = json_body(ensure_success(response).await?).await?;

        let failures = failed_keys(&body);
        if !failures.is_empty() {
            return Err(ServiceError::BackendResponse {
                backend: Backend::Index,
                status: StatusCode::MULTI_STATUS.as_u16(),
                details: format!("documents rejected: {}", failures.join(", ")),
            });
        }

        debug!(index = %self.index_name, count = documents.len(), "uploaded documents");
        Ok(())
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        k: usize,
        fields: &[&str],
    ) -> Result<Vec<SearchRow>, ServiceError> {
        let url = self.url(&format!("indexes/{}/docs/search", self.index_name))?;
        let body = json!({
            "select": fields.join(","),
            "top": k,
            "vectorQueries": [
                {
                    "kind": "vector",
                    "vector": vector,
                    "k": k,
                    "fields": VECTOR_FIELD,
                }
            ]
        });

        let response = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        let parsed = json_body(ensure_success(response).await?).await?;

        Ok(search_rows(parsed))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let details = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(ServiceError::BackendResponse {
        backend: Backend::Index,
        status: status.as_u16(),
        details,
    })
}

async fn json_body(response: Response) -> Result<Value, ServiceError> {
    response
        .json::<Value>()
        .await
        .map_err(|error| ServiceError::decode(Backend::Index, error.to_string()))
}

fn failed_keys(body: &Value) -> Vec<String> {
    body.pointer("/value")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter(|result| result.pointer("/status").and_then(Value::as_bool) == Some(false))
                .map(|result| {
                    let key = result.pointer("/key").and_then(Value::as_str).unwrap_or("?");
                    let message = result
                        .pointer("/errorMessage")
                        .and_then(Value::as_str)
                        .unwrap_or("rejected");
                    format!("{key} ({message})")
                })
                .collect()
        })
        .unwrap_or_default()
}

fn search_rows(body: Value) -> Vec<SearchRow> {
    match body {
        Value::Object(mut root) => match root.remove("value") {
            Some(Value::Array(rows)) => rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(mut fields) => {
                        fields.retain(|name, _| !name.starts_with("@search."));
                        Some(fields)
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
