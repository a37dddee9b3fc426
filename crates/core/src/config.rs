use crate::error::ConfigError;
use std::env;
use url::Url;

pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const DEFAULT_TOKENIZER_ENCODING: &str = "cl100k_base";

/// Settings for the search and model endpoints, read once at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub search_endpoint: String,
    pub search_admin_key: String,
    pub search_query_key: String,
    pub search_index_name: String,
    pub search_api_version: String,
    pub openai_endpoint: String,
    pub openai_api_key: String,
    pub openai_api_version: String,
    pub openai_embedding_deployment: String,
    pub openai_chat_deployment: String,
    pub tokenizer_encoding: String,
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let read_or = |name: &str, default: &str| {
            let value = read(name);
            if value.is_empty() {
                default.to_string()
            } else {
                value
            }
        };

        let required = [
            ("AZURE_SEARCH_ENDPOINT", read("AZURE_SEARCH_ENDPOINT")),
            ("AZURE_SEARCH_ADMIN_KEY", read("AZURE_SEARCH_ADMIN_KEY")),
            ("AZURE_SEARCH_INDEX_NAME", read("AZURE_SEARCH_INDEX_NAME")),
            ("AZURE_OPENAI_ENDPOINT", read("AZURE_OPENAI_ENDPOINT")),
            ("AZURE_OPENAI_API_KEY", read("AZURE_OPENAI_API_KEY")),
            (
                "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
                read("AZURE_OPENAI_EMBEDDING_DEPLOYMENT"),
            ),
            (
                "AZURE_OPENAI_CHAT_DEPLOYMENT",
                read("AZURE_OPENAI_CHAT_DEPLOYMENT"),
            ),
        ];

        let missing = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let [
            search_endpoint,
            search_admin_key,
            search_index_name,
            openai_endpoint,
            openai_api_key,
            openai_embedding_deployment,
            openai_chat_deployment,
        ] = required.map(|(_, value)| value);

        validate_endpoint("AZURE_SEARCH_ENDPOINT", &search_endpoint)?;
        validate_endpoint("AZURE_OPENAI_ENDPOINT", &openai_endpoint)?;

        let search_query_key = read_or("AZURE_SEARCH_QUERY_KEY", &search_admin_key);

        Ok(Self {
            search_endpoint: search_endpoint.trim_end_matches('/').to_string(),
            search_admin_key,
            search_query_key,
            search_index_name,
            search_api_version: read_or("AZURE_SEARCH_API_VERSION", DEFAULT_SEARCH_API_VERSION),
            openai_endpoint: openai_endpoint.trim_end_matches('/').to_string(),
            openai_api_key,
            openai_api_version: read_or("AZURE_OPENAI_API_VERSION", DEFAULT_OPENAI_API_VERSION),
            openai_embedding_deployment,
            openai_chat_deployment,
            tokenizer_encoding: read_or("RAG_TOKENIZER_ENCODING", DEFAULT_TOKENIZER_ENCODING),
        })
    }
}

fn validate_endpoint(name: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value).map_err(|error| ConfigError::Invalid {
        name: name.to_string(),
        details: error.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            details: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AZURE_SEARCH_ENDPOINT", "https://search.example.net/"),
            ("AZURE_SEARCH_ADMIN_KEY", "admin-key"),
            ("AZURE_SEARCH_INDEX_NAME", "city-laws"),
            ("AZURE_OPENAI_ENDPOINT", "https://openai.example.net"),
            ("AZURE_OPENAI_API_KEY", "openai-key"),
            ("AZURE_OPENAI_EMBEDDING_DEPLOYMENT", "text-embedding-ada-002"),
            ("AZURE_OPENAI_CHAT_DEPLOYMENT", "gpt-4o"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|name| vars.get(name).map(|value| value.to_string()))
    }

    #[test]
    fn complete_environment_loads_with_defaults() {
        let config = load(&complete_env()).expect("config should load");
        assert_eq!(config.search_endpoint, "https://search.example.net");
        assert_eq!(config.search_query_key, "admin-key");
        assert_eq!(config.openai_api_version, DEFAULT_OPENAI_API_VERSION);
        assert_eq!(config.search_api_version, DEFAULT_SEARCH_API_VERSION);
        assert_eq!(config.tokenizer_encoding, DEFAULT_TOKENIZER_ENCODING);
    }

    #[test]
    fn query_key_is_used_when_present() {
        let mut vars = complete_env();
        vars.insert("AZURE_SEARCH_QUERY_KEY", "query-key");
        let config = load(&vars).expect("config should load");
        assert_eq!(config.search_query_key, "query-key");
    }

    #[test]
    fn missing_api_key_is_named() {
        let mut vars = complete_env();
        vars.remove("AZURE_OPENAI_API_KEY");
        let error = load(&vars).unwrap_err();
        assert!(matches!(
            &error,
            ConfigError::Missing(names) if names == &["AZURE_OPENAI_API_KEY"]
        ));
        assert!(error.to_string().contains("AZURE_OPENAI_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_missing_and_all_are_reported() {
        let mut vars = complete_env();
        vars.insert("AZURE_SEARCH_ENDPOINT", "   ");
        vars.remove("AZURE_OPENAI_CHAT_DEPLOYMENT");
        match load(&vars) {
            Err(ConfigError::Missing(names)) => assert_eq!(
                names,
                vec!["AZURE_SEARCH_ENDPOINT", "AZURE_OPENAI_CHAT_DEPLOYMENT"]
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let mut vars = complete_env();
        vars.insert("AZURE_OPENAI_ENDPOINT", "not a url");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name, .. }) if name == "AZURE_OPENAI_ENDPOINT"
        ));
    }
}
