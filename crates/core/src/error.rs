use std::fmt;
use thiserror::Error;

/// Remote capability a [`ServiceError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Embedding,
    Generation,
    Index,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Embedding => "embedding service",
            Backend::Generation => "generation service",
            Backend::Index => "index service",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {name}: {details}")]
    Invalid { name: String, details: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{backend} returned {status}: {details}")]
    BackendResponse {
        backend: Backend,
        status: u16,
        details: String,
    },

    #[error("{backend} request failed: {source}")]
    Transport {
        backend: Backend,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid response from {backend}: {details}")]
    Decode { backend: Backend, details: String },

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl ServiceError {
    pub fn backend(&self) -> Option<Backend> {
        match self {
            ServiceError::BackendResponse { backend, .. }
            | ServiceError::Transport { backend, .. }
            | ServiceError::Decode { backend, .. } => Some(*backend),
            ServiceError::DimensionMismatch { .. }
            | ServiceError::HttpClient(_)
            | ServiceError::Url(_) => None,
        }
    }

    pub(crate) fn transport(backend: Backend) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ServiceError::Transport { backend, source }
    }

    pub(crate) fn decode(backend: Backend, details: impl Into<String>) -> Self {
        ServiceError::Decode {
            backend,
            details: details.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("pdf directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("no pdf documents found in {0}")]
    NoDocuments(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("embedding worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),

    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_lists_every_name() {
        let error = ConfigError::Missing(vec![
            "AZURE_OPENAI_API_KEY".to_string(),
            "AZURE_SEARCH_ENDPOINT".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "missing required environment variables: AZURE_OPENAI_API_KEY, AZURE_SEARCH_ENDPOINT"
        );
    }

    #[test]
    fn service_errors_name_their_backend() {
        let error = ServiceError::BackendResponse {
            backend: Backend::Embedding,
            status: 429,
            details: "quota".to_string(),
        };
        assert_eq!(error.backend(), Some(Backend::Embedding));
        assert_eq!(error.to_string(), "embedding service returned 429: quota");
    }
}
