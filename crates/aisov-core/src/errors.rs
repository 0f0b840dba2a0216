use thiserror::Error;

/// A Model Oracle call failed. Callers treat this as skippable.
#[derive(Debug, Error)]
#[error("provider '{provider}' failed: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}

/// Classification output could not be read as a JSON object.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("classification output is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("classification output is not a JSON object (got {0})")]
    NotAnObject(&'static str),
}

/// Store operation failed. Always propagated; the enclosing run fails.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("store connection lock poisoned")]
    Poisoned,
    #[error("{0}")]
    Invariant(String),
}

/// The preferred clustering algorithm is not compiled into this build.
#[derive(Debug, Error)]
#[error("clustering algorithm '{0}' is unavailable in this build")]
pub struct ClusteringUnavailable(pub &'static str);

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
#[error("config error: {0}")]
pub struct ConfigError(pub String);

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read catalogue {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalogue entry {index}: unknown intent category '{category}'")]
    UnknownCategory { index: usize, category: String },
    #[error("catalogue entry {index}: prompt text is empty")]
    EmptyText { index: usize },
    #[error("no active prompts; seed a catalogue first")]
    NoActivePrompts,
}

pub type StoreResult<T> = Result<T, PersistenceError>;
