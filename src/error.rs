use std::time::Duration;
use thiserror::Error;

/// Fatal setup problems. Nothing is invoked once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential for {provider}: environment variable {env_var} is unset or empty")]
    MissingCredential { provider: String, env_var: String },

    #[error("no response collection configured for model {0:?}")]
    MissingCollection(String),

    #[error("model {0:?} is configured more than once")]
    DuplicateModel(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while loading prompts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("prompt file {path} has no {column:?} column")]
    MissingColumn { path: String, column: String },

    #[error("failed to read prompt file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from a single model invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("authentication rejected by provider")]
    Auth,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("API request failed: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("provider returned no content")]
    EmptyResponse,

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write to collection {collection}: {message}")]
    Write { collection: String, message: String },

    #[error("failed to query collection {collection}: {message}")]
    Query { collection: String, message: String },
}
