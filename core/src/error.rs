use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend failures are passed through untouched.
    #[error(transparent)]
    Provider(anyhow::Error),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Memory error: {0}")]
    Memory(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn cache(message: impl std::fmt::Display) -> Self {
        Self::Cache(message.to_string())
    }
}
