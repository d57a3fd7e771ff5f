use thiserror::Error;

/// Message shown to callers when a failure carries no description of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to fetch response";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Required credential or configuration is missing; retrying will not help.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The source answered, but reported a logical failure.
    #[error("Source error: {0}")]
    Source(String),
}

impl QueryError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport(_) => "transport",
            Self::Source(_) => "source",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(msg) | Self::Transport(msg) | Self::Source(msg) => msg,
        }
    }

    /// Human-readable description for the published state. Never empty.
    pub fn user_message(&self) -> String {
        let msg = self.message().trim();
        if msg.is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            msg.to_string()
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
