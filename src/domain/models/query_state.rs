use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Snapshot of the live session as seen by consumers.
///
/// `generation` identifies the session that produced the snapshot. Session
/// tasks compare it against their own generation before every mutation, so a
/// superseded session can never write into a newer one's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    generation: u64,
    query: Option<String>,
    text: String,
    status: QueryStatus,
    error: Option<String>,
}

impl QueryState {
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn loading(generation: u64, query: impl Into<String>) -> Self {
        Self {
            generation,
            query: Some(query.into()),
            text: String::new(),
            status: QueryStatus::Loading,
            error: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns whether the visible text changed.
    pub(crate) fn append(&mut self, text: &str) -> bool {
        if !self.is_loading() || text.is_empty() {
            return false;
        }
        self.text.push_str(text);
        true
    }

    pub(crate) fn succeed(&mut self) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.status = QueryStatus::Succeeded;
        true
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.status = QueryStatus::Failed;
        self.error = Some(message.into());
        true
    }
}
