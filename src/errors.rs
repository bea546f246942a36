//! # Assistant Error Types Module
//!
//! Error types shared by the conversation flows, the storage backends and the
//! reminder scheduler.

use teloxide::dispatching::dialogue::InMemStorageError;

/// Errors surfaced by assistant operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssistantError {
    /// User input could not be accepted; carries the localization key of the
    /// message explaining why
    #[error("Validation error: {0}")]
    Validation(&'static str),
    /// A lookup matched nothing (empty category, no stats rows)
    #[error("Not found: {0}")]
    NotFound(String),
    /// A message could not be delivered to a user
    #[error("Delivery error: {0}")]
    Delivery(String),
    /// Storage is unreachable or its contents are corrupt
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AssistantError {
    /// Localization key of the message shown to the user for this error
    pub fn message_key(&self) -> &'static str {
        match self {
            AssistantError::Validation(key) => key,
            AssistantError::NotFound(_) => "error-no-data",
            AssistantError::Delivery(_) | AssistantError::Persistence(_) => "error-generic",
        }
    }
}

impl From<sqlx::Error> for AssistantError {
    fn from(err: sqlx::Error) -> Self {
        AssistantError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::Persistence(format!("corrupt document: {err}"))
    }
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        AssistantError::Persistence(err.to_string())
    }
}

impl From<InMemStorageError> for AssistantError {
    fn from(err: InMemStorageError) -> Self {
        AssistantError::Persistence(format!("dialogue storage: {err}"))
    }
}
