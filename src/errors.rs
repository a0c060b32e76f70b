//! # Error Types Module
//!
//! This module defines the error types used throughout the task dialogue.
//! Every variant is converted into a chat message at the handler boundary,
//! so none of them ever reaches the dispatcher unhandled.

use thiserror::Error;

use crate::drafts::DraftId;
use crate::session::DialogStage;

/// Errors raised by the dialogue core and its collaborators
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// A button referenced a draft that is no longer registered
    #[error("draft not found: {0}")]
    DraftNotFound(DraftId),
    /// The task database could not be reached or rejected the request
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A button does not belong to the conversation's current stage
    #[error("invalid transition: expected {expected}, got {actual}")]
    InvalidTransition {
        expected: String,
        actual: String,
    },
    /// A callback payload could not be decoded
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// An encoded payload exceeds the transport limit
    #[error("payload of {len} bytes exceeds limit of {limit}")]
    PayloadTooLong { len: usize, limit: usize },
    /// Startup configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),
}

impl TaskError {
    pub(crate) fn unexpected_stage(expected: Option<DialogStage>, actual: &str) -> Self {
        TaskError::InvalidTransition {
            expected: expected
                .map(|stage| stage.to_string())
                .unwrap_or_else(|| "no active dialog".to_string()),
            actual: actual.to_string(),
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(err: reqwest::Error) -> Self {
        TaskError::BackendUnavailable(err.to_string())
    }
}
