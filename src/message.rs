//! Vote messages as they arrive on the queue.

use serde::Deserialize;
use thiserror::Error;

/// Error type for payloads that are not a valid vote.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Vote payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid vote payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single vote event, e.g. `{"voter_id": "a1b2", "vote": "a"}`.
///
/// Unknown fields are ignored. Both fields must be JSON strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteMessage {
    pub voter_id: String,
    pub vote: String,
}

impl VoteMessage {
    /// Parse a raw queue payload.
    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Parse a payload exactly as it was popped off the queue.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, MessageError> {
        Self::parse(std::str::from_utf8(payload)?)
    }
}
