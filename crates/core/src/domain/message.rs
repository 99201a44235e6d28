use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Message kind used when the server does not provide one.
pub const DEFAULT_MESSAGE_KIND: &str = "info";

/// One chat-style message delivered by a workflow participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LogEntry {
    /// Participant (agent) that produced the message
    pub participant_id: String,
    /// Message text
    pub text: String,
    /// Free-form message kind (analysis, insight, conclusion, ...)
    pub kind: String,
    /// When the server says the message occurred
    pub occurred_at: DateTime<Utc>,
}

/// Deduplication identity of a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub participant_id: String,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        participant_id: impl Into<String>,
        text: impl Into<String>,
        kind: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            text: text.into(),
            kind: kind.into(),
            occurred_at,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            participant_id: self.participant_id.clone(),
            text: self.text.clone(),
            occurred_at: self.occurred_at,
        }
    }
}

/// Converts an epoch-milliseconds timestamp as sent on the wire.
pub fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(CoreError::InvalidTimestamp(ms))
}
