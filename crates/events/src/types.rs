//! Wire and decoded event types for the council session stream

use council_core::{AuthorizationRequest, Decision, LogEntry, Phase};
use serde::{Deserialize, Serialize};

/// Envelope carried by every frame: a `type` tag plus a type-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload, parsed according to `kind`
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of a `phase_change` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseChangeData {
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

/// Payload of an `agent_message` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessageData {
    /// Participant id
    pub agent: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Epoch milliseconds; the client clock is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Payload of an `error` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Payload of an `oauth_request` frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthRequestData {
    pub mcp_name: String,
    pub auth_url: String,
    pub oauth_session_id: String,
}

/// Payload of the `connected` hello frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectedData {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A frame after decoding. The set is closed; anything else is ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Server asserts the workflow phase
    PhaseChange { phase: Phase },

    /// Chat-style message from a participant
    AgentMessage(LogEntry),

    /// Terminal decision
    Decision(Decision),

    /// Application-level error reported by the server
    Error {
        message: String,
        code: Option<String>,
    },

    /// Liveness only
    Heartbeat,

    /// Server hello sent when the stream opens
    Connected { session_id: Option<String> },

    /// Structured authorization request for a tool provider
    AuthorizationRequested(AuthorizationRequest),
}

impl StreamEvent {
    /// Wire tag of the frame this event was decoded from
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::PhaseChange { .. } => "phase_change",
            StreamEvent::AgentMessage(_) => "agent_message",
            StreamEvent::Decision(_) => "decision",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Heartbeat => "ping",
            StreamEvent::Connected { .. } => "connected",
            StreamEvent::AuthorizationRequested(_) => "oauth_request",
        }
    }

    /// Events that only prove liveness and carry no state change
    pub fn is_liveness_only(&self) -> bool {
        matches!(self, StreamEvent::Heartbeat | StreamEvent::Connected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(envelope.kind, "ping");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_agent_message_data_optional_fields() {
        let json = r#"{"agent":"bull_agent","message":"Upside is large"}"#;
        let data: AgentMessageData = serde_json::from_str(json).unwrap();
        assert_eq!(data.agent, "bull_agent");
        assert!(data.message_type.is_none());
        assert!(data.timestamp.is_none());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(StreamEvent::Heartbeat.kind(), "ping");
        assert!(StreamEvent::Heartbeat.is_liveness_only());
        assert!(!StreamEvent::PhaseChange {
            phase: Phase::Research
        }
        .is_liveness_only());
    }
}
