//! Frame decoder: raw SSE `data` payload to [`StreamEvent`]

use chrono::Utc;
use council_core::{
    timestamp_from_millis, AuthorizationRequest, CoreError, Decision, LogEntry, Phase,
    DEFAULT_MESSAGE_KIND,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{
    AgentMessageData, ConnectedData, Envelope, ErrorData, OAuthRequestData, PhaseChangeData,
    StreamEvent,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognized frame type: {0}")]
    UnknownType(String),

    #[error("Invalid payload: {0}")]
    Payload(#[from] CoreError),
}

/// Decode one frame.
pub fn decode_frame(raw: &str) -> Result<StreamEvent, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    decode_envelope(envelope)
}

/// Decode one frame, logging and discarding anything that does not decode.
pub fn decode_or_ignore(raw: &str) -> Option<StreamEvent> {
    match decode_frame(raw) {
        Ok(event) => Some(event),
        Err(DecodeError::UnknownType(kind)) => {
            tracing::debug!(kind = %kind, "Ignoring frame with unrecognized type");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, data = %raw, "Failed to decode frame");
            None
        }
    }
}

pub fn decode_envelope(envelope: Envelope) -> Result<StreamEvent, DecodeError> {
    let Envelope { kind, data } = envelope;

    match kind.as_str() {
        "phase_change" => {
            let payload: PhaseChangeData = payload(data)?;
            let phase: Phase = payload.phase.parse()?;
            Ok(StreamEvent::PhaseChange { phase })
        }
        "agent_message" => {
            let payload: AgentMessageData = payload(data)?;
            let occurred_at = match payload.timestamp {
                Some(ms) => timestamp_from_millis(ms.round() as i64)?,
                None => Utc::now(),
            };
            let kind = payload
                .message_type
                .unwrap_or_else(|| DEFAULT_MESSAGE_KIND.to_string());
            Ok(StreamEvent::AgentMessage(LogEntry::new(
                payload.agent,
                payload.message,
                kind,
                occurred_at,
            )))
        }
        "decision" => {
            let decision: Decision = payload(data)?;
            Ok(StreamEvent::Decision(decision))
        }
        "error" => {
            let payload: ErrorData = payload(data)?;
            Ok(StreamEvent::Error {
                message: payload.message,
                code: payload.code,
            })
        }
        "ping" => Ok(StreamEvent::Heartbeat),
        "connected" => {
            let payload: ConnectedData = if data.is_null() {
                ConnectedData::default()
            } else {
                serde_json::from_value(data)?
            };
            Ok(StreamEvent::Connected {
                session_id: payload.session_id,
            })
        }
        "oauth_request" => {
            let payload: OAuthRequestData = payload(data)?;
            Ok(StreamEvent::AuthorizationRequested(AuthorizationRequest::new(
                payload.mcp_name,
                payload.auth_url,
                payload.oauth_session_id,
            )))
        }
        _ => Err(DecodeError::UnknownType(kind)),
    }
}

fn payload<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, DecodeError> {
    Ok(serde_json::from_value(data)?)
}
