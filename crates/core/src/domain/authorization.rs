use serde::{Deserialize, Serialize};

/// Out-of-band authorization the server needs before a tool provider can run.
///
/// The popup flow that completes it lives outside this crate; it reports back
/// by `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AuthorizationRequest {
    pub provider_name: String,
    pub authorization_url: String,
    pub request_id: String,
}

impl AuthorizationRequest {
    pub fn new(
        provider_name: impl Into<String>,
        authorization_url: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            authorization_url: authorization_url.into(),
            request_id: request_id.into(),
        }
    }
}
