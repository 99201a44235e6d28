//! Best-effort detection of authorization prompts in free-text messages.
//!
//! The server emits a structured `oauth_request` frame when it can. Older
//! crews only mention the missing authorization in an error or agent message,
//! so those texts are scanned for a known provider plus authorization wording.

use std::sync::OnceLock;

use council_core::AuthorizationRequest;
use regex::Regex;
use uuid::Uuid;

use crate::config::StreamConfig;

/// Providers that require an out-of-band authorization, with the names they
/// go by in free text.
const KNOWN_PROVIDERS: &[(&str, &[&str])] = &[
    ("apify", &["apify"]),
    ("gcalendar", &["google calendar", "gcalendar"]),
    ("gdrive", &["google drive", "gdrive"]),
    ("github", &["github"]),
];

fn auth_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(oauth|authori[sz](e|ed|ation)|authenticat(e|ed|ion)|unauthori[sz]ed)\b")
            .expect("valid regex")
    })
}

fn need_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(required|requires|require|needed|needs|missing|expired|not authori[sz]ed|unauthori[sz]ed)\b")
            .expect("valid regex")
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s)\]>"']+"#).expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct AuthorizationDetector {
    config: StreamConfig,
}

impl AuthorizationDetector {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Scan `text` for an authorization prompt.
    ///
    /// Uses the first URL in the text, falling back to the server's initiate
    /// endpoint for the provider.
    pub fn detect(&self, text: &str) -> Option<AuthorizationRequest> {
        if !auth_pattern().is_match(text) || !need_pattern().is_match(text) {
            return None;
        }

        let provider = provider_in(text)?;
        let url = url_pattern()
            .find(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .unwrap_or_else(|| self.config.authorization_url(provider));

        Some(AuthorizationRequest::new(
            provider,
            url,
            Uuid::new_v4().to_string(),
        ))
    }
}

fn provider_in(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    KNOWN_PROVIDERS
        .iter()
        .filter_map(|(provider, aliases)| {
            aliases
                .iter()
                .filter_map(|alias| lower.find(alias))
                .min()
                .map(|pos| (pos, *provider))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, provider)| provider)
}
