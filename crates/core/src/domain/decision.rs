use serde::{Deserialize, Serialize};

/// Final verdict of the council.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Verdict {
    Pass,
    Maybe,
    Invest,
    /// Verdict string this client does not recognize
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Maybe => "MAYBE",
            Self::Invest => "INVEST",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for Verdict {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Self::Pass,
            "MAYBE" => Self::Maybe,
            "INVEST" => Self::Invest,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Follow-up action attached to a decision (the server emits calendar events).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SideEffect {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Terminal decision of a session.
///
/// Accepts both the canonical field names and the ones the council server
/// emits (`decision`, `investment_memo`, `calendar_events`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Decision {
    #[serde(alias = "decision")]
    pub verdict: Verdict,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, alias = "investment_memo")]
    pub memo: String,
    #[serde(default, alias = "calendar_events")]
    pub side_effects: Vec<SideEffect>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_server_payload() {
        let json = r#"{
            "decision": "INVEST",
            "reasoning": "Strong team",
            "investment_memo": "Memo body",
            "calendar_events": [
                {"title": "Due Diligence Kickoff", "attendees": ["Lead Partner"]}
            ]
        }"#;
        let decision: Decision = serde_json::from_str(json).unwrap();

        assert_eq!(decision.verdict, Verdict::Invest);
        assert_eq!(decision.memo, "Memo body");
        assert_eq!(decision.side_effects.len(), 1);
        assert_eq!(decision.side_effects[0].title, "Due Diligence Kickoff");
        assert!(decision.side_effects[0].start_time.is_none());
    }

    #[test]
    fn test_decision_canonical_names() {
        let json = r#"{"verdict":"pass","reasoning":"No moat","memo":"","side_effects":[]}"#;
        let decision: Decision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.verdict, Verdict::Pass);
        assert!(decision.side_effects.is_empty());
    }

    #[test]
    fn test_unrecognized_verdict_is_kept() {
        let decision: Decision = serde_json::from_str(r#"{"verdict":"DEFER"}"#).unwrap();
        assert_eq!(decision.verdict, Verdict::Unknown);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_verdict_serializes_uppercase() {
        let json = serde_json::to_string(&Verdict::Maybe).unwrap();
        assert_eq!(json, "\"MAYBE\"");
    }
}
