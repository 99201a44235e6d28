//! Reduces decoded events into phase, decision and authorization state.

use council_core::{AuthorizationRequest, Decision, Phase};
use events::StreamEvent;
use tracing::{debug, info, warn};

use crate::authorization::AuthorizationDetector;

/// What applying one event did to the projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectorUpdate {
    Unchanged,
    Changed,
    /// The server reported an application error
    ApplicationError(String),
}

#[derive(Debug, Clone)]
pub struct Projector {
    phase: Phase,
    decision: Option<Decision>,
    authorization: Option<AuthorizationRequest>,
    completed: bool,
    detector: AuthorizationDetector,
}

impl Projector {
    pub fn new(detector: AuthorizationDetector) -> Self {
        Self {
            phase: Phase::default(),
            decision: None,
            authorization: None,
            completed: false,
            detector,
        }
    }

    pub fn apply(&mut self, event: &StreamEvent) -> ProjectorUpdate {
        match event {
            StreamEvent::PhaseChange { phase } => {
                info!(from = %self.phase, to = %phase, "Phase changed");
                self.phase = *phase;
                if phase.is_terminal() {
                    self.completed = true;
                }
                ProjectorUpdate::Changed
            }
            StreamEvent::Decision(decision) => {
                if self.decision.is_some() {
                    warn!(verdict = %decision.verdict, "Ignoring second decision for session");
                    return ProjectorUpdate::Unchanged;
                }
                info!(verdict = %decision.verdict, "Decision received");
                self.decision = Some(decision.clone());
                self.phase = Phase::Completed;
                self.completed = true;
                ProjectorUpdate::Changed
            }
            StreamEvent::Error { message, code } => {
                warn!(message = %message, code = ?code, "Server reported an error");
                self.detect_authorization(message);
                ProjectorUpdate::ApplicationError(message.clone())
            }
            StreamEvent::AgentMessage(entry) => {
                if self.detect_authorization(&entry.text) {
                    ProjectorUpdate::Changed
                } else {
                    ProjectorUpdate::Unchanged
                }
            }
            StreamEvent::AuthorizationRequested(request) => {
                self.set_authorization(request.clone());
                ProjectorUpdate::Changed
            }
            StreamEvent::Heartbeat | StreamEvent::Connected { .. } => ProjectorUpdate::Unchanged,
        }
    }

    fn detect_authorization(&mut self, text: &str) -> bool {
        match self.detector.detect(text) {
            Some(request) => {
                self.set_authorization(request);
                true
            }
            None => false,
        }
    }

    fn set_authorization(&mut self, request: AuthorizationRequest) {
        if let Some(previous) = &self.authorization {
            debug!(previous = %previous.request_id, "Superseding authorization request");
        }
        info!(
            provider = %request.provider_name,
            request_id = %request.request_id,
            "Authorization requested"
        );
        self.authorization = Some(request);
    }

    /// Clear the live authorization request if it is `request_id`.
    pub fn resolve_authorization(&mut self, request_id: &str) -> bool {
        match &self.authorization {
            Some(request) if request.request_id == request_id => {
                self.authorization = None;
                true
            }
            _ => false,
        }
    }

    pub fn dismiss_authorization(&mut self) -> bool {
        self.authorization.take().is_some()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn authorization(&self) -> Option<&AuthorizationRequest> {
        self.authorization.as_ref()
    }

    /// Whether the workflow reached its terminal phase on this stream.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use chrono::Utc;
    use council_core::{LogEntry, Verdict};

    fn projector() -> Projector {
        Projector::new(AuthorizationDetector::new(StreamConfig::default()))
    }

    fn decision(verdict: Verdict) -> Decision {
        Decision {
            verdict,
            reasoning: "r".to_string(),
            memo: "m".to_string(),
            side_effects: vec![],
        }
    }

    #[test]
    fn test_phase_change_applies_any_phase() {
        let mut p = projector();
        p.apply(&StreamEvent::PhaseChange {
            phase: Phase::Decision,
        });
        assert_eq!(p.phase(), Phase::Decision);

        p.apply(&StreamEvent::PhaseChange {
            phase: Phase::Research,
        });
        assert_eq!(p.phase(), Phase::Research);
        assert!(!p.is_completed());
    }

    #[test]
    fn test_completed_phase_latches() {
        let mut p = projector();
        p.apply(&StreamEvent::PhaseChange {
            phase: Phase::Completed,
        });
        assert!(p.is_completed());
    }

    #[test]
    fn test_decision_forces_completed() {
        let mut p = projector();
        p.apply(&StreamEvent::PhaseChange {
            phase: Phase::Debate,
        });
        let update = p.apply(&StreamEvent::Decision(decision(Verdict::Invest)));

        assert_eq!(update, ProjectorUpdate::Changed);
        assert_eq!(p.phase(), Phase::Completed);
        assert!(p.is_completed());
        assert_eq!(p.decision().unwrap().verdict, Verdict::Invest);
    }

    #[test]
    fn test_decision_is_immutable() {
        let mut p = projector();
        p.apply(&StreamEvent::Decision(decision(Verdict::Invest)));
        let update = p.apply(&StreamEvent::Decision(decision(Verdict::Pass)));

        assert_eq!(update, ProjectorUpdate::Unchanged);
        assert_eq!(p.decision().unwrap().verdict, Verdict::Invest);
    }

    #[test]
    fn test_error_event_is_reported() {
        let mut p = projector();
        let update = p.apply(&StreamEvent::Error {
            message: "Crew crashed".to_string(),
            code: None,
        });
        assert_eq!(
            update,
            ProjectorUpdate::ApplicationError("Crew crashed".to_string())
        );
        assert!(!p.is_completed());
        assert!(p.authorization().is_none());
    }

    #[test]
    fn test_error_event_with_authorization_wording() {
        let mut p = projector();
        p.apply(&StreamEvent::Error {
            message: "Apify OAuth authentication required".to_string(),
            code: None,
        });
        assert_eq!(p.authorization().unwrap().provider_name, "apify");
    }

    #[test]
    fn test_agent_message_with_authorization_wording() {
        let mut p = projector();
        let entry = LogEntry::new(
            "market_researcher",
            "GitHub requires authorization: https://auth.example/gh",
            "info",
            Utc::now(),
        );
        let update = p.apply(&StreamEvent::AgentMessage(entry));
        assert_eq!(update, ProjectorUpdate::Changed);
        assert_eq!(
            p.authorization().unwrap().authorization_url,
            "https://auth.example/gh"
        );
    }

    #[test]
    fn test_newer_request_supersedes_and_resolution_clears() {
        let mut p = projector();
        p.apply(&StreamEvent::AuthorizationRequested(AuthorizationRequest::new(
            "github", "https://a", "one",
        )));
        p.apply(&StreamEvent::AuthorizationRequested(AuthorizationRequest::new(
            "gdrive", "https://b", "two",
        )));
        assert_eq!(p.authorization().unwrap().request_id, "two");

        assert!(!p.resolve_authorization("one"));
        assert!(p.authorization().is_some());
        assert!(p.resolve_authorization("two"));
        assert!(p.authorization().is_none());
    }

    #[test]
    fn test_dismiss_authorization() {
        let mut p = projector();
        assert!(!p.dismiss_authorization());
        p.apply(&StreamEvent::AuthorizationRequested(AuthorizationRequest::new(
            "github", "https://a", "one",
        )));
        assert!(p.dismiss_authorization());
        assert!(p.authorization().is_none());
    }

    #[test]
    fn test_heartbeat_changes_nothing() {
        let mut p = projector();
        assert_eq!(p.apply(&StreamEvent::Heartbeat), ProjectorUpdate::Unchanged);
        assert_eq!(p.phase(), Phase::Idle);
    }
}
