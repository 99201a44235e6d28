use std::collections::HashSet;

use colored::Colorize;
use council_core::{
    AuthorizationRequest, ConnectionStatus, Decision, EntryKey, LogEntry, Phase, Verdict,
};
use council_stream::SessionSnapshot;

/// Output produced for one snapshot.
#[derive(Debug, Default)]
pub struct Rendered {
    pub lines: Vec<String>,
    /// Authorization request seen for the first time
    pub new_authorization: Option<AuthorizationRequest>,
}

/// Turns successive snapshots into incremental terminal output.
#[derive(Debug, Default)]
pub struct Printer {
    show_timestamps: bool,
    phase: Option<Phase>,
    status: Option<ConnectionStatus>,
    error: Option<String>,
    seen: HashSet<EntryKey>,
    decision_shown: bool,
    authorization_id: Option<String>,
}

impl Printer {
    pub fn new(show_timestamps: bool) -> Self {
        Self {
            show_timestamps,
            ..Default::default()
        }
    }

    pub fn render(&mut self, snapshot: &SessionSnapshot) -> Rendered {
        let mut out = Rendered::default();

        if self.status != Some(snapshot.status) {
            self.status = Some(snapshot.status);
            out.lines.push(status_line(snapshot.status));
        }

        if snapshot.error != self.error {
            if let Some(error) = &snapshot.error {
                out.lines.push(format!("{} {}", "!".red().bold(), error.red()));
            }
            self.error = snapshot.error.clone();
        }

        if self.phase != Some(snapshot.phase) {
            self.phase = Some(snapshot.phase);
            if snapshot.phase != Phase::Idle {
                out.lines.push(format!(
                    "{} {}",
                    "==".blue(),
                    snapshot.phase.as_str().to_uppercase().blue().bold()
                ));
            }
        }

        for entry in &snapshot.messages {
            if self.seen.insert(entry.key()) {
                out.lines.push(self.message_line(entry));
            }
        }

        match &snapshot.authorization_request {
            Some(request) if self.authorization_id.as_ref() != Some(&request.request_id) => {
                self.authorization_id = Some(request.request_id.clone());
                out.lines.push(format!(
                    "{} {} needs authorization: {}",
                    "?".yellow().bold(),
                    request.provider_name.bold(),
                    request.authorization_url.underline()
                ));
                out.new_authorization = Some(request.clone());
            }
            Some(_) => {}
            None => self.authorization_id = None,
        }

        if let Some(decision) = &snapshot.decision {
            if !self.decision_shown {
                self.decision_shown = true;
                out.lines.extend(decision_lines(decision));
            }
        }

        out
    }

    fn message_line(&self, entry: &LogEntry) -> String {
        let prefix = if self.show_timestamps {
            format!("{} ", entry.occurred_at.format("%H:%M:%S").to_string().dimmed())
        } else {
            String::new()
        };
        format!(
            "{}{} {} {}",
            prefix,
            format!("[{}]", entry.participant_id).cyan(),
            format!("({})", entry.kind).dimmed(),
            entry.text
        )
    }
}

fn status_line(status: ConnectionStatus) -> String {
    let label = match status {
        ConnectionStatus::Connecting => "connecting".yellow(),
        ConnectionStatus::Connected => "connected".green(),
        ConnectionStatus::Disconnected => "disconnected".dimmed(),
        ConnectionStatus::Error => "error".red(),
    };
    format!("{} {}", "--".dimmed(), label)
}

fn decision_lines(decision: &Decision) -> Vec<String> {
    let verdict = match decision.verdict {
        Verdict::Invest => decision.verdict.as_str().green().bold(),
        Verdict::Maybe => decision.verdict.as_str().yellow().bold(),
        Verdict::Pass => decision.verdict.as_str().red().bold(),
        Verdict::Unknown => decision.verdict.as_str().normal(),
    };

    let mut lines = vec![
        String::new(),
        format!("Decision: {}", verdict),
        format!("  {}", decision.reasoning),
    ];
    for effect in &decision.side_effects {
        let when = effect.start_time.as_deref().unwrap_or("unscheduled");
        lines.push(format!("  • {} ({})", effect.title, when));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(text: &str, ms: i64) -> LogEntry {
        LogEntry::new("A", text, "info", Utc.timestamp_millis_opt(ms).unwrap())
    }

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_only_new_messages_are_printed() {
        plain();
        let mut printer = Printer::new(false);
        let mut snapshot = SessionSnapshot {
            messages: vec![entry("m2", 2)],
            ..Default::default()
        };
        let first = printer.render(&snapshot);
        assert!(first.lines.iter().any(|l| l.ends_with("m2")));

        snapshot.messages = vec![entry("m1", 1), entry("m2", 2)];
        let second = printer.render(&snapshot);
        assert_eq!(second.lines.len(), 1);
        assert!(second.lines[0].ends_with("m1"));
    }

    #[test]
    fn test_status_and_phase_printed_on_change() {
        plain();
        let mut printer = Printer::new(false);
        let mut snapshot = SessionSnapshot::default();
        let first = printer.render(&snapshot);
        assert_eq!(first.lines, vec!["-- connecting".to_string()]);

        assert!(printer.render(&snapshot).lines.is_empty());

        snapshot.status = ConnectionStatus::Connected;
        snapshot.phase = Phase::Research;
        let lines = printer.render(&snapshot).lines;
        assert_eq!(lines, vec!["-- connected".to_string(), "== RESEARCH".to_string()]);
    }

    #[test]
    fn test_authorization_reported_once() {
        plain();
        let mut printer = Printer::new(false);
        let snapshot = SessionSnapshot {
            authorization_request: Some(AuthorizationRequest::new(
                "github",
                "https://auth.example",
                "r1",
            )),
            ..Default::default()
        };

        let first = printer.render(&snapshot);
        assert_eq!(first.new_authorization.unwrap().request_id, "r1");
        assert!(printer.render(&snapshot).new_authorization.is_none());
    }

    #[test]
    fn test_decision_printed_once() {
        plain();
        let mut printer = Printer::new(false);
        let snapshot = SessionSnapshot {
            decision: Some(Decision {
                verdict: Verdict::Invest,
                reasoning: "Strong team".to_string(),
                memo: String::new(),
                side_effects: vec![],
            }),
            ..Default::default()
        };

        let lines = printer.render(&snapshot).lines;
        assert!(lines.contains(&"Decision: INVEST".to_string()));
        assert!(!printer
            .render(&snapshot)
            .lines
            .iter()
            .any(|l| l.starts_with("Decision")));
    }
}
