//! Audit report: cross-mode conflicts graded and turned into guidance for
//! the synthesizer.

use crate::merge::{Conflict, ConflictKind, MergedOutputs};
use crate::schema::Impact;
use serde::{Deserialize, Serialize};

/// A graded conflict entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub topic: String,
    pub severity: Impact,
    /// Contributing modes, sorted
    pub modes: Vec<String>,
    pub description: String,
}

/// The audit handed to the synthesizer alongside the merged outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub conflicts: Vec<ConflictReport>,
    pub resolution_suggestions: Vec<String>,
}

impl AuditReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// One-paragraph summary for prompts and logs.
    pub fn summary(&self) -> String {
        if self.conflicts.is_empty() {
            return "No cross-mode conflicts detected.".to_string();
        }
        let mut lines = vec![format!(
            "{} cross-mode conflict(s) detected:",
            self.conflicts.len()
        )];
        for c in &self.conflicts {
            lines.push(format!(
                "- [{}] {} ({})",
                c.severity,
                c.topic,
                c.modes.join(", ")
            ));
        }
        lines.join("\n")
    }
}

/// Severity a conflict kind carries into the report.
fn grade(conflict: &Conflict) -> Impact {
    match conflict.kind {
        // Opposing actions on the same object block a combined answer.
        ConflictKind::Recommendation => Impact::High,
        ConflictKind::Severity => Impact::High,
        ConflictKind::Thesis => Impact::Medium,
    }
}

fn suggestion(conflict: &Conflict) -> String {
    match conflict.kind {
        ConflictKind::Thesis => format!(
            "Ask {} to restate their theses on '{}' with explicit evidence, then weigh them against each other.",
            conflict.modes.join(" and "),
            conflict.topic
        ),
        ConflictKind::Severity => format!(
            "Re-rate the risk '{}' using the evidence from {}; the gap between ratings is too wide to average.",
            conflict.topic,
            conflict.modes.join(" and ")
        ),
        ConflictKind::Recommendation => format!(
            "Decide explicitly between the opposing actions on '{}' proposed by {}; do not include both.",
            conflict.topic,
            conflict.modes.join(" and ")
        ),
    }
}

/// Build the audit report from mechanically merged outputs.
pub fn build_audit(merged: &MergedOutputs) -> AuditReport {
    let conflicts: Vec<ConflictReport> = merged
        .conflicts
        .iter()
        .map(|c| ConflictReport {
            topic: c.topic.clone(),
            severity: grade(c),
            modes: c.modes.clone(),
            description: c.description.clone(),
        })
        .collect();

    let resolution_suggestions = merged.conflicts.iter().map(suggestion).collect();

    AuditReport {
        conflicts,
        resolution_suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeEngine;
    use crate::schema::{Impact, ModeOutput, Risk};
    use pretty_assertions::assert_eq;

    fn risky_output(mode_id: &str, impact: Impact) -> ModeOutput {
        let mut o = ModeOutput::new(mode_id, "thesis");
        o.confidence = 0.8;
        o.risks.push(Risk {
            text: "duplicate invoices on retry".into(),
            likelihood: 0.5,
            impact: Some(impact),
            mitigation: None,
        });
        o
    }

    #[test]
    fn test_severity_conflict_graded_high() {
        let outputs = vec![
            risky_output("deductive", Impact::Critical),
            risky_output("abductive", Impact::Low),
        ];
        let merged = MergeEngine::default().merge(&outputs);
        let audit = build_audit(&merged);

        assert_eq!(audit.conflicts.len(), 1);
        let conflict = &audit.conflicts[0];
        assert_eq!(conflict.severity, Impact::High);
        assert_eq!(conflict.modes, vec!["abductive", "deductive"]);
        assert_eq!(audit.resolution_suggestions.len(), 1);
        assert!(audit.summary().contains("duplicate invoices"));
    }

    #[test]
    fn test_clean_outputs_produce_empty_audit() {
        let outputs = vec![
            ModeOutput::new("deductive", "all holds"),
            ModeOutput::new("abductive", "all holds"),
        ];
        let merged = MergeEngine::default().merge(&outputs);
        let audit = build_audit(&merged);
        assert!(!audit.has_conflicts());
        assert_eq!(audit.summary(), "No cross-mode conflicts detected.");
    }
}
