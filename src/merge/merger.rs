//! Multi-axis mechanical merger and cross-mode conflict detection.

use super::similarity::{normalize_tokens, text_similarity, EvidencePointer};
use crate::schema::{Impact, ModeOutput, Recommendation, Risk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inferred intent of a recommendation, from keyword heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    AddTest,
    Security,
    Fix,
    Remove,
    Refactor,
    Document,
    Update,
    Optimize,
    AddFeature,
    Other,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AddTest => "add-test",
            Self::Security => "security",
            Self::Fix => "fix",
            Self::Remove => "remove",
            Self::Refactor => "refactor",
            Self::Document => "document",
            Self::Update => "update",
            Self::Optimize => "optimize",
            Self::AddFeature => "add-feature",
            Self::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Classify a recommendation text. Earlier rules win, so "add a regression
/// test" is add-test rather than add-feature.
pub fn classify_action(text: &str) -> ActionType {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["test", "coverage", "assertion"]) {
        ActionType::AddTest
    } else if has(&["security", "vulnerab", "sanitize", "escape", "injection", "auth"]) {
        ActionType::Security
    } else if has(&["fix", "repair", "correct", "resolve", "patch"]) {
        ActionType::Fix
    } else if has(&["remove", "delete", "drop", "deprecate", "eliminate"]) {
        ActionType::Remove
    } else if has(&["refactor", "restructure", "extract", "simplif", "clean up"]) {
        ActionType::Refactor
    } else if has(&["document", "docs", "comment", "readme"]) {
        ActionType::Document
    } else if has(&["update", "upgrade", "bump", "migrate"]) {
        ActionType::Update
    } else if has(&["optimiz", "performance", "cache", "speed up", "latency"]) {
        ActionType::Optimize
    } else if has(&["add", "implement", "introduce", "create", "build"]) {
        ActionType::AddFeature
    } else {
        ActionType::Other
    }
}

/// A finding text shared by one or more modes at one evidence location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFinding {
    pub text: String,
    /// Contributing modes, sorted
    pub modes: Vec<String>,
    /// Highest confidence among contributors
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
}

/// Findings at one evidence pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceGroup {
    /// Canonical `path[:line]` key; empty for findings without evidence
    pub pointer: String,
    pub findings: Vec<MergedFinding>,
}

/// Risks at one severity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    pub risks: Vec<AttributedRisk>,
}

/// A risk with its source mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedRisk {
    pub mode_id: String,
    pub risk: Risk,
}

/// Recommendations sharing an inferred action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub action: ActionType,
    pub recommendations: Vec<AttributedRecommendation>,
}

/// A recommendation with its source mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedRecommendation {
    pub mode_id: String,
    pub recommendation: Recommendation,
}

/// Kind of cross-mode disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Opposing thesis sentiment on the same topic
    Thesis,
    /// Same risk rated at widely different severities
    Severity,
    /// Antonymic actions on the same object
    Recommendation,
}

/// One detected disagreement between modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub topic: String,
    /// Modes on either side, sorted
    pub modes: Vec<String>,
    pub description: String,
}

/// Everything the mechanical merge produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedOutputs {
    pub findings_by_evidence: Vec<EvidenceGroup>,
    /// Severity groups in critical-to-low order, unrated last
    pub risks_by_severity: Vec<SeverityGroup>,
    pub recommendations_by_action: Vec<ActionGroup>,
    pub conflicts: Vec<Conflict>,
}

/// Mechanical merger configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeEngine {
    /// Jaccard threshold for treating two texts as the same statement
    pub near_duplicate_threshold: f64,
    /// Minimum topic overlap before theses are compared for sentiment
    pub topic_overlap_threshold: f64,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self {
            near_duplicate_threshold: 0.75,
            topic_overlap_threshold: 0.3,
        }
    }
}

impl MergeEngine {
    /// Merge outputs along all three axes and detect conflicts.
    pub fn merge(&self, outputs: &[ModeOutput]) -> MergedOutputs {
        MergedOutputs {
            findings_by_evidence: self.group_findings(outputs),
            risks_by_severity: group_risks(outputs),
            recommendations_by_action: group_recommendations(outputs),
            conflicts: self.detect_conflicts(outputs),
        }
    }

    fn group_findings(&self, outputs: &[ModeOutput]) -> Vec<EvidenceGroup> {
        let mut by_pointer: BTreeMap<String, Vec<(String, &crate::schema::Finding)>> =
            BTreeMap::new();
        for output in outputs {
            for finding in &output.top_findings {
                let key = finding
                    .evidence
                    .as_deref()
                    .and_then(EvidencePointer::parse)
                    .map(|p| p.key())
                    .unwrap_or_default();
                by_pointer
                    .entry(key)
                    .or_default()
                    .push((output.mode_id.clone(), finding));
            }
        }

        by_pointer
            .into_iter()
            .map(|(pointer, entries)| {
                let mut merged: Vec<MergedFinding> = Vec::new();
                for (mode_id, finding) in entries {
                    match merged.iter_mut().find(|m| {
                        text_similarity(&m.text, &finding.text) >= self.near_duplicate_threshold
                    }) {
                        Some(existing) => {
                            if !existing.modes.contains(&mode_id) {
                                existing.modes.push(mode_id);
                                existing.modes.sort();
                            }
                            if finding.confidence > existing.confidence {
                                existing.confidence = finding.confidence;
                                existing.text = finding.text.clone();
                            }
                        }
                        None => merged.push(MergedFinding {
                            text: finding.text.clone(),
                            modes: vec![mode_id],
                            confidence: finding.confidence,
                            impact: finding.impact,
                        }),
                    }
                }
                merged.sort_by(|a, b| a.text.cmp(&b.text));
                EvidenceGroup {
                    pointer,
                    findings: merged,
                }
            })
            .collect()
    }

    fn detect_conflicts(&self, outputs: &[ModeOutput]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        conflicts.extend(self.thesis_conflicts(outputs));
        conflicts.extend(self.severity_conflicts(outputs));
        conflicts.extend(self.recommendation_conflicts(outputs));
        conflicts
    }

    fn thesis_conflicts(&self, outputs: &[ModeOutput]) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (i, a) in outputs.iter().enumerate() {
            for b in outputs.iter().skip(i + 1) {
                let (sa, sb) = (thesis_sentiment(&a.thesis), thesis_sentiment(&b.thesis));
                if sa * sb >= 0 {
                    continue;
                }
                let topic_a = topic_tokens(&a.thesis);
                let topic_b = topic_tokens(&b.thesis);
                let overlap = super::similarity::jaccard(&topic_a, &topic_b);
                if overlap < self.topic_overlap_threshold {
                    continue;
                }
                let topic: Vec<String> =
                    topic_a.intersection(&topic_b).take(4).cloned().collect();
                let mut modes = vec![a.mode_id.clone(), b.mode_id.clone()];
                modes.sort();
                conflicts.push(Conflict {
                    kind: ConflictKind::Thesis,
                    topic: topic.join(" "),
                    description: format!(
                        "{} and {} reach opposing conclusions on the same topic",
                        modes[0], modes[1]
                    ),
                    modes,
                });
            }
        }
        conflicts
    }

    fn severity_conflicts(&self, outputs: &[ModeOutput]) -> Vec<Conflict> {
        let mut rated: Vec<(&str, &Risk, Impact)> = Vec::new();
        for output in outputs {
            for risk in &output.risks {
                if let Some(impact) = risk.impact {
                    rated.push((&output.mode_id, risk, impact));
                }
            }
        }

        let mut conflicts = Vec::new();
        for (i, (mode_a, risk_a, impact_a)) in rated.iter().enumerate() {
            for (mode_b, risk_b, impact_b) in rated.iter().skip(i + 1) {
                if mode_a == mode_b {
                    continue;
                }
                if text_similarity(&risk_a.text, &risk_b.text) < self.near_duplicate_threshold {
                    continue;
                }
                let gap = impact_a.rank().abs_diff(impact_b.rank());
                if gap < 3 {
                    continue;
                }
                let mut modes = vec![mode_a.to_string(), mode_b.to_string()];
                modes.sort();
                conflicts.push(Conflict {
                    kind: ConflictKind::Severity,
                    topic: risk_a.text.clone(),
                    description: format!(
                        "same risk rated {} by {} but {} by {}",
                        impact_a, mode_a, impact_b, mode_b
                    ),
                    modes,
                });
            }
        }
        conflicts
    }

    fn recommendation_conflicts(&self, outputs: &[ModeOutput]) -> Vec<Conflict> {
        let mut classified: Vec<(&str, &Recommendation, ActionType)> = Vec::new();
        for output in outputs {
            for rec in &output.recommendations {
                classified.push((&output.mode_id, rec, classify_action(&rec.text)));
            }
        }

        let antonyms = |a: ActionType, b: ActionType| {
            matches!(
                (a, b),
                (ActionType::AddFeature, ActionType::Remove)
                    | (ActionType::Remove, ActionType::AddFeature)
                    | (ActionType::AddTest, ActionType::Remove)
                    | (ActionType::Remove, ActionType::AddTest)
            )
        };

        let mut conflicts = Vec::new();
        for (i, (mode_a, rec_a, act_a)) in classified.iter().enumerate() {
            for (mode_b, rec_b, act_b) in classified.iter().skip(i + 1) {
                if mode_a == mode_b || !antonyms(*act_a, *act_b) {
                    continue;
                }
                let obj_a = topic_tokens(&rec_a.text);
                let obj_b = topic_tokens(&rec_b.text);
                if super::similarity::jaccard(&obj_a, &obj_b) < 0.5 {
                    continue;
                }
                let object: Vec<String> = obj_a.intersection(&obj_b).take(4).cloned().collect();
                let mut modes = vec![mode_a.to_string(), mode_b.to_string()];
                modes.sort();
                conflicts.push(Conflict {
                    kind: ConflictKind::Recommendation,
                    topic: object.join(" "),
                    description: format!(
                        "{} recommends {} while {} recommends {} for the same object",
                        mode_a, act_a, mode_b, act_b
                    ),
                    modes,
                });
            }
        }
        conflicts
    }
}

fn group_risks(outputs: &[ModeOutput]) -> Vec<SeverityGroup> {
    let mut groups: Vec<SeverityGroup> = Impact::ALL
        .iter()
        .map(|&impact| SeverityGroup {
            impact: Some(impact),
            risks: Vec::new(),
        })
        .collect();
    let mut unrated = SeverityGroup {
        impact: None,
        risks: Vec::new(),
    };

    for output in outputs {
        for risk in &output.risks {
            let attributed = AttributedRisk {
                mode_id: output.mode_id.clone(),
                risk: risk.clone(),
            };
            match risk.impact {
                Some(impact) => groups[impact.rank() as usize].risks.push(attributed),
                None => unrated.risks.push(attributed),
            }
        }
    }

    if !unrated.risks.is_empty() {
        groups.push(unrated);
    }
    groups.retain(|g| !g.risks.is_empty());
    groups
}

fn group_recommendations(outputs: &[ModeOutput]) -> Vec<ActionGroup> {
    let mut by_action: BTreeMap<ActionType, Vec<AttributedRecommendation>> = BTreeMap::new();
    for output in outputs {
        for rec in &output.recommendations {
            by_action
                .entry(classify_action(&rec.text))
                .or_default()
                .push(AttributedRecommendation {
                    mode_id: output.mode_id.clone(),
                    recommendation: rec.clone(),
                });
        }
    }
    by_action
        .into_iter()
        .map(|(action, recommendations)| ActionGroup {
            action,
            recommendations,
        })
        .collect()
}

/// Words that assert and words that negate; a thesis leaning on the
/// latter reads as a rejection.
const AFFIRMATIVE_WORDS: &[&str] = &[
    "should", "must", "works", "correct", "safe", "sound", "viable", "adopt", "keep", "holds",
    "sufficient", "adequate",
];
const NEGATING_WORDS: &[&str] = &[
    "not", "no", "never", "avoid", "unsafe", "broken", "incorrect", "flawed", "fails", "lacks",
    "insufficient", "inadequate", "wrong", "cannot",
];

/// Sentiment sign of a thesis: negative beats positive when both appear.
fn thesis_sentiment(thesis: &str) -> i8 {
    let tokens = normalize_tokens(thesis);
    if NEGATING_WORDS.iter().any(|w| tokens.contains(*w)) {
        return -1;
    }
    if AFFIRMATIVE_WORDS.iter().any(|w| tokens.contains(*w)) {
        return 1;
    }
    0
}

/// Content tokens with sentiment words removed.
fn topic_tokens(text: &str) -> std::collections::BTreeSet<String> {
    let mut tokens = normalize_tokens(text);
    for w in AFFIRMATIVE_WORDS.iter().chain(NEGATING_WORDS) {
        tokens.remove(*w);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Finding;
    use pretty_assertions::assert_eq;

    fn output(mode_id: &str) -> ModeOutput {
        let mut o = ModeOutput::new(mode_id, "thesis");
        o.confidence = 0.8;
        o
    }

    #[test]
    fn test_classify_action() {
        assert_eq!(classify_action("Add a regression test for retries"), ActionType::AddTest);
        assert_eq!(classify_action("Refactor the session module"), ActionType::Refactor);
        assert_eq!(classify_action("Document the wire format"), ActionType::Document);
        assert_eq!(classify_action("Fix the off-by-one in paging"), ActionType::Fix);
        assert_eq!(classify_action("Add idempotency keys"), ActionType::AddFeature);
        assert_eq!(classify_action("Remove the legacy endpoint"), ActionType::Remove);
        assert_eq!(classify_action("Update tokio to 1.43"), ActionType::Update);
        assert_eq!(classify_action("Sanitize user input"), ActionType::Security);
        assert_eq!(classify_action("Cache the catalog lookup"), ActionType::Optimize);
        assert_eq!(classify_action("Consider the trade-offs"), ActionType::Other);
    }

    #[test]
    fn test_findings_group_by_evidence_and_merge_duplicates() {
        let mut a = output("deductive");
        a.top_findings.push(
            Finding::new("retry loop lacks backoff")
                .with_evidence("src/retry.rs:10")
                .with_confidence(0.6),
        );
        let mut b = output("abductive");
        b.top_findings.push(
            Finding::new("Retry loop lacks backoff")
                .with_evidence("src/retry.rs:10")
                .with_confidence(0.9),
        );
        b.top_findings.push(
            Finding::new("missing jitter")
                .with_evidence("src/retry.rs:40")
                .with_confidence(0.5),
        );

        let merged = MergeEngine::default().merge(&[a, b]);
        assert_eq!(merged.findings_by_evidence.len(), 2);
        let first = &merged.findings_by_evidence[0];
        assert_eq!(first.pointer, "src/retry.rs:10");
        assert_eq!(first.findings.len(), 1);
        assert_eq!(first.findings[0].modes, vec!["abductive", "deductive"]);
        assert_eq!(first.findings[0].confidence, 0.9);
    }

    #[test]
    fn test_risks_grouped_in_severity_order() {
        let mut a = output("deductive");
        a.risks.push(Risk {
            text: "minor slowdown".into(),
            likelihood: 0.2,
            impact: Some(Impact::Low),
            mitigation: None,
        });
        let mut b = output("abductive");
        b.risks.push(Risk {
            text: "data loss".into(),
            likelihood: 0.4,
            impact: Some(Impact::Critical),
            mitigation: None,
        });

        let merged = MergeEngine::default().merge(&[a, b]);
        let impacts: Vec<Option<Impact>> =
            merged.risks_by_severity.iter().map(|g| g.impact).collect();
        assert_eq!(impacts, vec![Some(Impact::Critical), Some(Impact::Low)]);
    }

    #[test]
    fn test_severity_conflict_detected() {
        let mut a = output("deductive");
        a.risks.push(Risk {
            text: "duplicate invoices on retry".into(),
            likelihood: 0.5,
            impact: Some(Impact::Critical),
            mitigation: None,
        });
        let mut b = output("abductive");
        b.risks.push(Risk {
            text: "duplicate invoices on retry".into(),
            likelihood: 0.5,
            impact: Some(Impact::Low),
            mitigation: None,
        });

        let merged = MergeEngine::default().merge(&[a, b]);
        let severity: Vec<&Conflict> = merged
            .conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Severity)
            .collect();
        assert_eq!(severity.len(), 1);
        assert_eq!(severity[0].modes, vec!["abductive", "deductive"]);
    }

    #[test]
    fn test_thesis_conflict_detected() {
        let mut a = output("deductive");
        a.thesis = "the migration plan is safe and should proceed".into();
        let mut b = output("adversarial");
        b.thesis = "the migration plan is broken and fails under load".into();

        let merged = MergeEngine::default().merge(&[a, b]);
        assert!(merged
            .conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::Thesis));
    }

    #[test]
    fn test_recommendation_conflict_detected() {
        let mut a = output("means-end");
        a.recommendations.push(Recommendation {
            text: "Add the feature flag for dark launch".into(),
            priority: Some(Impact::Medium),
            rationale: None,
            effort: None,
        });
        let mut b = output("adversarial");
        b.recommendations.push(Recommendation {
            text: "Remove the feature flag for dark launch".into(),
            priority: Some(Impact::Medium),
            rationale: None,
            effort: None,
        });

        let merged = MergeEngine::default().merge(&[a, b]);
        let rec_conflicts: Vec<&Conflict> = merged
            .conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Recommendation)
            .collect();
        assert_eq!(rec_conflicts.len(), 1);
        assert!(rec_conflicts[0].topic.contains("flag"));
    }

    #[test]
    fn test_agreeing_outputs_have_no_conflicts() {
        let mut a = output("deductive");
        a.thesis = "the cache layer should be kept".into();
        let mut b = output("abductive");
        b.thesis = "the cache layer should be kept".into();

        let merged = MergeEngine::default().merge(&[a, b]);
        assert!(merged.conflicts.is_empty());
    }
}
