//! Structured output schema (v1) for mode results.
//!
//! Agents answer with a YAML document inside a fenced block; this module
//! holds the typed form, the normalizer, and the validator.

pub mod confidence;
mod validate;

pub use validate::{normalize_output, validate_output, FieldError};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version string embedded in preambles so future schema migrations can
/// detect which contract an agent was given.
pub const SCHEMA_VERSION: &str = "v1";

/// Impact / priority levels. Closed set, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

impl Impact {
    /// Severity rank: critical=0 .. low=3.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Scoring weight for merge ranking.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.8,
            Self::Medium => 0.5,
            Self::Low => 0.3,
        }
    }

    /// All levels in severity order.
    pub const ALL: [Impact; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];
}

/// Weight of an optional impact; absent levels score between low and medium.
pub fn impact_weight(impact: Option<Impact>) -> f64 {
    impact.map(|i| i.weight()).unwrap_or(0.4)
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Impact {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(Error::config(format!("unknown impact level: {}", other))),
        }
    }
}

/// A single finding: one concrete observation with optional evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub text: String,
    /// Evidence pointer of the form `path` or `path:line`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, deserialize_with = "confidence::flexible")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Finding {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            evidence: None,
            confidence: 0.0,
            impact: None,
            tags: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = Some(impact);
        self
    }
}

/// A risk surfaced by a mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub text: String,
    #[serde(default, deserialize_with = "confidence::flexible")]
    pub likelihood: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

/// A recommended action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Impact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
}

/// A mode's structured answer. Schema v1.
///
/// Mandatory: `mode_id`, a non-empty `thesis`, at least one finding, and a
/// confidence in [0,1]. Everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOutput {
    pub mode_id: String,
    pub thesis: String,
    #[serde(default)]
    pub top_findings: Vec<Finding>,
    #[serde(default, deserialize_with = "confidence::flexible")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<Risk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions_for_user: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_modes_to_watch: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl ModeOutput {
    /// Minimal well-formed output, useful as a construction seed.
    pub fn new(mode_id: impl Into<String>, thesis: impl Into<String>) -> Self {
        Self {
            mode_id: mode_id.into(),
            thesis: thesis.into(),
            top_findings: Vec::new(),
            confidence: 0.0,
            risks: Vec::new(),
            recommendations: Vec::new(),
            questions_for_user: Vec::new(),
            failure_modes_to_watch: Vec::new(),
            raw_output: None,
            generated_at: None,
        }
    }
}

/// Parse a textual document into a normalized `ModeOutput` plus field-level
/// validation errors.
///
/// Parsing is YAML-first with a JSON fallback. A parse failure is fatal;
/// field-level problems are returned alongside the partial output so the
/// collector can apply its own acceptance policy.
pub fn parse_mode_output(text: &str) -> Result<(ModeOutput, Vec<FieldError>)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("unknown", "empty output document"));
    }

    let mut output: ModeOutput = match serde_yaml::from_str(trimmed) {
        Ok(o) => o,
        Err(yaml_err) => match serde_json::from_str(trimmed) {
            Ok(o) => o,
            Err(_) => return Err(Error::Yaml(yaml_err)),
        },
    };

    normalize_output(&mut output);
    let errors = validate_output(&output);
    Ok((output, errors))
}
