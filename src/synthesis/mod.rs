//! Synthesis: combining mode outputs into one final answer.
//!
//! Strategies live in a process-wide immutable table. Mechanical
//! strategies produce the result directly from the merge engines;
//! agent-backed strategies produce a prompt for a designated synthesizer
//! mode, and the caller feeds the agent's reply back through
//! [`parse_synthesis_output`].

mod engine;
mod parse;
mod prompt;

pub use engine::{
    ChunkKind, SynthesisChunk, SynthesisEngine, SynthesisOutcome, SynthesisStream,
};
pub use parse::parse_synthesis_output;
pub use prompt::build_synthesis_prompt;

use crate::audit::AuditReport;
use crate::error::{Error, Result};
use crate::preset::SynthesisConfig;
use crate::schema::{Impact, ModeOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static description of one synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    /// Whether a synthesizer agent must be dispatched
    pub requires_agent: bool,
    /// Mode the synthesizer agent runs in, when one is required
    pub synth_mode: Option<&'static str>,
    /// Key of the prompt template the renderer uses
    pub prompt_template: &'static str,
}

/// The closed strategy table.
pub const STRATEGIES: &[StrategyInfo] = &[
    StrategyInfo {
        name: "manual",
        display_name: "Manual Merge",
        requires_agent: false,
        synth_mode: None,
        prompt_template: "synthesis/manual",
    },
    StrategyInfo {
        name: "adversarial",
        display_name: "Adversarial Review",
        requires_agent: true,
        synth_mode: Some("adversarial"),
        prompt_template: "synthesis/adversarial",
    },
    StrategyInfo {
        name: "consensus",
        display_name: "Consensus",
        requires_agent: false,
        synth_mode: None,
        prompt_template: "synthesis/consensus",
    },
    StrategyInfo {
        name: "creative",
        display_name: "Creative Recombination",
        requires_agent: true,
        synth_mode: Some("analogical"),
        prompt_template: "synthesis/creative",
    },
    StrategyInfo {
        name: "analytical",
        display_name: "Analytical Ranking",
        requires_agent: false,
        synth_mode: None,
        prompt_template: "synthesis/analytical",
    },
    StrategyInfo {
        name: "deliberative",
        display_name: "Deliberative Weighing",
        requires_agent: true,
        synth_mode: Some("decision-theoretic"),
        prompt_template: "synthesis/deliberative",
    },
    StrategyInfo {
        name: "prioritized",
        display_name: "Prioritized Merge",
        requires_agent: false,
        synth_mode: None,
        prompt_template: "synthesis/prioritized",
    },
    StrategyInfo {
        name: "dialectical",
        display_name: "Dialectical Synthesis",
        requires_agent: true,
        synth_mode: Some("dialectical"),
        prompt_template: "synthesis/dialectical",
    },
    StrategyInfo {
        name: "meta-reasoning",
        display_name: "Meta-Reasoning Audit",
        requires_agent: true,
        synth_mode: Some("meta-cognitive"),
        prompt_template: "synthesis/meta-reasoning",
    },
    StrategyInfo {
        name: "voting",
        display_name: "Majority Voting",
        requires_agent: false,
        synth_mode: None,
        prompt_template: "synthesis/voting",
    },
    StrategyInfo {
        name: "argumentation-graph",
        display_name: "Argumentation Graph",
        requires_agent: true,
        synth_mode: Some("dialectical"),
        prompt_template: "synthesis/argumentation-graph",
    },
];

/// Renamed strategies accepted for compatibility.
const DEPRECATED_NAMES: &[(&str, &str)] = &[
    ("debate", "dialectical"),
    ("merge", "consensus"),
    ("rank", "prioritized"),
];

/// A resolved strategy, flagging deprecated aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStrategy {
    pub info: &'static StrategyInfo,
    pub deprecated: bool,
}

/// Resolve a strategy name, migrating deprecated aliases.
pub fn resolve_strategy(name: &str) -> Result<ResolvedStrategy> {
    let normalized = name.trim().to_lowercase();
    let (effective, deprecated) = match DEPRECATED_NAMES
        .iter()
        .find(|(old, _)| *old == normalized)
    {
        Some((_, new)) => (*new, true),
        None => (normalized.as_str(), false),
    };

    STRATEGIES
        .iter()
        .find(|s| s.name == effective)
        .map(|info| ResolvedStrategy { info, deprecated })
        .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
}

/// Input to a synthesis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisInput {
    pub question: String,
    pub outputs: Vec<ModeOutput>,
    pub strategy: String,
    pub config: SynthesisConfig,
}

/// A scored finding in the combined answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFinding {
    pub text: String,
    /// Filled by the mechanical scorer; synthesizer agents may omit it
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Agreeing modes, sorted
    #[serde(default)]
    pub modes: Vec<String>,
}

/// A scored risk in the combined answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRisk {
    pub text: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub likelihood: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
    #[serde(default)]
    pub mode_id: String,
}

/// A prioritized recommendation in the combined answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub text: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Impact>,
    #[serde(default)]
    pub mode_id: String,
}

/// Per-mode contribution accounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeContribution {
    pub findings: usize,
    pub risks: usize,
    pub recommendations: usize,
    /// Clusters this mode contributed to
    pub dedup_survivals: usize,
    /// Clusters only this mode produced
    pub unique_insights: usize,
}

/// The combined answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    /// Consolidated thesis
    pub summary: String,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub top_findings: Vec<RankedFinding>,
    #[serde(default)]
    pub risks: Vec<RankedRisk>,
    #[serde(default)]
    pub recommendations: Vec<RankedRecommendation>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    /// Mean of the input output confidences unless the synthesizer says
    /// otherwise
    #[serde(default)]
    pub overall_confidence: f64,
    #[serde(default)]
    pub contributions: BTreeMap<String, ModeContribution>,
    #[serde(default)]
    pub audit: AuditReport,
}

/// A prompt produced for an agent-backed strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisPrompt {
    pub strategy: String,
    /// Mode the synthesizer agent should run in
    pub synth_mode: String,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strategy_table_is_closed() {
        assert_eq!(STRATEGIES.len(), 11);
        for s in STRATEGIES {
            assert_eq!(s.requires_agent, s.synth_mode.is_some());
        }
    }

    #[test]
    fn test_resolve_known_strategy() {
        let resolved = resolve_strategy("consensus").unwrap();
        assert_eq!(resolved.info.name, "consensus");
        assert!(!resolved.deprecated);
        assert!(!resolved.info.requires_agent);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolved = resolve_strategy("  Dialectical ").unwrap();
        assert_eq!(resolved.info.name, "dialectical");
    }

    #[test]
    fn test_deprecated_alias_migrates_with_flag() {
        let resolved = resolve_strategy("debate").unwrap();
        assert_eq!(resolved.info.name, "dialectical");
        assert!(resolved.deprecated);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = resolve_strategy("vibes").unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy(_)));
    }
}
