//! The synthesis engine: mechanical combination and streaming progress.

use super::{
    resolve_strategy, ModeContribution, RankedFinding, RankedRecommendation, RankedRisk,
    StrategyInfo, SynthesisInput, SynthesisPrompt, SynthesisResult,
};
use crate::audit::{build_audit, AuditReport};
use crate::error::{Error, Result};
use crate::merge::{DedupeEngine, DedupeResult, MergeEngine};
use crate::schema::impact_weight;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// What a synthesis pass produced: a finished result, or a prompt the
/// caller must dispatch to a synthesizer agent.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisOutcome {
    Completed(SynthesisResult),
    AgentPrompt(SynthesisPrompt),
}

/// Kind of a streaming chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Status,
    Progress,
    Complete,
}

/// One chunk of streaming synthesis progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisChunk {
    /// Monotonically increasing, starting at 1
    pub index: u64,
    pub kind: ChunkKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Present on the final `complete` chunk only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SynthesisResult>,
}

/// Receiving ends of a streaming synthesis: a bounded chunk channel and a
/// separate error channel, both closed by the producer.
pub struct SynthesisStream {
    pub chunks: mpsc::Receiver<SynthesisChunk>,
    pub errors: mpsc::Receiver<Error>,
}

/// Drives synthesis over the merge engines.
#[derive(Debug, Clone, Default)]
pub struct SynthesisEngine {
    pub dedupe: DedupeEngine,
    pub merge: MergeEngine,
}

impl SynthesisEngine {
    pub fn new(dedupe: DedupeEngine, merge: MergeEngine) -> Self {
        Self { dedupe, merge }
    }

    /// Run one synthesis pass.
    ///
    /// Mechanical strategies return a finished result. Agent-backed
    /// strategies return the prompt to dispatch; feed the agent's reply to
    /// [`super::parse_synthesis_output`].
    #[instrument(skip(self, input), fields(strategy = %input.strategy, outputs = input.outputs.len()))]
    pub fn synthesize(&self, input: &SynthesisInput) -> Result<SynthesisOutcome> {
        let resolved = resolve_strategy(&input.strategy)?;
        if resolved.deprecated {
            warn!(
                requested = %input.strategy,
                effective = resolved.info.name,
                "deprecated synthesis strategy name"
            );
        }

        if input.outputs.is_empty() {
            return Err(Error::synthesis("no outputs to synthesize"));
        }

        if resolved.info.requires_agent {
            let merged = self.merge.merge(&input.outputs);
            let audit = build_audit(&merged);
            let synth_mode = input
                .config
                .synthesizer_mode
                .clone()
                .or_else(|| resolved.info.synth_mode.map(str::to_string))
                .unwrap_or_else(|| "dialectical".to_string());
            let prompt = super::build_synthesis_prompt(resolved.info, input, &audit);
            return Ok(SynthesisOutcome::AgentPrompt(SynthesisPrompt {
                strategy: resolved.info.name.to_string(),
                synth_mode,
                prompt,
            }));
        }

        Ok(SynthesisOutcome::Completed(self.mechanical(resolved.info, input)))
    }

    /// Mechanical combination via the dedupe and merge engines.
    fn mechanical(&self, info: &StrategyInfo, input: &SynthesisInput) -> SynthesisResult {
        let merged = self.merge.merge(&input.outputs);
        let audit = build_audit(&merged);
        let deduped = self.dedupe.cluster(&input.outputs);
        self.package(info, input, &deduped, audit)
    }

    fn package(
        &self,
        info: &StrategyInfo,
        input: &SynthesisInput,
        deduped: &DedupeResult,
        audit: AuditReport,
    ) -> SynthesisResult {
        let confidence_by_mode: BTreeMap<&str, f64> = input
            .outputs
            .iter()
            .map(|o| (o.mode_id.as_str(), o.confidence))
            .collect();

        let mut findings: Vec<RankedFinding> = deduped
            .clusters
            .iter()
            .filter(|c| {
                // Majority voting drops single-mode clusters when more than
                // one mode reported.
                info.name != "voting"
                    || input.outputs.len() < 2
                    || c.modes.len() >= 2
            })
            .filter(|c| c.canonical.confidence >= input.config.min_confidence)
            .map(|cluster| {
                let canonical_mode = cluster
                    .members
                    .iter()
                    .find(|m| m.finding == cluster.canonical)
                    .map(|m| m.mode_id.as_str())
                    .unwrap_or_default();
                let output_confidence =
                    confidence_by_mode.get(canonical_mode).copied().unwrap_or(0.5);
                let base = impact_weight(cluster.canonical.impact)
                    * cluster.canonical.confidence
                    * output_confidence;
                let agreement = 1.1f64.powi(cluster.modes.len().saturating_sub(1) as i32);
                RankedFinding {
                    text: cluster.canonical.text.clone(),
                    score: base * agreement,
                    confidence: cluster.canonical.confidence,
                    impact: cluster.canonical.impact,
                    evidence: cluster.canonical.evidence.clone(),
                    modes: cluster.modes.clone(),
                }
            })
            .collect();

        match info.name {
            "prioritized" => findings.sort_by(|a, b| {
                impact_weight(b.impact)
                    .partial_cmp(&impact_weight(a.impact))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        b.score
                            .partial_cmp(&a.score)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| a.text.cmp(&b.text))
            }),
            _ => findings.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.text.cmp(&b.text))
            }),
        }
        findings.truncate(input.config.max_findings);

        let mut risks: Vec<RankedRisk> = input
            .outputs
            .iter()
            .flat_map(|o| {
                o.risks.iter().map(|r| RankedRisk {
                    text: r.text.clone(),
                    score: impact_weight(r.impact) * r.likelihood,
                    likelihood: r.likelihood,
                    impact: r.impact,
                    mode_id: o.mode_id.clone(),
                })
            })
            .collect();
        risks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });

        let mut recommendations: Vec<RankedRecommendation> = input
            .outputs
            .iter()
            .flat_map(|o| {
                o.recommendations.iter().map(|r| RankedRecommendation {
                    text: r.text.clone(),
                    score: impact_weight(r.priority),
                    priority: r.priority,
                    mode_id: o.mode_id.clone(),
                })
            })
            .collect();
        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });

        let mut open_questions: Vec<String> = input
            .outputs
            .iter()
            .flat_map(|o| o.questions_for_user.iter().cloned())
            .collect();
        open_questions.sort();
        open_questions.dedup();

        let overall_confidence = input
            .outputs
            .iter()
            .map(|o| o.confidence)
            .sum::<f64>()
            / input.outputs.len() as f64;

        let mut contributions: BTreeMap<String, ModeContribution> = BTreeMap::new();
        for output in &input.outputs {
            let entry = contributions.entry(output.mode_id.clone()).or_default();
            entry.findings = output.top_findings.len();
            entry.risks = output.risks.len();
            entry.recommendations = output.recommendations.len();
        }
        for cluster in &deduped.clusters {
            for mode in &cluster.modes {
                let entry = contributions.entry(mode.clone()).or_default();
                entry.dedup_survivals += 1;
                if cluster.modes.len() == 1 {
                    entry.unique_insights += 1;
                }
            }
        }

        let lead = input
            .outputs
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|o| o.thesis.clone())
            .unwrap_or_default();
        let summary = format!(
            "{} ({} modes, {} distinct findings, {} conflict(s))",
            lead,
            input.outputs.len(),
            deduped.stats.cluster_count,
            audit.conflicts.len()
        );

        SynthesisResult {
            summary,
            strategy: info.name.to_string(),
            top_findings: findings,
            risks,
            recommendations,
            open_questions,
            overall_confidence,
            contributions,
            audit,
        }
    }

    /// Stream synthesis progress over a bounded channel.
    ///
    /// Emits a `status` chunk, then progress chunks, then exactly one
    /// `complete` chunk carrying the result. On cancellation no further
    /// chunks appear and the error channel delivers a cancelled error.
    /// Agent-backed strategies fall back to the mechanical path here; the
    /// streaming surface never blocks on an external agent.
    pub fn stream_synthesize(
        &self,
        cancel: CancellationToken,
        input: SynthesisInput,
    ) -> SynthesisStream {
        let (chunk_tx, chunk_rx) = mpsc::channel::<SynthesisChunk>(16);
        let (err_tx, err_rx) = mpsc::channel::<Error>(1);
        let engine = self.clone();

        tokio::spawn(async move {
            let mut index = 0u64;
            let mut emit = |kind: ChunkKind, content: String, result: Option<SynthesisResult>| {
                index += 1;
                SynthesisChunk {
                    index,
                    kind,
                    content,
                    timestamp: Utc::now(),
                    result,
                }
            };

            macro_rules! send_or_return {
                ($chunk:expr) => {
                    if cancel.is_cancelled() {
                        let _ = err_tx.send(Error::cancelled("synthesis cancelled")).await;
                        return;
                    }
                    if chunk_tx.send($chunk).await.is_err() {
                        return;
                    }
                };
            }

            send_or_return!(emit(ChunkKind::Status, "analyzing outputs".to_string(), None));

            let resolved = match resolve_strategy(&input.strategy) {
                Ok(r) => r,
                Err(e) => {
                    let _ = err_tx.send(e).await;
                    return;
                }
            };
            if input.outputs.is_empty() {
                let _ = err_tx
                    .send(Error::synthesis("no outputs to synthesize"))
                    .await;
                return;
            }

            let info = if resolved.info.requires_agent {
                let fallback = resolve_strategy("consensus").map(|r| r.info);
                let Ok(fallback) = fallback else {
                    let _ = err_tx
                        .send(Error::synthesis("consensus fallback missing"))
                        .await;
                    return;
                };
                send_or_return!(emit(
                    ChunkKind::Progress,
                    format!(
                        "strategy {} needs a synthesizer agent; streaming the mechanical merge",
                        resolved.info.name
                    ),
                    None,
                ));
                fallback
            } else {
                resolved.info
            };

            let deduped = engine.dedupe.cluster(&input.outputs);
            send_or_return!(emit(
                ChunkKind::Progress,
                format!(
                    "clustered {} findings into {} groups",
                    deduped.stats.total_findings, deduped.stats.cluster_count
                ),
                None,
            ));

            let merged = engine.merge.merge(&input.outputs);
            let audit = build_audit(&merged);
            send_or_return!(emit(
                ChunkKind::Progress,
                format!("audit found {} conflict(s)", audit.conflicts.len()),
                None,
            ));

            let result = engine.package(info, &input, &deduped, audit);
            debug!(
                findings = result.top_findings.len(),
                confidence = result.overall_confidence,
                "streaming synthesis complete"
            );
            let summary = result.summary.clone();
            send_or_return!(emit(ChunkKind::Complete, summary, Some(result)));
        });

        SynthesisStream {
            chunks: chunk_rx,
            errors: err_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::SynthesisConfig;
    use crate::schema::{Finding, Impact, ModeOutput};
    use pretty_assertions::assert_eq;

    fn output(mode_id: &str, confidence: f64, findings: Vec<Finding>) -> ModeOutput {
        let mut o = ModeOutput::new(mode_id, format!("{} thesis", mode_id));
        o.confidence = confidence;
        o.top_findings = findings;
        o
    }

    fn input(strategy: &str, outputs: Vec<ModeOutput>) -> SynthesisInput {
        SynthesisInput {
            question: "what breaks first?".into(),
            outputs,
            strategy: strategy.into(),
            config: SynthesisConfig::default(),
        }
    }

    #[test]
    fn test_mechanical_synthesis_scores_agreement() {
        let outputs = vec![
            output(
                "deductive",
                0.8,
                vec![Finding::new("queue grows unbounded")
                    .with_confidence(0.9)
                    .with_impact(Impact::High)],
            ),
            output(
                "abductive",
                0.6,
                vec![
                    Finding::new("queue grows unbounded")
                        .with_confidence(0.5)
                        .with_impact(Impact::High),
                    Finding::new("logging is noisy")
                        .with_confidence(0.9)
                        .with_impact(Impact::Low),
                ],
            ),
        ];
        let engine = SynthesisEngine::default();
        let outcome = engine.synthesize(&input("consensus", outputs)).unwrap();
        let SynthesisOutcome::Completed(result) = outcome else {
            panic!("expected completed result");
        };

        // Shared finding: 0.8 * 0.9 * 0.8 * 1.1 = 0.634; solo finding:
        // 0.3 * 0.9 * 0.6 = 0.162.
        assert_eq!(result.top_findings[0].text, "queue grows unbounded");
        assert_eq!(result.top_findings[0].modes, vec!["abductive", "deductive"]);
        assert!((result.top_findings[0].score - 0.6336).abs() < 1e-4);
        assert!((result.overall_confidence - 0.7).abs() < 1e-9);

        let deductive = &result.contributions["deductive"];
        assert_eq!(deductive.findings, 1);
        assert_eq!(deductive.dedup_survivals, 1);
        assert_eq!(deductive.unique_insights, 0);
        let abductive = &result.contributions["abductive"];
        assert_eq!(abductive.unique_insights, 1);
    }

    #[test]
    fn test_voting_drops_single_mode_findings() {
        let outputs = vec![
            output(
                "deductive",
                0.8,
                vec![
                    Finding::new("shared finding").with_confidence(0.8),
                    Finding::new("solo deductive claim").with_confidence(0.9),
                ],
            ),
            output(
                "abductive",
                0.8,
                vec![Finding::new("shared finding").with_confidence(0.7)],
            ),
        ];
        let engine = SynthesisEngine::default();
        let SynthesisOutcome::Completed(result) =
            engine.synthesize(&input("voting", outputs)).unwrap()
        else {
            panic!("expected completed result");
        };
        assert_eq!(result.top_findings.len(), 1);
        assert_eq!(result.top_findings[0].text, "shared finding");
    }

    #[test]
    fn test_agent_strategy_returns_prompt() {
        let outputs = vec![output(
            "deductive",
            0.8,
            vec![Finding::new("f").with_confidence(0.5)],
        )];
        let engine = SynthesisEngine::default();
        let outcome = engine.synthesize(&input("dialectical", outputs)).unwrap();
        let SynthesisOutcome::AgentPrompt(prompt) = outcome else {
            panic!("expected agent prompt");
        };
        assert_eq!(prompt.strategy, "dialectical");
        assert_eq!(prompt.synth_mode, "dialectical");
        assert!(prompt.prompt.contains("what breaks first?"));
    }

    #[test]
    fn test_no_outputs_is_an_error() {
        let engine = SynthesisEngine::default();
        assert!(engine.synthesize(&input("consensus", vec![])).is_err());
    }

    #[tokio::test]
    async fn test_stream_chunk_ordering() {
        let outputs = vec![output(
            "deductive",
            0.8,
            vec![Finding::new("f").with_confidence(0.5)],
        )];
        let engine = SynthesisEngine::default();
        let mut stream =
            engine.stream_synthesize(CancellationToken::new(), input("consensus", outputs));

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.chunks.recv().await {
            chunks.push(chunk);
        }

        let indices: Vec<u64> = chunks.iter().map(|c| c.index).collect();
        let expected: Vec<u64> = (1..=chunks.len() as u64).collect();
        assert_eq!(indices, expected);
        assert_eq!(chunks[0].kind, ChunkKind::Status);
        assert_eq!(chunks[0].content, "analyzing outputs");
        let completes: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Complete).collect();
        assert_eq!(completes.len(), 1);
        assert_eq!(chunks.last().unwrap().kind, ChunkKind::Complete);
        assert!(chunks.last().unwrap().result.is_some());
        assert!(stream.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_cancellation() {
        let outputs = vec![output(
            "deductive",
            0.8,
            vec![Finding::new("f").with_confidence(0.5)],
        )];
        let engine = SynthesisEngine::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut stream = engine.stream_synthesize(cancel, input("consensus", outputs));

        let mut saw_complete = false;
        while let Some(chunk) = stream.chunks.recv().await {
            saw_complete |= chunk.kind == ChunkKind::Complete;
        }
        assert!(!saw_complete);
        let err = stream.errors.recv().await.unwrap();
        assert!(err.is_cancelled());
    }
}
