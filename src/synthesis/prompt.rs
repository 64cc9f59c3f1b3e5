//! Prompt construction for agent-backed synthesis strategies.

use super::{StrategyInfo, SynthesisInput};
use crate::audit::AuditReport;
use crate::schema::SCHEMA_VERSION;

fn strategy_goal(info: &StrategyInfo) -> &'static str {
    match info.name {
        "adversarial" => {
            "Attack the combined picture: keep only claims that survive your strongest objections, \
             and say explicitly which claims you rejected and why."
        }
        "creative" => {
            "Look for a framing none of the modes produced on its own: recombine their findings \
             into at least one novel option before settling on the answer."
        }
        "deliberative" => {
            "Weigh the options like a decision problem: make trade-offs, likelihoods, and the cost \
             of being wrong explicit before recommending."
        }
        "dialectical" => {
            "Treat the modes as thesis and antithesis: state the strongest version of each side of \
             every conflict, then synthesize a position that preserves what survives."
        }
        "meta-reasoning" => {
            "Audit the modes' reasoning itself: where are they correlated, what did all of them \
             miss, and how should that shift confidence in the combined answer?"
        }
        "argumentation-graph" => {
            "Build an explicit argument graph: list claims, support edges, and attack edges, then \
             derive the answer from the claims left standing."
        }
        _ => "Combine the mode outputs into one coherent answer, resolving conflicts explicitly.",
    }
}

/// Render the prompt handed to the synthesizer agent.
///
/// Contains the question, every mode output as a YAML document, the
/// strategy goal, the audit's conflict list, and the output contract.
pub fn build_synthesis_prompt(
    info: &StrategyInfo,
    input: &SynthesisInput,
    audit: &AuditReport,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## SYNTHESIS TASK\n\n");
    prompt.push_str(&format!(
        "Strategy: {} ({})\n\n",
        info.display_name, info.name
    ));
    prompt.push_str(&format!("Question:\n{}\n\n", input.question));

    prompt.push_str("## STRATEGY GOAL\n\n");
    prompt.push_str(strategy_goal(info));
    prompt.push_str("\n\n");

    prompt.push_str("## MODE OUTPUTS\n\n");
    for output in &input.outputs {
        prompt.push_str(&format!("### {}\n\n```yaml\n", output.mode_id));
        prompt.push_str(&serde_yaml::to_string(output).unwrap_or_default());
        prompt.push_str("```\n\n");
    }

    prompt.push_str("## DETECTED CONFLICTS\n\n");
    prompt.push_str(&audit.summary());
    prompt.push('\n');
    if !audit.resolution_suggestions.is_empty() {
        prompt.push_str("\nSuggested resolutions:\n");
        for s in &audit.resolution_suggestions {
            prompt.push_str(&format!("- {}\n", s));
        }
    }
    prompt.push('\n');

    prompt.push_str("## OUTPUT CONTRACT\n\n");
    prompt.push_str(&format!(
        "Reply with exactly one fenced ```json or ```yaml block containing a schema {} synthesis \
         document with these fields:\n\
         - summary: string, the consolidated thesis (required)\n\
         - top_findings: list of {{text, confidence, impact, evidence, modes}}\n\
         - risks: list of {{text, likelihood, impact, mode_id}}\n\
         - recommendations: list of {{text, priority, mode_id}}\n\
         - open_questions: list of strings\n\
         - overall_confidence: number in [0, 1]\n\
         Every conflict listed above must be resolved or carried into open_questions.\n",
        SCHEMA_VERSION
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::build_audit;
    use crate::merge::MergeEngine;
    use crate::preset::SynthesisConfig;
    use crate::schema::{Impact, ModeOutput, Risk};
    use crate::synthesis::resolve_strategy;

    #[test]
    fn test_prompt_contains_question_outputs_and_conflicts() {
        let mut a = ModeOutput::new("deductive", "retries are unsafe");
        a.confidence = 0.8;
        a.risks.push(Risk {
            text: "duplicate invoices on retry".into(),
            likelihood: 0.5,
            impact: Some(Impact::Critical),
            mitigation: None,
        });
        let mut b = ModeOutput::new("abductive", "retries look fine");
        b.confidence = 0.6;
        b.risks.push(Risk {
            text: "duplicate invoices on retry".into(),
            likelihood: 0.5,
            impact: Some(Impact::Low),
            mitigation: None,
        });

        let input = SynthesisInput {
            question: "Are our payment retries safe?".into(),
            outputs: vec![a, b],
            strategy: "dialectical".into(),
            config: SynthesisConfig::default(),
        };
        let merged = MergeEngine::default().merge(&input.outputs);
        let audit = build_audit(&merged);
        let info = resolve_strategy("dialectical").unwrap().info;

        let prompt = build_synthesis_prompt(info, &input, &audit);
        assert!(prompt.contains("Are our payment retries safe?"));
        assert!(prompt.contains("### deductive"));
        assert!(prompt.contains("### abductive"));
        // The conflict topic must reach the synthesizer.
        assert!(prompt.contains("duplicate invoices on retry"));
        assert!(prompt.contains("OUTPUT CONTRACT"));
    }
}
