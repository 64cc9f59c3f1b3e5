//! Property-based tests for cross-cutting invariants.
//!
//! These pin the determinism and ordering guarantees the engine promises:
//!
//! - Assignment plans are permutation-invariant in their inputs
//! - No plan reuses a pane or repeats a mode
//! - Cluster ids are content-stable and emitted in sorted order
//! - Confidence normalization is idempotent
//! - Budget counters reconcile with their config

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::budget::{BudgetConfig, BudgetTracker};
    use crate::merge::DedupeEngine;
    use crate::plan::{plan_round_robin, AgentType, Pane};
    use crate::schema::{normalize_output, Finding, ModeOutput};
    use std::collections::HashSet;

    fn mode_id() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("deductive".to_string()),
            Just("abductive".to_string()),
            Just("inductive".to_string()),
            Just("bayesian".to_string()),
            Just("adversarial".to_string()),
            Just("dialectical".to_string()),
            Just("counterfactual".to_string()),
            Just("meta-cognitive".to_string()),
        ]
    }

    fn agent_type() -> impl Strategy<Value = AgentType> {
        prop_oneof![
            Just(AgentType::Claude),
            Just(AgentType::Codex),
            Just(AgentType::Gemini),
        ]
    }

    prop_compose! {
        fn pane()(
            index in 1i32..50,
            ntm_index in 0i32..50,
            agent_type in agent_type(),
        ) -> Pane {
            Pane {
                id: format!("%{}", index),
                title: format!("pane-{}", index),
                agent_type,
                index,
                ntm_index,
            }
        }
    }

    fn panes() -> impl Strategy<Value = Vec<Pane>> {
        prop::collection::vec(pane(), 0..10).prop_map(|mut panes| {
            // Titles must be unique for a pane list to be meaningful.
            panes.sort_by_key(|p| p.title.clone());
            panes.dedup_by(|a, b| a.title == b.title);
            panes
        })
    }

    fn modes() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(mode_id(), 0..8)
    }

    proptest! {
        /// Reordering modes or panes never changes the round-robin plan.
        #[test]
        fn round_robin_is_permutation_invariant(modes in modes(), panes in panes()) {
            let mut rev_modes = modes.clone();
            rev_modes.reverse();
            let mut rev_panes = panes.clone();
            rev_panes.reverse();

            let forward = plan_round_robin(&modes, &panes);
            let backward = plan_round_robin(&rev_modes, &rev_panes);

            match (forward, backward) {
                (Ok(a), Ok(b)) => {
                    let strip = |plan: &[crate::session::ModeAssignment]| {
                        plan.iter()
                            .map(|x| (x.mode_id.clone(), x.pane_name.clone(), x.agent_type))
                            .collect::<Vec<_>>()
                    };
                    prop_assert_eq!(strip(&a), strip(&b));
                }
                (Err(_), Err(_)) => {}
                (a, b) => {
                    return Err(TestCaseError::fail(format!(
                        "one ordering planned, the other failed: {:?} vs {:?}", a.is_ok(), b.is_ok()
                    )));
                }
            }
        }

        /// A successful plan never reuses a pane or repeats a mode, and all
        /// assignments share one timestamp.
        #[test]
        fn plans_have_exclusive_panes_and_modes(modes in modes(), panes in panes()) {
            if let Ok(plan) = plan_round_robin(&modes, &panes) {
                let mut seen_panes = HashSet::new();
                let mut seen_modes = HashSet::new();
                for a in &plan {
                    prop_assert!(seen_panes.insert(a.pane_name.clone()));
                    prop_assert!(seen_modes.insert(a.mode_id.clone()));
                    prop_assert_eq!(a.assigned_at, plan[0].assigned_at);
                }
            }
        }

        /// Same findings always hash to the same, sorted cluster ids.
        #[test]
        fn cluster_ids_are_stable_and_sorted(
            texts in prop::collection::vec("[a-z]{3,12}( [a-z]{3,12}){0,4}", 0..12),
        ) {
            let mut output = ModeOutput::new("deductive", "thesis");
            output.confidence = 0.8;
            output.top_findings = texts
                .iter()
                .map(|t| Finding::new(t.clone()).with_confidence(0.5))
                .collect();

            let engine = DedupeEngine::default();
            let a = engine.cluster(std::slice::from_ref(&output));
            let b = engine.cluster(std::slice::from_ref(&output));

            let ids_a: Vec<String> = a.clusters.iter().map(|c| c.id.clone()).collect();
            let ids_b: Vec<String> = b.clusters.iter().map(|c| c.id.clone()).collect();
            prop_assert_eq!(&ids_a, &ids_b);

            let mut sorted = ids_a.clone();
            sorted.sort();
            prop_assert_eq!(ids_a, sorted);

            // Every finding lands in exactly one cluster.
            let member_count: usize = a.clusters.iter().map(|c| c.members.len()).sum();
            prop_assert_eq!(member_count, texts.len());
        }

        /// Normalization is idempotent and never produces an
        /// out-of-range confidence from an in-range input.
        #[test]
        fn normalization_is_idempotent(confidence in 0.0f64..=1.0) {
            let mut output = ModeOutput::new("deductive", "thesis");
            output.confidence = confidence;
            output.top_findings.push(Finding::new("f").with_confidence(confidence));

            normalize_output(&mut output);
            let once = output.clone();
            normalize_output(&mut output);
            prop_assert_eq!(&once, &output);

            prop_assert!(output.confidence > 0.0 && output.confidence <= 1.0);
        }

        /// Spent plus remaining always reconciles with the configured
        /// totals, and denial implies the matching over-budget flag.
        #[test]
        fn budget_counters_reconcile(
            spends in prop::collection::vec(("agent-[ab]", 0u64..3_000), 1..20),
        ) {
            let config = BudgetConfig {
                max_tokens_per_mode: 2_000,
                max_total_tokens: 10_000,
                ..Default::default()
            };
            let tracker = BudgetTracker::new(config);

            for (agent, tokens) in &spends {
                let decision = tracker.record_spend(agent, *tokens);
                prop_assert_eq!(
                    decision.agent_remaining,
                    2_000u64.saturating_sub(decision.agent_spent)
                );
                prop_assert_eq!(
                    decision.total_remaining,
                    10_000u64.saturating_sub(decision.total_spent)
                );
                if !decision.allowed {
                    prop_assert!(decision.reason.is_some());
                    prop_assert!(
                        tracker.is_agent_over_budget(agent) || tracker.is_over_budget()
                    );
                }
            }

            let state = tracker.state();
            let by_agent: u64 = state.per_agent.values().sum();
            prop_assert_eq!(by_agent, state.total_spent);
        }
    }
}
