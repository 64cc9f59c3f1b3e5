//! The three assignment strategies.

use super::types::{AgentType, Pane};
use super::{assignable_panes, normalize_mode_ids, validate_assignments};
use crate::catalog::{Category, ModeCatalog};
use crate::error::{Error, Result};
use crate::session::ModeAssignment;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// Preferred agent types per category, in preference order.
pub fn category_affinities(category: Category) -> &'static [AgentType] {
    use AgentType::*;
    match category {
        Category::Formal => &[Claude, Codex],
        Category::Ampliative => &[Claude, Gemini],
        Category::Uncertainty => &[Claude, Codex],
        Category::Vagueness => &[Gemini, Claude],
        Category::Change => &[Codex, Claude],
        Category::Causal => &[Claude, Codex],
        Category::Practical => &[Codex, Claude],
        Category::Strategic => &[Claude, Gemini],
        Category::Dialectical => &[Claude],
        Category::Modal => &[Gemini, Claude],
        Category::Domain => &[Codex, Gemini],
        Category::Meta => &[Claude],
    }
}

/// Preference order for the fallback when no preferred pane is free.
pub const DEFAULT_AFFINITY: [AgentType; 3] =
    [AgentType::Claude, AgentType::Codex, AgentType::Gemini];

fn affinity_rank(agent_type: AgentType) -> usize {
    DEFAULT_AFFINITY
        .iter()
        .position(|t| *t == agent_type)
        .unwrap_or(DEFAULT_AFFINITY.len())
}

/// Round-robin: sorted modes zipped onto sorted panes.
///
/// Empty mode input yields an empty plan; more modes than assignable panes
/// fails the plan atomically.
pub fn plan_round_robin(mode_ids: &[String], panes: &[Pane]) -> Result<Vec<ModeAssignment>> {
    let modes = normalize_mode_ids(mode_ids);
    if modes.is_empty() {
        return Ok(Vec::new());
    }

    let panes = assignable_panes(panes);
    if modes.len() > panes.len() {
        return Err(Error::planning(format!(
            "{} modes requested but only {} assignable panes",
            modes.len(),
            panes.len()
        )));
    }

    let assigned_at = Utc::now();
    let assignments: Vec<ModeAssignment> = modes
        .iter()
        .zip(panes.iter())
        .map(|(mode, pane)| {
            ModeAssignment::new(mode.clone(), pane.title.clone(), pane.agent_type, assigned_at)
        })
        .collect();

    validate_assignments(&assignments, &modes)?;
    Ok(assignments)
}

/// Category-affinity: each mode goes to the first free pane whose agent
/// type its category prefers, falling back deterministically when no
/// preferred pane is free.
pub fn plan_category_affinity(
    mode_ids: &[String],
    panes: &[Pane],
    catalog: &ModeCatalog,
) -> Result<Vec<ModeAssignment>> {
    let modes = normalize_mode_ids(mode_ids);
    if modes.is_empty() {
        return Ok(Vec::new());
    }

    // Resolve every mode before assigning anything; the plan is atomic.
    let mut resolved: Vec<(String, Category)> = Vec::with_capacity(modes.len());
    for mode in &modes {
        let found = catalog
            .get(mode)
            .or_else(|| catalog.get_by_code(mode))
            .ok_or_else(|| Error::planning(format!("unknown mode key: {}", mode)))?;
        resolved.push((found.id.clone(), found.category));
    }
    resolved.sort_by(|a, b| a.0.cmp(&b.0));
    resolved.dedup_by(|a, b| a.0 == b.0);

    let panes = assignable_panes(panes);
    if resolved.len() > panes.len() {
        return Err(Error::planning(format!(
            "{} modes requested but only {} assignable panes",
            resolved.len(),
            panes.len()
        )));
    }

    let assigned_at = Utc::now();
    let mut used = vec![false; panes.len()];
    let mut assignments = Vec::with_capacity(resolved.len());

    for (mode_id, category) in &resolved {
        let preferred = category_affinities(*category);
        let slot = preferred.iter().find_map(|want| {
            panes
                .iter()
                .enumerate()
                .find(|(i, p)| !used[*i] && p.agent_type == *want)
                .map(|(i, _)| i)
        });

        let (slot, fallback_reason) = match slot {
            Some(i) => (i, None),
            None => {
                // Deterministic fallback: unused panes in default affinity
                // order, then pane order.
                let mut candidates: Vec<usize> =
                    (0..panes.len()).filter(|&i| !used[i]).collect();
                candidates
                    .sort_by_key(|&i| (affinity_rank(panes[i].agent_type), panes[i].order_key()));
                let i = *candidates.first().ok_or_else(|| {
                    Error::planning(format!("no pane left for mode {}", mode_id))
                })?;
                let reason = format!(
                    "no {} pane available for category {}; fell back to {}",
                    preferred
                        .iter()
                        .map(|t| t.code())
                        .collect::<Vec<_>>()
                        .join("/"),
                    category,
                    panes[i].agent_type.code()
                );
                debug!(mode = %mode_id, %reason, "category affinity fallback");
                (i, Some(reason))
            }
        };

        used[slot] = true;
        let pane = &panes[slot];
        let mut assignment =
            ModeAssignment::new(mode_id.clone(), pane.title.clone(), pane.agent_type, assigned_at);
        assignment.fallback_reason = fallback_reason;
        assignments.push(assignment);
    }

    let requested: Vec<String> = resolved.into_iter().map(|(id, _)| id).collect();
    validate_assignments(&assignments, &requested)?;
    Ok(assignments)
}

/// Explicit `mode:agent-type` specs. Commas inside a single input expand
/// into separate specs; whitespace is trimmed and empty segments skipped.
pub fn plan_explicit(specs: &[String], panes: &[Pane]) -> Result<Vec<ModeAssignment>> {
    let expanded: Vec<&str> = specs
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if expanded.is_empty() {
        return Err(Error::planning("at least one mode:agent-type spec is required"));
    }

    // Parse and normalize into a sorted mode -> agent map, rejecting dups.
    let mut wanted: BTreeMap<String, AgentType> = BTreeMap::new();
    for spec in &expanded {
        let (mode, agent) = spec.split_once(':').ok_or_else(|| {
            Error::planning(format!("invalid spec (expected mode:agent-type): {}", spec))
        })?;
        let mode = mode.trim().to_lowercase();
        let agent = agent.trim().to_lowercase();
        if mode.is_empty() {
            return Err(Error::planning(format!("empty mode id in spec: {}", spec)));
        }
        if agent.is_empty() {
            return Err(Error::planning(format!("empty agent type in spec: {}", spec)));
        }
        let agent_type: AgentType = agent.parse()?;
        if !agent_type.is_assignable() {
            return Err(Error::planning(format!(
                "agent type {} is not assignable",
                agent_type
            )));
        }
        if wanted.insert(mode.clone(), agent_type).is_some() {
            return Err(Error::planning(format!("duplicate mode in specs: {}", mode)));
        }
    }

    let panes = assignable_panes(panes);
    if wanted.len() > panes.len() {
        return Err(Error::planning(format!(
            "{} specs but only {} assignable panes",
            wanted.len(),
            panes.len()
        )));
    }

    let assigned_at = Utc::now();
    let mut used = vec![false; panes.len()];
    let mut assignments = Vec::with_capacity(wanted.len());

    for (mode_id, agent_type) in &wanted {
        let slot = panes
            .iter()
            .enumerate()
            .find(|(i, p)| !used[*i] && p.agent_type == *agent_type)
            .map(|(i, _)| i);

        let (slot, fallback_reason) = match slot {
            Some(i) => (i, None),
            None => {
                let i = (0..panes.len())
                    .find(|&i| !used[i])
                    .ok_or_else(|| Error::planning(format!("no pane left for mode {}", mode_id)))?;
                (
                    i,
                    Some(format!(
                        "no {} pane available; fell back to {}",
                        agent_type.code(),
                        panes[i].agent_type.code()
                    )),
                )
            }
        };

        used[slot] = true;
        let pane = &panes[slot];
        let mut assignment =
            ModeAssignment::new(mode_id.clone(), pane.title.clone(), pane.agent_type, assigned_at);
        assignment.fallback_reason = fallback_reason;
        assignments.push(assignment);
    }

    let requested: Vec<String> = wanted.keys().cloned().collect();
    validate_assignments(&assignments, &requested)?;
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::session::AssignmentStatus;
    use pretty_assertions::assert_eq;

    fn pane(title: &str, agent_type: AgentType, index: i32, ntm_index: i32) -> Pane {
        Pane {
            id: format!("%{}", index),
            title: title.into(),
            agent_type,
            index,
            ntm_index,
        }
    }

    #[test]
    fn test_round_robin_two_modes_two_panes() {
        // Pane order is by (ntm_index, index, title); modes sorted.
        let panes = vec![
            pane("pane-b", AgentType::Codex, 2, 2),
            pane("pane-a", AgentType::Claude, 1, 1),
        ];
        let modes = vec!["deductive".to_string(), "abductive".to_string()];

        let plan = plan_round_robin(&modes, &panes).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].mode_id, "abductive");
        assert_eq!(plan[0].pane_name, "pane-a");
        assert_eq!(plan[0].agent_type, AgentType::Claude);
        assert_eq!(plan[1].mode_id, "deductive");
        assert_eq!(plan[1].pane_name, "pane-b");
        assert_eq!(plan[1].agent_type, AgentType::Codex);

        for a in &plan {
            assert_eq!(a.status, AssignmentStatus::Pending);
            assert_eq!(a.assigned_at, plan[0].assigned_at);
        }
    }

    #[test]
    fn test_round_robin_empty_modes_is_empty_plan() {
        let panes = vec![pane("pane-a", AgentType::Claude, 1, 1)];
        assert!(plan_round_robin(&[], &panes).unwrap().is_empty());
        assert!(plan_round_robin(&["  ".to_string()], &panes).unwrap().is_empty());
    }

    #[test]
    fn test_round_robin_too_many_modes_fails() {
        let panes = vec![pane("pane-a", AgentType::Claude, 1, 1)];
        let modes = vec!["deductive".to_string(), "abductive".to_string()];
        assert!(plan_round_robin(&modes, &panes).is_err());
        assert!(plan_round_robin(&modes, &[]).is_err());
    }

    #[test]
    fn test_round_robin_normalizes_input() {
        let panes = vec![
            pane("pane-a", AgentType::Claude, 1, 1),
            pane("pane-b", AgentType::Codex, 2, 2),
        ];
        let modes = vec!["  Deductive ".to_string(), "deductive".to_string()];
        let plan = plan_round_robin(&modes, &panes).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].mode_id, "deductive");
    }

    #[test]
    fn test_round_robin_skips_unassignable_panes() {
        let panes = vec![
            pane("user-pane", AgentType::User, 0, 0),
            pane("", AgentType::Claude, 1, 1),
            pane("pane-a", AgentType::Claude, 2, 2),
        ];
        let plan = plan_round_robin(&["deductive".to_string()], &panes).unwrap();
        assert_eq!(plan[0].pane_name, "pane-a");
    }

    #[test]
    fn test_category_affinity_prefers_claude_for_dialectical() {
        let panes = vec![
            pane("pane-codex", AgentType::Codex, 1, 1),
            pane("pane-claude", AgentType::Claude, 2, 2),
        ];
        let plan =
            plan_category_affinity(&["dialectical".to_string()], &panes, builtin_catalog()).unwrap();
        assert_eq!(plan[0].pane_name, "pane-claude");
        assert!(plan[0].fallback_reason.is_none());
    }

    #[test]
    fn test_category_affinity_fallback_records_reason() {
        let panes = vec![pane("pane-codex", AgentType::Codex, 1, 1)];
        let plan =
            plan_category_affinity(&["dialectical".to_string()], &panes, builtin_catalog()).unwrap();
        assert_eq!(plan[0].mode_id, "dialectical");
        assert_eq!(plan[0].pane_name, "pane-codex");
        assert_eq!(plan[0].agent_type, AgentType::Codex);
        let reason = plan[0].fallback_reason.as_deref().unwrap();
        assert!(!reason.is_empty());
    }

    #[test]
    fn test_category_affinity_fallback_follows_default_order() {
        // Dialectical prefers claude only; with gemini and codex free the
        // fallback takes them in DEFAULT_AFFINITY order.
        let panes = vec![
            pane("pane-gemini", AgentType::Gemini, 1, 1),
            pane("pane-codex", AgentType::Codex, 2, 2),
        ];
        let plan =
            plan_category_affinity(&["dialectical".to_string()], &panes, builtin_catalog()).unwrap();
        assert_eq!(plan[0].agent_type, AgentType::Codex);
        assert!(plan[0].fallback_reason.is_some());
    }

    #[test]
    fn test_category_affinity_resolves_codes() {
        let panes = vec![pane("pane-claude", AgentType::Claude, 1, 1)];
        let plan = plan_category_affinity(&["i1".to_string()], &panes, builtin_catalog()).unwrap();
        assert_eq!(plan[0].mode_id, "dialectical");
    }

    #[test]
    fn test_category_affinity_unknown_mode_fails() {
        let panes = vec![pane("pane-claude", AgentType::Claude, 1, 1)];
        let err =
            plan_category_affinity(&["nonexistent".to_string()], &panes, builtin_catalog())
                .unwrap_err();
        assert!(err.to_string().contains("unknown mode key"));
    }

    #[test]
    fn test_explicit_comma_expansion() {
        let panes = vec![
            pane("pane-claude", AgentType::Claude, 1, 1),
            pane("pane-codex", AgentType::Codex, 2, 2),
        ];
        let specs = vec!["deductive:cc,abductive:cod".to_string()];
        let plan = plan_explicit(&specs, &panes).unwrap();
        assert_eq!(plan.len(), 2);
        // Iteration is by sorted mode_id.
        assert_eq!(plan[0].mode_id, "abductive");
        assert_eq!(plan[0].agent_type, AgentType::Codex);
        assert_eq!(plan[1].mode_id, "deductive");
        assert_eq!(plan[1].agent_type, AgentType::Claude);
    }

    #[test]
    fn test_explicit_requires_specs() {
        let panes = vec![pane("pane-claude", AgentType::Claude, 1, 1)];
        assert!(plan_explicit(&[], &panes).is_err());
        assert!(plan_explicit(&[" , ".to_string()], &panes).is_err());
    }

    #[test]
    fn test_explicit_duplicate_mode_fails() {
        let panes = vec![
            pane("pane-claude", AgentType::Claude, 1, 1),
            pane("pane-codex", AgentType::Codex, 2, 2),
        ];
        let specs = vec!["deductive:cc".to_string(), "deductive:cod".to_string()];
        assert!(plan_explicit(&specs, &panes).is_err());
    }

    #[test]
    fn test_explicit_user_type_rejected() {
        let panes = vec![pane("pane-claude", AgentType::Claude, 1, 1)];
        assert!(plan_explicit(&["deductive:user".to_string()], &panes).is_err());
        assert!(plan_explicit(&["deductive:".to_string()], &panes).is_err());
    }

    #[test]
    fn test_explicit_type_mismatch_falls_back() {
        let panes = vec![pane("pane-codex", AgentType::Codex, 1, 1)];
        let plan = plan_explicit(&["deductive:cc".to_string()], &panes).unwrap();
        assert_eq!(plan[0].agent_type, AgentType::Codex);
        assert!(plan[0].fallback_reason.is_some());
    }

    #[test]
    fn test_plans_are_permutation_invariant() {
        let panes_a = vec![
            pane("pane-b", AgentType::Codex, 2, 2),
            pane("pane-a", AgentType::Claude, 1, 1),
        ];
        let panes_b: Vec<Pane> = panes_a.iter().rev().cloned().collect();
        let modes_a = vec!["deductive".to_string(), "abductive".to_string()];
        let modes_b: Vec<String> = modes_a.iter().rev().cloned().collect();

        let strip = |plan: Vec<ModeAssignment>| {
            plan.into_iter()
                .map(|a| (a.mode_id, a.pane_name, a.agent_type))
                .collect::<Vec<_>>()
        };

        assert_eq!(
            strip(plan_round_robin(&modes_a, &panes_a).unwrap()),
            strip(plan_round_robin(&modes_b, &panes_b).unwrap())
        );
        assert_eq!(
            strip(plan_category_affinity(&modes_a, &panes_a, builtin_catalog()).unwrap()),
            strip(plan_category_affinity(&modes_b, &panes_b, builtin_catalog()).unwrap())
        );
    }
}
