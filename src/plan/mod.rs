//! Assignment planner: binds reasoning modes to multiplexer panes.
//!
//! All strategies are deterministic functions of their (sorted) inputs:
//! permuting the requested modes or the pane list never changes the plan.

mod strategies;
mod types;

pub use strategies::{
    category_affinities, plan_category_affinity, plan_explicit, plan_round_robin,
    DEFAULT_AFFINITY,
};
pub use types::{AgentType, Pane, PaneRef};

use crate::error::{Error, Result};
use crate::session::ModeAssignment;
use std::collections::HashSet;

/// Post-condition check every strategy runs before returning a plan.
pub fn validate_assignments(assignments: &[ModeAssignment], requested: &[String]) -> Result<()> {
    if assignments.len() != requested.len() {
        return Err(Error::planning(format!(
            "plan size {} does not match requested mode count {}",
            assignments.len(),
            requested.len()
        )));
    }

    let mut panes = HashSet::new();
    let mut modes = HashSet::new();
    for a in assignments {
        if a.mode_id.trim().is_empty() {
            return Err(Error::planning("assignment with empty mode_id"));
        }
        if a.pane_name.trim().is_empty() {
            return Err(Error::planning(format!(
                "assignment for {} has empty pane_name",
                a.mode_id
            )));
        }
        if !modes.insert(a.mode_id.as_str()) {
            return Err(Error::planning(format!("duplicate mode in plan: {}", a.mode_id)));
        }
        if !panes.insert(a.pane_name.as_str()) {
            return Err(Error::planning(format!(
                "duplicate pane in plan: {}",
                a.pane_name
            )));
        }
    }

    for mode in requested {
        if !modes.contains(mode.as_str()) {
            return Err(Error::planning(format!("requested mode missing from plan: {}", mode)));
        }
    }

    Ok(())
}

/// Normalize requested mode ids: trim, lowercase, drop empties, sort,
/// dedup.
pub(crate) fn normalize_mode_ids(mode_ids: &[String]) -> Vec<String> {
    let mut modes: Vec<String> = mode_ids
        .iter()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();
    modes.sort();
    modes.dedup();
    modes
}

/// Assignable panes in deterministic order.
pub(crate) fn assignable_panes(panes: &[Pane]) -> Vec<Pane> {
    let mut panes: Vec<Pane> = panes.iter().filter(|p| p.is_assignable()).cloned().collect();
    panes.sort_by_key(|p| p.order_key());
    panes
}
