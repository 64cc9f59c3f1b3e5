//! Token budget tracking with per-agent and global admission control.
//!
//! Spends are recorded unconditionally; the returned decision tells the
//! caller whether the spend crossed a limit. Callers must interpret
//! `allowed == false` and stop spending for that agent (or session).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Resource limits for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Token ceiling per mode/agent
    #[serde(default)]
    pub max_tokens_per_mode: u64,
    /// Token ceiling for the whole session
    #[serde(default)]
    pub max_total_tokens: u64,
    /// Tokens held back for the synthesis pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_reserve_tokens: Option<u64>,
    /// Tokens held back for context injection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_reserve_tokens: Option<u64>,
    /// Wall-clock bound per mode, seconds
    #[serde(default)]
    pub timeout_per_mode_secs: u64,
    /// Wall-clock bound for the session, seconds
    #[serde(default)]
    pub total_timeout_secs: u64,
    /// Retry attempts for failed capture/injection
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_mode: 4_000,
            max_total_tokens: 50_000,
            synthesis_reserve_tokens: None,
            context_reserve_tokens: None,
            timeout_per_mode_secs: 300,
            total_timeout_secs: 1_800,
            max_retries: 2,
        }
    }
}

impl BudgetConfig {
    /// Fill zero fields from the defaults; explicit values are kept.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_tokens_per_mode == 0 {
            self.max_tokens_per_mode = defaults.max_tokens_per_mode;
        }
        if self.max_total_tokens == 0 {
            self.max_total_tokens = defaults.max_total_tokens;
        }
        if self.timeout_per_mode_secs == 0 {
            self.timeout_per_mode_secs = defaults.timeout_per_mode_secs;
        }
        if self.total_timeout_secs == 0 {
            self.total_timeout_secs = defaults.total_timeout_secs;
        }
        if self.max_retries == 0 {
            self.max_retries = defaults.max_retries;
        }
        self
    }
}

/// Outcome of recording a spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendDecision {
    pub agent: String,
    pub tokens: u64,
    /// False when this spend crossed the agent or total limit
    pub allowed: bool,
    pub agent_spent: u64,
    pub agent_remaining: u64,
    pub total_spent: u64,
    pub total_remaining: u64,
    /// Human-readable denial reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Snapshot of tracker state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    pub per_agent: HashMap<String, u64>,
    pub total_spent: u64,
    pub started_at: DateTime<Utc>,
    pub config: BudgetConfig,
}

#[derive(Debug)]
struct TrackerState {
    per_agent: HashMap<String, u64>,
    total_spent: u64,
    started_at: DateTime<Utc>,
}

/// Thread-safe token counters over a [`BudgetConfig`].
#[derive(Debug)]
pub struct BudgetTracker {
    config: BudgetConfig,
    state: RwLock<TrackerState>,
}

impl BudgetTracker {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config: config.normalized(),
            state: RwLock::new(TrackerState {
                per_agent: HashMap::new(),
                total_spent: 0,
                started_at: Utc::now(),
            }),
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Record a token spend for an agent, updating both counters, and
    /// report whether the spend stayed within budget.
    pub fn record_spend(&self, agent: &str, tokens: u64) -> SpendDecision {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        let agent_spent = state.per_agent.entry(agent.to_string()).or_insert(0);
        *agent_spent += tokens;
        let agent_spent = *agent_spent;
        state.total_spent += tokens;
        let total_spent = state.total_spent;
        drop(state);

        let reason = if agent_spent > self.config.max_tokens_per_mode {
            Some(format!(
                "agent budget exceeded: {} spent {} of {} tokens",
                agent, agent_spent, self.config.max_tokens_per_mode
            ))
        } else if total_spent > self.config.max_total_tokens {
            Some(format!(
                "total budget exceeded: {} of {} tokens",
                total_spent, self.config.max_total_tokens
            ))
        } else {
            None
        };

        SpendDecision {
            agent: agent.to_string(),
            tokens,
            allowed: reason.is_none(),
            agent_spent,
            agent_remaining: self.config.max_tokens_per_mode.saturating_sub(agent_spent),
            total_spent,
            total_remaining: self.config.max_total_tokens.saturating_sub(total_spent),
            reason,
        }
    }

    /// Tokens an agent may still spend.
    pub fn remaining_for_agent(&self, agent: &str) -> u64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let spent = state.per_agent.get(agent).copied().unwrap_or(0);
        self.config.max_tokens_per_mode.saturating_sub(spent)
    }

    /// Tokens the session may still spend.
    pub fn total_remaining(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        self.config.max_total_tokens.saturating_sub(state.total_spent)
    }

    /// True once total spend crossed the session limit.
    pub fn is_over_budget(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.total_spent > self.config.max_total_tokens
    }

    /// True once the agent crossed its per-mode limit.
    pub fn is_agent_over_budget(&self, agent: &str) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.per_agent.get(agent).copied().unwrap_or(0) > self.config.max_tokens_per_mode
    }

    /// Snapshot the current counters.
    pub fn state(&self) -> BudgetState {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        BudgetState {
            per_agent: state.per_agent.clone(),
            total_spent: state.total_spent,
            started_at: state.started_at,
            config: self.config.clone(),
        }
    }

    /// Zero all counters and restart the clock.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.per_agent.clear();
        state.total_spent = 0;
        state.started_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tracker(per_agent: u64, total: u64) -> BudgetTracker {
        BudgetTracker::new(BudgetConfig {
            max_tokens_per_mode: per_agent,
            max_total_tokens: total,
            ..Default::default()
        })
    }

    #[test]
    fn test_defaults_fill_zero_fields() {
        let config = BudgetConfig {
            max_tokens_per_mode: 0,
            max_total_tokens: 9_999,
            timeout_per_mode_secs: 0,
            total_timeout_secs: 0,
            max_retries: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.max_tokens_per_mode, 4_000);
        assert_eq!(config.max_total_tokens, 9_999);
        assert_eq!(config.timeout_per_mode_secs, 300);
        assert_eq!(config.total_timeout_secs, 1_800);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_admission_sequence() {
        let tracker = tracker(1_000, 3_000);

        let d = tracker.record_spend("A", 500);
        assert!(d.allowed);
        assert_eq!(d.agent_remaining, 500);

        let d = tracker.record_spend("B", 800);
        assert!(d.allowed);

        let d = tracker.record_spend("A", 600);
        assert!(!d.allowed);
        assert!(d.reason.as_deref().unwrap().contains("agent budget exceeded"));
        assert!(tracker.is_agent_over_budget("A"));
        assert!(!tracker.is_over_budget());

        let d = tracker.record_spend("C", 1_500);
        assert!(!d.allowed);
        assert!(d.reason.as_deref().unwrap().contains("total budget exceeded"));
        assert!(tracker.is_over_budget());
    }

    #[test]
    fn test_remaining_saturates() {
        let tracker = tracker(100, 1_000);
        tracker.record_spend("A", 250);
        assert_eq!(tracker.remaining_for_agent("A"), 0);
        assert_eq!(tracker.remaining_for_agent("B"), 100);
        assert_eq!(tracker.total_remaining(), 750);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let tracker = tracker(100, 1_000);
        tracker.record_spend("A", 50);
        tracker.reset();
        assert_eq!(tracker.total_remaining(), 1_000);
        assert_eq!(tracker.remaining_for_agent("A"), 100);
        assert!(tracker.state().per_agent.is_empty());
    }
}
