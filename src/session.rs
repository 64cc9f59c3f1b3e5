//! Session and assignment state machines.
//!
//! A session moves monotonically through the normal path
//! spawning → injecting → active → synthesizing → complete; `error` is
//! terminal and reachable from any live state. Assignments follow the same
//! discipline at their own granularity.

use crate::error::{Error, Result};
use crate::plan::AgentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Lifecycle of a single mode assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Injecting,
    Active,
    Done,
    Error,
}

impl AssignmentStatus {
    fn order(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Injecting => 1,
            Self::Active => 2,
            Self::Done => 3,
            Self::Error => 4,
        }
    }

    /// Forward-only transitions; error is terminal and reachable from any
    /// live state.
    pub fn can_transition_to(&self, next: AssignmentStatus) -> bool {
        match (self, next) {
            (Self::Error, _) | (Self::Done, _) => false,
            (_, Self::Error) => true,
            _ => next.order() > self.order(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Injecting => "injecting",
            Self::Active => "active",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle of a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Spawning,
    Injecting,
    Active,
    Synthesizing,
    Complete,
    Error,
}

impl SessionStatus {
    fn order(&self) -> u8 {
        match self {
            Self::Spawning => 0,
            Self::Injecting => 1,
            Self::Active => 2,
            Self::Synthesizing => 3,
            Self::Complete => 4,
            Self::Error => 5,
        }
    }

    /// Forward-only transitions; error is terminal and reachable from any
    /// live state.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::Error, _) | (Self::Complete, _) => false,
            (_, Self::Error) => true,
            _ => next.order() > self.order(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spawning => "spawning",
            Self::Injecting => "injecting",
            Self::Active => "active",
            Self::Synthesizing => "synthesizing",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Binding of one mode to one pane for the session's duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeAssignment {
    pub mode_id: String,
    pub pane_name: String,
    pub agent_type: AgentType,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Set when the planner could not honor the preferred agent type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ModeAssignment {
    pub fn new(
        mode_id: impl Into<String>,
        pane_name: impl Into<String>,
        agent_type: AgentType,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mode_id: mode_id.into(),
            pane_name: pane_name.into(),
            agent_type,
            status: AssignmentStatus::Pending,
            assigned_at,
            completed_at: None,
            error: None,
            output_path: None,
            fallback_reason: None,
        }
    }

    /// Move the assignment to `next`, stamping completion and error fields.
    pub fn transition(&mut self, next: AssignmentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "assignment {}: illegal transition {} -> {}",
                self.mode_id, self.status, next
            )));
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Flip to error with a reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = AssignmentStatus::Error;
        self.error = Some(reason.into());
        self.completed_at = Some(Utc::now());
    }
}

/// One ensemble run: the question, its assignments, and where the
/// state machine currently stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSession {
    /// External stable identifier (multiplexer session name)
    pub session_name: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
    #[serde(default)]
    pub assignments: Vec<ModeAssignment>,
    pub status: SessionStatus,
    pub synthesis_strategy: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_synthesis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnsembleSession {
    /// Create a session with a generated name, for callers that have no
    /// external multiplexer session to bind to yet.
    pub fn with_generated_name(question: impl Into<String>) -> Self {
        let name = format!("ensemble-{}", uuid::Uuid::new_v4().simple());
        Self::new(name, question)
    }

    pub fn new(session_name: impl Into<String>, question: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_name: session_name.into(),
            question: question.into(),
            preset_name: None,
            assignments: Vec::new(),
            status: SessionStatus::Spawning,
            synthesis_strategy: "consensus".to_string(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            final_synthesis: None,
            error: None,
        }
    }

    /// Attach a plan, enforcing mode and pane uniqueness.
    pub fn with_assignments(mut self, assignments: Vec<ModeAssignment>) -> Result<Self> {
        let mut modes = HashSet::new();
        let mut panes = HashSet::new();
        for a in &assignments {
            if !modes.insert(a.mode_id.clone()) {
                return Err(Error::planning(format!(
                    "mode {} assigned more than once",
                    a.mode_id
                )));
            }
            if !panes.insert(a.pane_name.clone()) {
                return Err(Error::planning(format!(
                    "pane {} assigned more than once",
                    a.pane_name
                )));
            }
        }
        self.assignments = assignments;
        Ok(self)
    }

    /// Move the session to `next`, stamping timestamps.
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "session {}: illegal transition {} -> {}",
                self.session_name, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// Fail the session with a reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = SessionStatus::Error;
        self.error = Some(reason.into());
        self.updated_at = Utc::now();
        self.completed_at = Some(self.updated_at);
    }

    pub fn assignment(&self, mode_id: &str) -> Option<&ModeAssignment> {
        self.assignments.iter().find(|a| a.mode_id == mode_id)
    }

    pub fn assignment_mut(&mut self, mode_id: &str) -> Option<&mut ModeAssignment> {
        self.assignments.iter_mut().find(|a| a.mode_id == mode_id)
    }
}
