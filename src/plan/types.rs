//! Pane and agent-type types consumed by the assignment planner.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of agent driving a pane. Closed set; `User` panes are never
/// assignable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    #[serde(alias = "cc")]
    Claude,
    #[serde(alias = "cod")]
    Codex,
    #[serde(alias = "gmi")]
    Gemini,
    User,
}

impl AgentType {
    /// Short wire code (`cc`, `cod`, `gmi`, `user`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Claude => "cc",
            Self::Codex => "cod",
            Self::Gemini => "gmi",
            Self::User => "user",
        }
    }

    /// Types that may receive assignments.
    pub const ASSIGNABLE: [AgentType; 3] = [Self::Claude, Self::Codex, Self::Gemini];

    pub fn is_assignable(&self) -> bool {
        !matches!(self, Self::User)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cc" | "claude" => Ok(Self::Claude),
            "cod" | "codex" => Ok(Self::Codex),
            "gmi" | "gemini" => Ok(Self::Gemini),
            "user" => Ok(Self::User),
            other => Err(Error::planning(format!("unknown agent type: {}", other))),
        }
    }
}

/// A terminal region in the external multiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub index: i32,
    /// Index assigned by the multiplexer wrapper; preferred for ordering
    /// when positive
    #[serde(default)]
    pub ntm_index: i32,
}

impl Pane {
    /// A pane can take an assignment when it has a title and is not the
    /// user's own pane.
    pub fn is_assignable(&self) -> bool {
        !self.title.trim().is_empty() && self.agent_type.is_assignable()
    }

    /// Deterministic ordering key: `(ntm_index if > 0 else index, index,
    /// title)`.
    pub fn order_key(&self) -> (i32, i32, String) {
        let primary = if self.ntm_index > 0 {
            self.ntm_index
        } else {
            self.index
        };
        (primary, self.index, self.title.clone())
    }
}

/// Address of a pane for capture: by id (preferred) or by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneRef {
    Id(String),
    Title(String),
}

impl PaneRef {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(s) | Self::Title(s) => s,
        }
    }
}

impl fmt::Display for PaneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_parse() {
        assert_eq!("cc".parse::<AgentType>().unwrap(), AgentType::Claude);
        assert_eq!("Claude".parse::<AgentType>().unwrap(), AgentType::Claude);
        assert_eq!("cod".parse::<AgentType>().unwrap(), AgentType::Codex);
        assert_eq!("gemini".parse::<AgentType>().unwrap(), AgentType::Gemini);
        assert!("robot".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_user_never_assignable() {
        assert!(!AgentType::User.is_assignable());
        assert!(!AgentType::ASSIGNABLE.contains(&AgentType::User));
    }

    #[test]
    fn test_pane_assignability() {
        let mut pane = Pane {
            id: "%1".into(),
            title: "pane-a".into(),
            agent_type: AgentType::Claude,
            index: 1,
            ntm_index: 0,
        };
        assert!(pane.is_assignable());

        pane.title = "  ".into();
        assert!(!pane.is_assignable());

        pane.title = "pane-a".into();
        pane.agent_type = AgentType::User;
        assert!(!pane.is_assignable());
    }

    #[test]
    fn test_pane_order_key_prefers_ntm_index() {
        let pane = Pane {
            id: "%1".into(),
            title: "t".into(),
            agent_type: AgentType::Claude,
            index: 5,
            ntm_index: 2,
        };
        assert_eq!(pane.order_key(), (2, 5, "t".into()));

        let pane = Pane { ntm_index: 0, ..pane };
        assert_eq!(pane.order_key(), (5, 5, "t".into()));
    }
}
