//! Context pack: the precomputed project/problem summary fed to every agent.
//!
//! The core treats the pack as opaque apart from the project brief, the
//! user context, and the cache hash.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Summary of the workspace the ensemble is reasoning about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectBrief {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    /// High-level layout description (directories, services, entry points)
    #[serde(default)]
    pub structure: String,
    #[serde(default)]
    pub open_issues: Vec<String>,
}

/// What the user wants out of this session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub problem_statement: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
}

/// The full pack handed to each agent alongside its mode preamble.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub project: ProjectBrief,
    pub user: UserContext,
    /// Cache key over the pack content
    #[serde(default)]
    pub hash: String,
    /// Builder-specific sections the core passes through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ContextPack {
    pub fn new(project: ProjectBrief, user: UserContext) -> Self {
        let mut pack = Self {
            project,
            user,
            hash: String::new(),
            extra: BTreeMap::new(),
        };
        pack.hash = pack.compute_hash();
        pack
    }

    /// Content hash usable as a cache key: first 16 hex chars of sha256
    /// over the canonical JSON form (hash field excluded).
    pub fn compute_hash(&self) -> String {
        let mut hashable = self.clone();
        hashable.hash = String::new();
        let json = serde_json::to_string(&hashable).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..16].to_string()
    }

    /// Recompute and store the hash after mutation.
    pub fn rehash(&mut self) {
        self.hash = self.compute_hash();
    }
}
