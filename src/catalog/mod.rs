//! Reasoning mode catalog: taxonomy types, the validated catalog
//! collection, and the embedded builtin mode table.

mod builtin;
mod types;

pub use builtin::builtin_catalog;
pub use types::{validate_mode_id, Category, ModeCode, ReasoningMode, Tier, UiHints};

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Immutable ordered collection of reasoning modes with id, code, category,
/// and tier lookups. Construction validates every mode and rejects
/// duplicate ids or codes.
#[derive(Debug, Clone)]
pub struct ModeCatalog {
    modes: Vec<ReasoningMode>,
    by_id: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl ModeCatalog {
    /// Build a catalog from an ordered list of modes.
    pub fn new(modes: Vec<ReasoningMode>) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_code = HashMap::new();

        for (idx, mode) in modes.iter().enumerate() {
            mode.validate()?;
            if by_id.insert(mode.id.clone(), idx).is_some() {
                return Err(Error::config(format!("duplicate mode id: {}", mode.id)));
            }
            if let Some(code) = &mode.code {
                if by_code.insert(code.to_string(), idx).is_some() {
                    return Err(Error::config(format!("duplicate mode code: {}", code)));
                }
            }
        }

        Ok(Self {
            modes,
            by_id,
            by_code,
        })
    }

    /// Number of modes in the catalog.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// All modes in catalog order.
    pub fn list(&self) -> &[ReasoningMode] {
        &self.modes
    }

    /// Look up a mode by id.
    pub fn get(&self, id: &str) -> Option<&ReasoningMode> {
        self.by_id.get(id).map(|&idx| &self.modes[idx])
    }

    /// Look up a mode by taxonomy code, case-insensitive on the letter.
    pub fn get_by_code(&self, code: &str) -> Option<&ReasoningMode> {
        let normalized = code.trim().to_ascii_uppercase();
        self.by_code.get(&normalized).map(|&idx| &self.modes[idx])
    }

    /// All modes in the given category, in catalog order.
    pub fn by_category(&self, category: Category) -> Vec<&ReasoningMode> {
        self.modes
            .iter()
            .filter(|m| m.category == category)
            .collect()
    }

    /// All modes in the given tier, in catalog order.
    pub fn by_tier(&self, tier: Tier) -> Vec<&ReasoningMode> {
        self.modes.iter().filter(|m| m.tier == tier).collect()
    }

    /// Case-insensitive substring search over name, descriptions, and
    /// best_for entries.
    pub fn search(&self, query: &str) -> Vec<&ReasoningMode> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.modes
            .iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&q)
                    || m.short_desc.to_lowercase().contains(&q)
                    || m.description.to_lowercase().contains(&q)
                    || m.best_for.iter().any(|b| b.to_lowercase().contains(&q))
            })
            .collect()
    }
}
