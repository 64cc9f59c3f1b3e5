//! Preset config files.
//!
//! Sources merge in precedence order: embedded defaults, then the user
//! config (`<config dir>/ensembles.toml`), then the project config
//! (`<project>/.ntm/ensembles.toml`). Later sources override earlier ones
//! by preset name.

use super::{EnsemblePreset, PresetSource};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The user-level config file path, when a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ensembles.toml"))
}

/// The project-level config file path.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".ntm").join("ensembles.toml")
}

#[derive(Debug, Deserialize)]
struct EnsemblesFile {
    #[serde(default)]
    ensembles: Vec<PresetDoc>,
}

/// On-disk preset shape; `source` is assigned by the loader, not the file.
#[derive(Debug, Deserialize)]
struct PresetDoc {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    modes: Vec<super::ModeRef>,
    #[serde(default)]
    synthesis: super::SynthesisConfig,
    #[serde(default)]
    budget: crate::budget::BudgetConfig,
    #[serde(default)]
    cache: super::CacheConfig,
    #[serde(default)]
    agent_distribution: Option<std::collections::BTreeMap<crate::plan::AgentType, usize>>,
    #[serde(default)]
    allow_advanced: bool,
    #[serde(default)]
    tags: Vec<String>,
}

impl PresetDoc {
    fn into_preset(self, source: PresetSource) -> EnsemblePreset {
        let display_name = if self.display_name.is_empty() {
            self.name.clone()
        } else {
            self.display_name
        };
        EnsemblePreset {
            name: self.name,
            display_name,
            description: self.description,
            modes: self.modes,
            synthesis: self.synthesis,
            budget: self.budget.normalized(),
            cache: self.cache,
            agent_distribution: self.agent_distribution,
            allow_advanced: self.allow_advanced,
            tags: self.tags,
            source,
        }
    }
}

/// Parse an `ensembles.toml` document, tagging each preset with its source.
pub fn parse_ensembles_toml(text: &str, source: PresetSource) -> Result<Vec<EnsemblePreset>> {
    let file: EnsemblesFile =
        toml::from_str(text).map_err(|e| Error::config(format!("ensembles.toml: {}", e)))?;
    Ok(file
        .ensembles
        .into_iter()
        .map(|doc| doc.into_preset(source))
        .collect())
}

/// The embedded default presets, lowest layer of the registry.
pub fn embedded_presets() -> Result<Vec<EnsemblePreset>> {
    parse_ensembles_toml(EMBEDDED_TOML, PresetSource::Embedded)
}

const EMBEDDED_TOML: &str = r#"
[[ensembles]]
name = "quick"
display_name = "Quick Look"
description = "Two fast core modes with a mechanical merge"
modes = [{ id = "deductive" }, { id = "abductive" }]
tags = ["fast"]

[ensembles.synthesis]
strategy = "manual"

[ensembles.budget]
max_tokens_per_mode = 2000
max_total_tokens = 10000

[[ensembles]]
name = "balanced"
display_name = "Balanced Ensemble"
description = "Core modes covering formal, explanatory, adversarial, and meta perspectives"
modes = [
    { id = "deductive" },
    { id = "abductive" },
    { id = "adversarial" },
    { id = "meta-cognitive" },
]
tags = ["default"]

[ensembles.synthesis]
strategy = "consensus"

[[ensembles]]
name = "deep-audit"
display_name = "Deep Audit"
description = "Advanced modes for high-stakes review"
modes = [
    { id = "adversarial" },
    { id = "causal-inference" },
    { id = "counterfactual" },
    { id = "evidential" },
    { id = "assumption-audit" },
]
allow_advanced = true
tags = ["thorough"]

[ensembles.synthesis]
strategy = "dialectical"
synthesizer_mode = "dialectical"

[ensembles.budget]
max_tokens_per_mode = 6000
max_total_tokens = 80000
"#;
