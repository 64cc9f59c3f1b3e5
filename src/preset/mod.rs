//! Ensemble presets: named recipes of modes plus synthesis, budget, and
//! cache configuration.

mod config;

pub use config::{embedded_presets, parse_ensembles_toml, project_config_path, user_config_path};

use crate::budget::BudgetConfig;
use crate::catalog::{ModeCatalog, ReasoningMode};
use crate::error::{Error, Result};
use crate::plan::AgentType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// Reference to a mode by exactly one of id or taxonomy code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawModeRef", into = "RawModeRef")]
pub enum ModeRef {
    Id(String),
    Code(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawModeRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl TryFrom<RawModeRef> for ModeRef {
    type Error = Error;

    fn try_from(raw: RawModeRef) -> Result<Self> {
        match (raw.id, raw.code) {
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(code)) => Ok(Self::Code(code)),
            (Some(_), Some(_)) => Err(Error::config("mode ref sets both id and code")),
            (None, None) => Err(Error::config("mode ref sets neither id nor code")),
        }
    }
}

impl From<ModeRef> for RawModeRef {
    fn from(r: ModeRef) -> Self {
        match r {
            ModeRef::Id(id) => Self {
                id: Some(id),
                code: None,
            },
            ModeRef::Code(code) => Self {
                id: None,
                code: Some(code),
            },
        }
    }
}

impl ModeRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn code(code: impl Into<String>) -> Self {
        Self::Code(code.into())
    }

    /// Resolve against a catalog.
    pub fn resolve<'a>(&self, catalog: &'a ModeCatalog) -> Result<&'a ReasoningMode> {
        match self {
            Self::Id(id) => catalog
                .get(id)
                .ok_or_else(|| Error::config(format!("preset references unknown mode id: {}", id))),
            Self::Code(code) => catalog.get_by_code(code).ok_or_else(|| {
                Error::config(format!("preset references unknown mode code: {}", code))
            }),
        }
    }
}

impl fmt::Display for ModeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Code(code) => write!(f, "code:{}", code),
        }
    }
}

/// How the ensemble's outputs get combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "SynthesisConfig::default_strategy")]
    pub strategy: String,
    /// Mode driving the synthesizer agent, for strategies that need one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesizer_mode: Option<String>,
    #[serde(default = "SynthesisConfig::default_max_findings")]
    pub max_findings: usize,
    #[serde(default)]
    pub min_confidence: f64,
}

impl SynthesisConfig {
    fn default_strategy() -> String {
        "consensus".to_string()
    }

    fn default_max_findings() -> usize {
        10
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            strategy: Self::default_strategy(),
            synthesizer_mode: None,
            max_findings: Self::default_max_findings(),
            min_confidence: 0.0,
        }
    }
}

/// Context-pack cache behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_ttl_secs() -> u64 {
        3_600
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

/// Where a preset definition came from. Later sources shadow earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetSource {
    Embedded,
    User,
    Project,
}

impl fmt::Display for PresetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Embedded => "embedded",
            Self::User => "user",
            Self::Project => "project",
        };
        write!(f, "{}", s)
    }
}

/// A named ensemble recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePreset {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub modes: Vec<ModeRef>,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_distribution: Option<BTreeMap<AgentType, usize>>,
    #[serde(default)]
    pub allow_advanced: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub source: PresetSource,
}

impl EnsemblePreset {
    /// Check the preset against a catalog: every ref must resolve, and
    /// `allow_advanced = false` rejects any non-core mode.
    pub fn validate(&self, catalog: &ModeCatalog) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("preset with empty name"));
        }
        if self.modes.is_empty() {
            return Err(Error::config(format!("preset {}: no modes", self.name)));
        }
        for mode_ref in &self.modes {
            let mode = mode_ref.resolve(catalog)?;
            if !self.allow_advanced && !mode.tier.is_core() {
                return Err(Error::config(format!(
                    "preset {}: mode {} is {} tier but allow_advanced is false",
                    self.name, mode.id, mode.tier
                )));
            }
        }
        Ok(())
    }

    /// Resolve all refs into concrete mode ids, in preset order.
    pub fn resolve_mode_ids(&self, catalog: &ModeCatalog) -> Result<Vec<String>> {
        self.modes
            .iter()
            .map(|r| r.resolve(catalog).map(|m| m.id.clone()))
            .collect()
    }
}

/// Immutable, layered preset collection.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: Vec<EnsemblePreset>,
    by_name: HashMap<String, usize>,
}

impl PresetRegistry {
    /// Merge preset layers in precedence order (earliest lowest). Later
    /// layers override earlier ones by name. Every surviving preset is
    /// validated against the catalog.
    pub fn from_layers(
        layers: Vec<Vec<EnsemblePreset>>,
        catalog: &ModeCatalog,
    ) -> Result<Self> {
        let mut presets: Vec<EnsemblePreset> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for layer in layers {
            for preset in layer {
                match by_name.get(&preset.name) {
                    Some(&idx) => presets[idx] = preset,
                    None => {
                        by_name.insert(preset.name.clone(), presets.len());
                        presets.push(preset);
                    }
                }
            }
        }

        for preset in &presets {
            preset.validate(catalog)?;
        }

        Ok(Self { presets, by_name })
    }

    /// Load the embedded defaults layered under the user and project config
    /// files, where present.
    pub fn load(catalog: &ModeCatalog, project_dir: Option<&Path>) -> Result<Self> {
        let mut layers = vec![config::embedded_presets()?];

        if let Some(path) = user_config_path() {
            if path.is_file() {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
                layers.push(parse_ensembles_toml(&text, PresetSource::User)?);
            }
        }

        if let Some(dir) = project_dir {
            let path = project_config_path(dir);
            if path.is_file() {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
                layers.push(parse_ensembles_toml(&text, PresetSource::Project)?);
            }
        }

        Self::from_layers(layers, catalog)
    }

    pub fn get(&self, name: &str) -> Option<&EnsemblePreset> {
        self.by_name.get(name).map(|&idx| &self.presets[idx])
    }

    pub fn list(&self) -> &[EnsemblePreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use pretty_assertions::assert_eq;

    fn preset(name: &str, modes: Vec<ModeRef>, allow_advanced: bool) -> EnsemblePreset {
        EnsemblePreset {
            name: name.into(),
            display_name: name.into(),
            description: String::new(),
            modes,
            synthesis: SynthesisConfig::default(),
            budget: BudgetConfig::default(),
            cache: CacheConfig::default(),
            agent_distribution: None,
            allow_advanced,
            tags: vec![],
            source: PresetSource::Embedded,
        }
    }

    #[test]
    fn test_mode_ref_xor() {
        let json = r#"{"id": "deductive"}"#;
        let r: ModeRef = serde_json::from_str(json).unwrap();
        assert_eq!(r, ModeRef::id("deductive"));

        let json = r#"{"code": "A1"}"#;
        let r: ModeRef = serde_json::from_str(json).unwrap();
        assert_eq!(r, ModeRef::code("A1"));

        assert!(serde_json::from_str::<ModeRef>(r#"{"id": "a", "code": "A1"}"#).is_err());
        assert!(serde_json::from_str::<ModeRef>(r#"{}"#).is_err());
    }

    #[test]
    fn test_mode_ref_resolution() {
        let catalog = builtin_catalog();
        assert_eq!(
            ModeRef::code("b2").resolve(catalog).unwrap().id,
            "abductive"
        );
        assert!(ModeRef::id("missing").resolve(catalog).is_err());
        assert!(ModeRef::code("Z9").resolve(catalog).is_err());
    }

    #[test]
    fn test_allow_advanced_gate() {
        let catalog = builtin_catalog();
        let p = preset("strict", vec![ModeRef::id("game-theoretic")], false);
        let err = p.validate(catalog).unwrap_err();
        assert!(err.to_string().contains("allow_advanced"));

        let p = preset("loose", vec![ModeRef::id("game-theoretic")], true);
        assert!(p.validate(catalog).is_ok());
    }

    #[test]
    fn test_registry_layering_overrides_by_name() {
        let catalog = builtin_catalog();
        let base = preset("quick", vec![ModeRef::id("deductive")], false);
        let mut shadow = preset("quick", vec![ModeRef::id("abductive")], false);
        shadow.source = PresetSource::Project;

        let registry =
            PresetRegistry::from_layers(vec![vec![base], vec![shadow]], catalog).unwrap();
        assert_eq!(registry.len(), 1);
        let p = registry.get("quick").unwrap();
        assert_eq!(p.source, PresetSource::Project);
        assert_eq!(p.modes, vec![ModeRef::id("abductive")]);
    }

    #[test]
    fn test_embedded_presets_validate() {
        let registry = PresetRegistry::from_layers(
            vec![config::embedded_presets().unwrap()],
            builtin_catalog(),
        )
        .unwrap();
        assert!(!registry.is_empty());
        for p in registry.list() {
            assert_eq!(p.source, PresetSource::Embedded);
        }
    }
}
