//! Mode preamble files.
//!
//! Each mode ships a `<id>.yaml` file whose `preamble` text is injected
//! into the agent before the question. The core does not render templates;
//! it loads the files and enforces the coverage contract: every core-tier
//! mode has a preamble containing the required sections, its identity
//! strings, the schema version, and fits the token cap.

use crate::capture::{estimate_tokens, ContentHint};
use crate::catalog::{ModeCatalog, ReasoningMode, Tier};
use crate::error::{Error, Result};
use crate::schema::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sections every preamble must contain, as literal substrings.
pub const REQUIRED_SECTIONS: [&str; 6] = [
    "## YOUR REASONING MODE",
    "### Approach",
    "### What You Produce",
    "### Best Applied To",
    "### Watch Out For (Failure Modes)",
    "### What Makes This Mode Unique",
];

/// Ceiling on a preamble's estimated token count.
pub const MAX_PREAMBLE_TOKENS: usize = 2_000;

/// On-disk preamble document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreambleFile {
    pub id: String,
    #[serde(default)]
    pub code: String,
    pub name: String,
    pub tier: Tier,
    pub preamble: String,
}

/// Path of the preamble file for a mode key.
pub fn preamble_path(dir: &Path, preamble_key: &str) -> PathBuf {
    dir.join(format!("{}.yaml", preamble_key))
}

/// Load one preamble file.
pub fn load_preamble(dir: &Path, preamble_key: &str) -> Result<PreambleFile> {
    let path = preamble_path(dir, preamble_key);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
    let file: PreambleFile = serde_yaml::from_str(&text)?;
    Ok(file)
}

/// Check one preamble against its mode's contract.
pub fn validate_preamble(file: &PreambleFile, mode: &ReasoningMode) -> Result<()> {
    for section in REQUIRED_SECTIONS {
        if !file.preamble.contains(section) {
            return Err(Error::config(format!(
                "preamble {}: missing section {:?}",
                mode.id, section
            )));
        }
    }

    if !file.preamble.contains(&mode.name) {
        return Err(Error::config(format!(
            "preamble {}: does not mention mode name {:?}",
            mode.id, mode.name
        )));
    }
    if let Some(code) = &mode.code {
        if !file.preamble.contains(&code.to_string()) {
            return Err(Error::config(format!(
                "preamble {}: does not mention code {}",
                mode.id, code
            )));
        }
    }
    let category = mode.category.to_string();
    if !file.preamble.contains(&category) {
        return Err(Error::config(format!(
            "preamble {}: does not mention category {}",
            mode.id, category
        )));
    }

    if !file.preamble.contains(SCHEMA_VERSION) {
        return Err(Error::config(format!(
            "preamble {}: missing schema version {}",
            mode.id, SCHEMA_VERSION
        )));
    }

    let tokens = estimate_tokens(&file.preamble, ContentHint::Markdown);
    if tokens >= MAX_PREAMBLE_TOKENS {
        return Err(Error::config(format!(
            "preamble {}: estimated {} tokens, cap is {}",
            mode.id, tokens, MAX_PREAMBLE_TOKENS
        )));
    }

    Ok(())
}

/// Verify that every core-tier mode in the catalog has a valid preamble
/// file under `dir`.
pub fn verify_coverage(dir: &Path, catalog: &ModeCatalog) -> Result<()> {
    for mode in catalog.by_tier(Tier::Core) {
        let file = load_preamble(dir, &mode.preamble_key)?;
        validate_preamble(&file, mode)?;
    }
    Ok(())
}
