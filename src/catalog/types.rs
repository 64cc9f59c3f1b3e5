//! Core types for the reasoning mode taxonomy.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reasoning category taxonomy. Closed set of twelve, each bound to a
/// fixed taxonomy letter (Formal=A through Meta=L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Formal,
    Ampliative,
    Uncertainty,
    Vagueness,
    Change,
    Causal,
    Practical,
    Strategic,
    Dialectical,
    Modal,
    Domain,
    Meta,
}

impl Category {
    /// All categories in taxonomy-letter order.
    pub const ALL: [Category; 12] = [
        Self::Formal,
        Self::Ampliative,
        Self::Uncertainty,
        Self::Vagueness,
        Self::Change,
        Self::Causal,
        Self::Practical,
        Self::Strategic,
        Self::Dialectical,
        Self::Modal,
        Self::Domain,
        Self::Meta,
    ];

    /// The taxonomy letter for this category.
    pub fn letter(&self) -> char {
        match self {
            Self::Formal => 'A',
            Self::Ampliative => 'B',
            Self::Uncertainty => 'C',
            Self::Vagueness => 'D',
            Self::Change => 'E',
            Self::Causal => 'F',
            Self::Practical => 'G',
            Self::Strategic => 'H',
            Self::Dialectical => 'I',
            Self::Modal => 'J',
            Self::Domain => 'K',
            Self::Meta => 'L',
        }
    }

    /// Resolve a category from its taxonomy letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Self> {
        let idx = (letter.to_ascii_uppercase() as i32) - ('A' as i32);
        if (0..12).contains(&idx) {
            Some(Self::ALL[idx as usize])
        } else {
            None
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Formal => "Formal",
            Self::Ampliative => "Ampliative",
            Self::Uncertainty => "Uncertainty",
            Self::Vagueness => "Vagueness",
            Self::Change => "Change",
            Self::Causal => "Causal",
            Self::Practical => "Practical",
            Self::Strategic => "Strategic",
            Self::Dialectical => "Dialectical",
            Self::Modal => "Modal",
            Self::Domain => "Domain",
            Self::Meta => "Meta",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "formal" => Ok(Self::Formal),
            "ampliative" => Ok(Self::Ampliative),
            "uncertainty" => Ok(Self::Uncertainty),
            "vagueness" => Ok(Self::Vagueness),
            "change" => Ok(Self::Change),
            "causal" => Ok(Self::Causal),
            "practical" => Ok(Self::Practical),
            "strategic" => Ok(Self::Strategic),
            "dialectical" => Ok(Self::Dialectical),
            "modal" => Ok(Self::Modal),
            "domain" => Ok(Self::Domain),
            "meta" => Ok(Self::Meta),
            other => Err(Error::config(format!("unknown category: {}", other))),
        }
    }
}

/// Maturity tier of a reasoning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Core,
    Advanced,
    Experimental,
}

impl Tier {
    pub fn is_core(&self) -> bool {
        matches!(self, Self::Core)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Core => "core",
            Self::Advanced => "advanced",
            Self::Experimental => "experimental",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "advanced" => Ok(Self::Advanced),
            "experimental" => Ok(Self::Experimental),
            other => Err(Error::config(format!("unknown tier: {}", other))),
        }
    }
}

/// Taxonomy code: category letter plus a positive ordinal, e.g. `A1`, `K12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeCode {
    pub letter: char,
    pub number: u32,
}

impl ModeCode {
    /// Construct a code, validating the letter range and ordinal.
    pub fn new(letter: char, number: u32) -> Result<Self> {
        let upper = letter.to_ascii_uppercase();
        if Category::from_letter(upper).is_none() {
            return Err(Error::config(format!(
                "code letter must be A-L, got '{}'",
                letter
            )));
        }
        if number == 0 {
            return Err(Error::config("code number must be positive"));
        }
        Ok(Self {
            letter: upper,
            number,
        })
    }

    /// The category implied by this code's letter.
    pub fn category(&self) -> Category {
        // Letter range enforced at construction
        Category::from_letter(self.letter).unwrap_or(Category::Formal)
    }
}

impl fmt::Display for ModeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

impl FromStr for ModeCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| Error::config("empty mode code"))?;
        let rest: String = chars.collect();
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::config(format!("invalid mode code: {}", s)));
        }
        let number: u32 = rest
            .parse()
            .map_err(|_| Error::config(format!("invalid mode code number: {}", s)))?;
        Self::new(letter, number)
    }
}

impl Serialize for ModeCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModeCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hints for rendering a mode in user interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiHints {
    /// Short label for pane titles and list rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Accent color name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Glyph shown next to the mode name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A reasoning mode: a named recipe that instructs an agent how to think.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningMode {
    /// Stable identifier: lowercase alphanumeric plus hyphens, starts with a
    /// letter, at most 64 chars
    pub id: String,
    /// Optional taxonomy code; its letter must match the category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ModeCode>,
    /// Human-readable name
    pub name: String,
    pub category: Category,
    pub tier: Tier,
    /// One-line description
    pub short_desc: String,
    /// Full description
    #[serde(default)]
    pub description: String,
    /// Problem shapes this mode excels at
    #[serde(default)]
    pub best_for: Vec<String>,
    /// Known ways this mode goes wrong
    #[serde(default)]
    pub failure_modes: Vec<String>,
    /// What separates this mode from its neighbors
    #[serde(default)]
    pub differentiator: String,
    /// Key used to locate the mode's preamble file
    #[serde(default)]
    pub preamble_key: String,
    #[serde(default)]
    pub ui: UiHints,
}

impl ReasoningMode {
    /// Check structural validity: id format and code/category agreement.
    pub fn validate(&self) -> Result<()> {
        validate_mode_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(Error::config(format!("mode {}: empty name", self.id)));
        }
        if let Some(code) = &self.code {
            if code.category() != self.category {
                return Err(Error::config(format!(
                    "mode {}: code {} letter does not match category {} (expected {})",
                    self.id,
                    code,
                    self.category,
                    self.category.letter()
                )));
            }
        }
        Ok(())
    }
}

/// Validate a mode identifier: lowercase alphanumeric plus hyphens, must
/// start with a letter, at most 64 characters.
pub fn validate_mode_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::config("mode id is empty"));
    }
    if id.len() > 64 {
        return Err(Error::config(format!(
            "mode id too long ({} chars): {}",
            id.len(),
            id
        )));
    }
    let mut chars = id.chars();
    let first = chars.next().unwrap_or('-');
    if !first.is_ascii_lowercase() {
        return Err(Error::config(format!(
            "mode id must start with a lowercase letter: {}",
            id
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::config(format!(
            "mode id may only contain lowercase alphanumerics and hyphens: {}",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_letter_bijection() {
        for (i, cat) in Category::ALL.iter().enumerate() {
            let letter = cat.letter();
            assert_eq!(letter, (b'A' + i as u8) as char);
            assert_eq!(Category::from_letter(letter), Some(*cat));
            assert_eq!(Category::from_letter(letter.to_ascii_lowercase()), Some(*cat));
        }
        assert_eq!(Category::from_letter('M'), None);
        assert_eq!(Category::Formal.letter(), 'A');
        assert_eq!(Category::Meta.letter(), 'L');
    }

    #[test]
    fn test_mode_code_parse() {
        let code: ModeCode = "a1".parse().unwrap();
        assert_eq!(code.letter, 'A');
        assert_eq!(code.number, 1);
        assert_eq!(code.to_string(), "A1");
        assert_eq!(code.category(), Category::Formal);

        assert!("A0".parse::<ModeCode>().is_err());
        assert!("Z1".parse::<ModeCode>().is_err());
        assert!("A".parse::<ModeCode>().is_err());
        assert!("1A".parse::<ModeCode>().is_err());
    }

    #[test]
    fn test_mode_id_validation() {
        assert!(validate_mode_id("deductive").is_ok());
        assert!(validate_mode_id("game-theoretic-2").is_ok());
        assert!(validate_mode_id("").is_err());
        assert!(validate_mode_id("2fast").is_err());
        assert!(validate_mode_id("Upper").is_err());
        assert!(validate_mode_id("has_underscore").is_err());
        assert!(validate_mode_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_mode_validate_code_category_agreement() {
        let mut mode = ReasoningMode {
            id: "deductive".into(),
            code: Some(ModeCode::new('A', 1).unwrap()),
            name: "Deductive".into(),
            category: Category::Formal,
            tier: Tier::Core,
            short_desc: "From premises to conclusions".into(),
            description: String::new(),
            best_for: vec![],
            failure_modes: vec![],
            differentiator: String::new(),
            preamble_key: "deductive".into(),
            ui: UiHints::default(),
        };
        assert!(mode.validate().is_ok());

        mode.category = Category::Causal;
        assert!(mode.validate().is_err());
    }
}
