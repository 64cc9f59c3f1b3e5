//! Text and evidence similarity primitives for the merge engines.

use std::collections::BTreeSet;

/// Filler words excluded from token sets before comparison.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "of", "to", "in", "on",
    "for", "with", "and", "or", "but", "at", "by", "from", "as", "it", "its", "this", "that",
    "these", "those", "there", "has", "have", "had", "do", "does", "did", "will", "would",
    "can", "could", "may", "might", "shall",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lowercased, punctuation-free, stop-word-filtered token set.
pub fn normalize_tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !is_stop_word(t))
        .map(|t| t.to_string())
        .collect()
}

/// Jaccard index over two token sets. Two empty sets count as identical.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Jaccard over raw texts.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&normalize_tokens(a), &normalize_tokens(b))
}

/// Parsed `path[:line]` evidence pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidencePointer {
    pub path: String,
    pub line: Option<u32>,
}

impl EvidencePointer {
    /// Parse a pointer. A trailing `:<number>` is a line; anything else is
    /// all path.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some((path, line)) = raw.rsplit_once(':') {
            if let Ok(line) = line.trim().parse::<u32>() {
                return Some(Self {
                    path: path.trim().to_string(),
                    line: Some(line),
                });
            }
        }
        Some(Self {
            path: raw.to_string(),
            line: None,
        })
    }

    /// Canonical `path[:line]` form used as a grouping key.
    pub fn key(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}", self.path, line),
            None => self.path.clone(),
        }
    }
}

/// Proximity score between two optional evidence pointers.
pub fn evidence_proximity(a: Option<&str>, b: Option<&str>) -> f64 {
    let a = a.and_then(EvidencePointer::parse);
    let b = b.and_then(EvidencePointer::parse);

    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };

    if a == b {
        return 1.0;
    }
    if a.path != b.path {
        return 0.0;
    }
    match (a.line, b.line) {
        (Some(la), Some(lb)) => {
            let delta = la.abs_diff(lb);
            if delta <= 5 {
                0.9
            } else if delta <= 20 {
                0.7
            } else if delta <= 100 {
                0.3
            } else {
                0.1
            }
        }
        _ => 0.8,
    }
}

/// Relative weights of the two similarity axes; normalized to sum to one
/// before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub text: f64,
    pub evidence: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            text: 0.7,
            evidence: 0.3,
        }
    }
}

impl SimilarityWeights {
    fn normalized(&self) -> (f64, f64) {
        let sum = self.text + self.evidence;
        if sum <= 0.0 {
            return (0.5, 0.5);
        }
        (self.text / sum, self.evidence / sum)
    }

    /// Weighted average of text similarity and evidence proximity.
    pub fn combine(&self, text_sim: f64, evidence_sim: f64) -> f64 {
        let (wt, we) = self.normalized();
        text_sim * wt + evidence_sim * we
    }
}
