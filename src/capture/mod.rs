//! Output capture: scraping pane scrollback into validated mode outputs.

mod ansi;
mod extract;

pub use ansi::strip_ansi;
pub use extract::extract_structured;

use crate::error::Result;
use crate::plan::{Pane, PaneRef};
use crate::schema::{parse_mode_output, ModeOutput};
use crate::session::ModeAssignment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default scrollback depth read from a pane.
pub const DEFAULT_SCROLLBACK_LINES: usize = 1_000;

/// Rough content class used to bias the token estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHint {
    Json,
    Markdown,
    Plain,
}

/// Cheap token estimate. The real tokenizer lives outside the core; this
/// only has to be stable and in the right ballpark for budget accounting.
pub fn estimate_tokens(text: &str, hint: ContentHint) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }
    let chars_per_token = match hint {
        // Structural punctuation tokenizes densely
        ContentHint::Json => 3.2,
        ContentHint::Markdown => 3.8,
        ContentHint::Plain => 4.0,
    };
    ((chars as f64) / chars_per_token).ceil() as usize
}

/// The external multiplexer, seen only as a pane I/O provider.
#[async_trait]
pub trait PaneProvider: Send + Sync {
    /// List the panes of a multiplexer session.
    async fn get_panes(&self, session_name: &str) -> Result<Vec<Pane>>;

    /// Read up to `lines` of scrollback from a pane.
    async fn capture_pane(&self, pane: &PaneRef, lines: usize) -> Result<String>;
}

/// One captured pane read, with whatever structure could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub mode_id: String,
    pub pane_name: String,
    /// ANSI-stripped scrollback text
    pub raw_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ModeOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,
    pub captured_at: DateTime<Utc>,
    pub line_count: usize,
    pub token_estimate: usize,
}

/// Capture and parse the output for one assignment.
///
/// I/O failure surfaces as an error; extraction and validation problems
/// are recorded on the returned capture so the session can continue.
pub async fn capture_assignment(
    provider: &dyn PaneProvider,
    assignment: &ModeAssignment,
    lines: usize,
) -> Result<CapturedOutput> {
    let pane_ref = PaneRef::Title(assignment.pane_name.clone());
    let scrollback = provider.capture_pane(&pane_ref, lines).await?;
    Ok(parse_capture(
        &assignment.mode_id,
        &assignment.pane_name,
        &scrollback,
    ))
}

/// Parse raw scrollback into a capture record.
pub fn parse_capture(mode_id: &str, pane_name: &str, scrollback: &str) -> CapturedOutput {
    let raw = strip_ansi(scrollback);
    let line_count = raw.lines().count();
    let mut parse_errors = Vec::new();

    let parsed = match extract_structured(&raw) {
        Some(doc) => match parse_mode_output(&doc) {
            Ok((output, field_errors)) => {
                parse_errors.extend(field_errors.iter().map(|e| e.to_string()));
                Some(output)
            }
            Err(e) => {
                parse_errors.push(e.to_string());
                None
            }
        },
        None => {
            if raw.trim().is_empty() {
                parse_errors.push("empty output".to_string());
            } else {
                parse_errors.push("no structured output found".to_string());
            }
            None
        }
    };

    let token_estimate = match &parsed {
        Some(output) => {
            let serialized = serde_json::to_string(output).unwrap_or_default();
            estimate_tokens(&serialized, ContentHint::Json)
        }
        None => estimate_tokens(&raw, ContentHint::Markdown),
    };

    debug!(
        mode = mode_id,
        pane = pane_name,
        lines = line_count,
        tokens = token_estimate,
        parsed = parsed.is_some(),
        "captured pane output"
    );

    CapturedOutput {
        mode_id: mode_id.to_string(),
        pane_name: pane_name.to_string(),
        raw_output: raw,
        parsed,
        parse_errors,
        captured_at: Utc::now(),
        line_count,
        token_estimate,
    }
}
