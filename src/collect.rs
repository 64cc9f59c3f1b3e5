//! Output collector: accumulates validated mode outputs and decides when
//! the ensemble has enough to synthesize.

use crate::capture::{extract_structured, CapturedOutput};
use crate::error::{Error, Result};
use crate::schema::{normalize_output, parse_mode_output, validate_output, ModeOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Acceptance policy for incoming outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// When true, an invalid output fails the add instead of being
    /// recorded and skipped
    pub require_all: bool,
    /// Minimum valid outputs before `collect` succeeds
    pub min_outputs: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            require_all: false,
            min_outputs: 1,
        }
    }
}

/// Result of a collection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub total_received: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Per-mode validation and parse errors
    pub errors: BTreeMap<String, Vec<String>>,
    /// Valid outputs in mode-id order
    pub outputs: Vec<ModeOutput>,
}

/// Accumulates mode outputs, keyed by mode id.
#[derive(Debug, Default)]
pub struct OutputCollector {
    config: CollectorConfig,
    outputs: BTreeMap<String, ModeOutput>,
    errors: BTreeMap<String, Vec<String>>,
    total_received: usize,
    invalid_received: usize,
}

impl OutputCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Add an output, normalizing and validating it first.
    pub fn add(&mut self, mut output: ModeOutput) -> Result<()> {
        self.total_received += 1;
        normalize_output(&mut output);
        let errors = validate_output(&output);

        if errors.is_empty() {
            self.outputs.insert(output.mode_id.clone(), output);
            return Ok(());
        }

        self.invalid_received += 1;
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        let mode_id = if output.mode_id.trim().is_empty() {
            "unknown".to_string()
        } else {
            output.mode_id.clone()
        };

        if self.config.require_all {
            return Err(Error::validation(mode_id, messages.join("; ")));
        }

        debug!(mode = %mode_id, errors = messages.len(), "recorded invalid output");
        self.errors.entry(mode_id).or_default().extend(messages);
        Ok(())
    }

    /// Extract and parse a raw text document for a mode, then add it.
    pub fn add_raw(&mut self, mode_id: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            self.total_received += 1;
            self.invalid_received += 1;
            if self.config.require_all {
                return Err(Error::validation(mode_id, "empty output"));
            }
            self.record_error(mode_id, "empty output");
            return Ok(());
        }

        let doc = extract_structured(text).unwrap_or_else(|| text.to_string());
        match parse_mode_output(&doc) {
            Ok((output, _field_errors)) => self.add(output),
            Err(e) => {
                self.total_received += 1;
                self.invalid_received += 1;
                if self.config.require_all {
                    return Err(Error::validation(mode_id, e.to_string()));
                }
                self.record_error(mode_id, e.to_string());
                Ok(())
            }
        }
    }

    /// Fold a batch of capture records into the collector. Parsed outputs
    /// are preferred; otherwise the raw text is re-parsed.
    pub fn collect_from_captures(&mut self, captures: &[CapturedOutput]) -> Result<()> {
        for capture in captures {
            match &capture.parsed {
                Some(output) => self.add(output.clone())?,
                None if capture.raw_output.trim().is_empty() => {
                    self.total_received += 1;
                    self.invalid_received += 1;
                    if self.config.require_all {
                        return Err(Error::validation(&capture.mode_id, "empty output"));
                    }
                    self.record_error(&capture.mode_id, "empty output");
                }
                None => self.add_raw(&capture.mode_id, &capture.raw_output)?,
            }
        }
        Ok(())
    }

    fn record_error(&mut self, mode_id: &str, message: impl Into<String>) {
        self.errors
            .entry(mode_id.to_string())
            .or_default()
            .push(message.into());
    }

    /// Number of valid outputs so far.
    pub fn valid_count(&self) -> usize {
        self.outputs.len()
    }

    /// True once enough valid outputs have arrived.
    pub fn has_enough(&self) -> bool {
        self.valid_count() >= self.config.min_outputs
    }

    /// Errors recorded per mode.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Finish collection. Fails when fewer than `min_outputs` valid
    /// outputs arrived.
    pub fn collect(&self) -> Result<CollectionResult> {
        if !self.has_enough() {
            return Err(Error::synthesis(format!(
                "insufficient valid outputs: {} collected, {} required",
                self.valid_count(),
                self.config.min_outputs
            )));
        }
        Ok(CollectionResult {
            total_received: self.total_received,
            valid_count: self.valid_count(),
            invalid_count: self.invalid_received,
            errors: self.errors.clone(),
            outputs: self.outputs.values().cloned().collect(),
        })
    }
}
