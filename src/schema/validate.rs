//! Normalization and field-level validation for mode outputs.

use super::ModeOutput;
use crate::catalog::validate_mode_id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validation problem tied to a field path, e.g.
/// `top_findings[2].confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Apply the schema's normalization rules in place.
///
/// Absent and zero confidences default to 0.5; explicit non-zero values are
/// kept as-is. The same rule applies to risk likelihoods.
pub fn normalize_output(output: &mut ModeOutput) {
    if output.confidence == 0.0 {
        output.confidence = 0.5;
    }
    for finding in &mut output.top_findings {
        if finding.confidence == 0.0 {
            finding.confidence = 0.5;
        }
    }
    for risk in &mut output.risks {
        if risk.likelihood == 0.0 {
            risk.likelihood = 0.5;
        }
    }
}

fn check_unit_range(errors: &mut Vec<FieldError>, path: String, value: f64, label: &str) {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        errors.push(FieldError::new(
            path,
            format!("{} must be within [0, 1], got {}", label, value),
        ));
    }
}

/// Validate a (normalized) output against schema v1.
///
/// Returns one error per problematic field; an empty vec means the output
/// is fully valid.
pub fn validate_output(output: &ModeOutput) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if output.mode_id.trim().is_empty() {
        errors.push(FieldError::new("mode_id", "mode_id is required"));
    } else if let Err(e) = validate_mode_id(&output.mode_id) {
        errors.push(FieldError::new("mode_id", e.to_string()));
    }

    if output.thesis.trim().is_empty() {
        errors.push(FieldError::new("thesis", "thesis must be non-empty"));
    }

    if output.top_findings.is_empty() {
        errors.push(FieldError::new(
            "top_findings",
            "at least one finding is required",
        ));
    }

    check_unit_range(&mut errors, "confidence".into(), output.confidence, "confidence");

    for (i, finding) in output.top_findings.iter().enumerate() {
        if finding.text.trim().is_empty() {
            errors.push(FieldError::new(
                format!("top_findings[{}].text", i),
                "finding text must be non-empty",
            ));
        }
        check_unit_range(
            &mut errors,
            format!("top_findings[{}].confidence", i),
            finding.confidence,
            "confidence",
        );
    }

    for (i, risk) in output.risks.iter().enumerate() {
        if risk.text.trim().is_empty() {
            errors.push(FieldError::new(
                format!("risks[{}].text", i),
                "risk text must be non-empty",
            ));
        }
        check_unit_range(
            &mut errors,
            format!("risks[{}].likelihood", i),
            risk.likelihood,
            "likelihood",
        );
    }

    for (i, rec) in output.recommendations.iter().enumerate() {
        if rec.text.trim().is_empty() {
            errors.push(FieldError::new(
                format!("recommendations[{}].text", i),
                "recommendation text must be non-empty",
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Finding, Risk};
    use pretty_assertions::assert_eq;

    fn valid_output() -> ModeOutput {
        let mut output = ModeOutput::new("deductive", "premises hold");
        output.confidence = 0.9;
        output
            .top_findings
            .push(Finding::new("finding one").with_confidence(0.8));
        output
    }

    #[test]
    fn test_valid_output_passes() {
        assert!(validate_output(&valid_output()).is_empty());
    }

    #[test]
    fn test_zero_confidence_normalizes_to_half() {
        let mut output = valid_output();
        output.confidence = 0.0;
        output.top_findings[0].confidence = 0.0;
        output.risks.push(Risk {
            text: "r".into(),
            likelihood: 0.0,
            impact: None,
            mitigation: None,
        });
        normalize_output(&mut output);
        assert_eq!(output.confidence, 0.5);
        assert_eq!(output.top_findings[0].confidence, 0.5);
        assert_eq!(output.risks[0].likelihood, 0.5);
    }

    #[test]
    fn test_normalize_keeps_explicit_values() {
        let mut output = valid_output();
        output.confidence = 0.3;
        normalize_output(&mut output);
        assert_eq!(output.confidence, 0.3);
    }

    #[test]
    fn test_missing_fields_reported_with_paths() {
        let mut output = ModeOutput::new("deductive", "");
        output.confidence = 1.5;
        let errors = validate_output(&output);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"thesis"));
        assert!(paths.contains(&"top_findings"));
        assert!(paths.contains(&"confidence"));
    }

    #[test]
    fn test_nested_field_paths() {
        let mut output = valid_output();
        output.top_findings.push(Finding::new("").with_confidence(2.0));
        let errors = validate_output(&output);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"top_findings[1].text"));
        assert!(paths.contains(&"top_findings[1].confidence"));
    }

    #[test]
    fn test_bad_mode_id_reported() {
        let mut output = valid_output();
        output.mode_id = "Not-Valid".into();
        let errors = validate_output(&output);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "mode_id");
    }
}
