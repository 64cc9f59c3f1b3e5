//! Parsing of synthesizer-agent replies.

use super::SynthesisResult;
use crate::error::{Error, Result};

/// Pull the fenced `json`/`yaml` block out of an agent reply, or fall back
/// to the whole document.
fn extract_document(text: &str) -> String {
    let mut in_block = false;
    let mut body = String::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            if in_block {
                return body;
            }
            let lang = rest.trim().to_ascii_lowercase();
            if lang == "json" || lang == "yaml" || lang == "yml" {
                in_block = true;
            }
            continue;
        }
        if in_block {
            body.push_str(line);
            body.push('\n');
        }
    }
    if in_block {
        // Unterminated block; keep what we have.
        return body;
    }
    text.to_string()
}

/// Parse and validate a synthesizer agent's reply into a
/// [`SynthesisResult`].
pub fn parse_synthesis_output(text: &str) -> Result<SynthesisResult> {
    let doc = extract_document(text);
    let doc = doc.trim();
    if doc.is_empty() {
        return Err(Error::synthesis("synthesizer reply is empty"));
    }

    let mut result: SynthesisResult = match serde_json::from_str(doc) {
        Ok(r) => r,
        Err(_) => serde_yaml::from_str(doc)
            .map_err(|e| Error::synthesis(format!("unparseable synthesizer reply: {}", e)))?,
    };

    if result.summary.trim().is_empty() {
        return Err(Error::synthesis("synthesizer reply has no summary"));
    }
    if !(0.0..=1.0).contains(&result.overall_confidence) {
        return Err(Error::synthesis(format!(
            "overall_confidence out of range: {}",
            result.overall_confidence
        )));
    }

    // Keep rankings deterministic even when the agent didn't sort.
    result
        .top_findings
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_fenced_json() {
        let reply = r#"
Here is my synthesis.

```json
{"summary": "retries need idempotency keys", "overall_confidence": 0.8}
```
"#;
        let result = parse_synthesis_output(reply).unwrap();
        assert_eq!(result.summary, "retries need idempotency keys");
        assert_eq!(result.overall_confidence, 0.8);
    }

    #[test]
    fn test_parses_fenced_yaml() {
        let reply = "```yaml\nsummary: the plan holds\noverall_confidence: 0.6\nopen_questions:\n  - what about rollback\n```";
        let result = parse_synthesis_output(reply).unwrap();
        assert_eq!(result.open_questions, vec!["what about rollback".to_string()]);
    }

    #[test]
    fn test_agent_findings_without_scores_accepted() {
        let reply = r#"```yaml
summary: keep the retry loop but add idempotency keys
overall_confidence: 0.75
top_findings:
  - text: retries re-post the full body
    confidence: 0.9
    modes: [deductive, abductive]
risks:
  - text: duplicate charges
    likelihood: 0.4
    impact: high
    mode_id: deductive
```"#;
        let result = parse_synthesis_output(reply).unwrap();
        assert_eq!(result.top_findings.len(), 1);
        assert_eq!(result.top_findings[0].score, 0.0);
        assert_eq!(result.risks[0].mode_id, "deductive");
    }

    #[test]
    fn test_bare_document_accepted() {
        let reply = "summary: bare yaml works\noverall_confidence: 0.5\n";
        let result = parse_synthesis_output(reply).unwrap();
        assert_eq!(result.summary, "bare yaml works");
    }

    #[test]
    fn test_missing_summary_rejected() {
        let reply = "```json\n{\"summary\": \"\", \"overall_confidence\": 0.5}\n```";
        assert!(parse_synthesis_output(reply).is_err());
    }

    #[test]
    fn test_unparseable_reply_rejected() {
        assert!(parse_synthesis_output("I could not decide, sorry.").is_err());
        assert!(parse_synthesis_output("").is_err());
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let reply = "```json\n{\"summary\": \"s\", \"overall_confidence\": 1.5}\n```";
        assert!(parse_synthesis_output(reply).is_err());
    }
}
