//! Structured block extraction from terminal scrollback.

/// A fenced code block with its declared language.
#[derive(Debug, Clone, PartialEq)]
struct FencedBlock {
    lang: String,
    body: String,
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            match current.take() {
                Some(block) => blocks.push(block),
                None => {
                    current = Some(FencedBlock {
                        lang: rest.trim().to_ascii_lowercase(),
                        body: String::new(),
                    });
                }
            }
            continue;
        }
        if let Some(block) = current.as_mut() {
            block.body.push_str(line);
            block.body.push('\n');
        }
    }

    // An unterminated block still counts; agents often get cut off
    // mid-scrollback.
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
}

/// Extract the structured document from captured scrollback.
///
/// Fenced blocks tagged `yaml` win: among them the longest one that parses
/// as YAML, otherwise the first. With no block at all, fall back to the
/// suffix starting at the first `thesis:` line.
pub fn extract_structured(text: &str) -> Option<String> {
    let yaml_blocks: Vec<FencedBlock> = fenced_blocks(text)
        .into_iter()
        .filter(|b| b.lang == "yaml" || b.lang == "yml")
        .collect();

    if !yaml_blocks.is_empty() {
        let best = yaml_blocks
            .iter()
            .filter(|b| serde_yaml::from_str::<serde_yaml::Value>(&b.body).is_ok())
            .max_by_key(|b| b.body.len());
        let chosen = best.unwrap_or(&yaml_blocks[0]);
        return Some(chosen.body.trim().to_string());
    }

    thesis_suffix(text)
}

/// The suffix of `text` starting at the first line whose trimmed form
/// begins `thesis:`.
fn thesis_suffix(text: &str) -> Option<String> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("thesis:") {
            return Some(text[offset..].trim().to_string());
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_yaml_block() {
        let text = "chatter\n```yaml\nthesis: t\nconfidence: 0.5\n```\nmore chatter";
        let doc = extract_structured(text).unwrap();
        assert_eq!(doc, "thesis: t\nconfidence: 0.5");
    }

    #[test]
    fn test_prefers_longest_parseable_yaml_block() {
        let text = "\
```yaml\nthesis: short\n```\n\
```yaml\nthesis: the much longer and complete document\nconfidence: 0.9\n```\n";
        let doc = extract_structured(text).unwrap();
        assert!(doc.contains("much longer"));
    }

    #[test]
    fn test_falls_back_to_first_block_when_none_parse() {
        let text = "```yaml\n{ not: [valid\n```\n```yaml\nalso: { broken\n```\n";
        let doc = extract_structured(text).unwrap();
        assert!(doc.contains("not"));
    }

    #[test]
    fn test_ignores_non_yaml_blocks() {
        let text = "```json\n{\"a\": 1}\n```\nthesis: fallback wins\nrest";
        let doc = extract_structured(text).unwrap();
        assert!(doc.starts_with("thesis: fallback wins"));
        assert!(doc.contains("rest"));
    }

    #[test]
    fn test_thesis_fallback_keeps_suffix() {
        let text = "preamble noise\n  thesis: indented\nconfidence: 0.4\n";
        let doc = extract_structured(text).unwrap();
        assert_eq!(doc, "thesis: indented\nconfidence: 0.4");
    }

    #[test]
    fn test_no_structure_found() {
        assert_eq!(extract_structured("just chatter, no document"), None);
    }

    #[test]
    fn test_unterminated_block_still_extracted() {
        let text = "```yaml\nthesis: cut off by scrollback\nconfidence: 0.3\n";
        let doc = extract_structured(text).unwrap();
        assert!(doc.contains("cut off"));
    }
}
