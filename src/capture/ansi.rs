//! Terminal escape stripping.

use regex::Regex;
use std::sync::OnceLock;

fn escape_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CSI sequences, OSC sequences (BEL or ST terminated), and lone
        // two-byte escapes.
        Regex::new(
            r"\x1b\[[0-9;:?]*[\x20-\x2f]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]",
        )
        .expect("escape pattern is valid")
    })
}

/// Remove ANSI escape sequences and carriage returns from captured
/// scrollback.
pub fn strip_ansi(text: &str) -> String {
    let stripped = escape_pattern().replace_all(text, "");
    stripped.replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_color_codes() {
        let input = "\x1b[1;32mthesis:\x1b[0m all good";
        assert_eq!(strip_ansi(input), "thesis: all good");
    }

    #[test]
    fn test_strips_osc_title() {
        let input = "\x1b]0;pane-title\x07output";
        assert_eq!(strip_ansi(input), "output");
    }

    #[test]
    fn test_strips_cursor_movement() {
        let input = "a\x1b[2Jb\x1b[Hc\r\n";
        assert_eq!(strip_ansi(input), "abc\n");
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "plain text\nwith lines";
        assert_eq!(strip_ansi(input), input);
    }
}
