//! Line-shape classification shared by the parser, the XHTML renderer and
//! the rewriter.
//!
//! Each kind keeps its syntax `prefix` (indentation, markers and the
//! spacing after them) separate from the text it introduces, so callers
//! can replace the text and reassemble the line byte-for-byte.

use std::sync::LazyLock;

use regex_lite::Regex;

/// `#` to `######` followed by whitespace or end of line
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*(#{1,6})(?:\s+|$))(.*)$").unwrap());

/// `- item`, `* item`, `+ item` or `1. item`
static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((\s*)([-*+]|\d+\.)\s+)(\S.*)$").unwrap());

/// One or more `>` markers
static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*>+\s*)(.*)$").unwrap());

/// Inline image `![alt](src)`
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// Opening or closing code fence of `ticks` backticks.
    Fence { ticks: usize, info: &'a str },
    Rule,
    Heading {
        level: usize,
        prefix: &'a str,
        text: &'a str,
    },
    ListItem {
        prefix: &'a str,
        indent: usize,
        ordered: bool,
        text: &'a str,
    },
    Quote { prefix: &'a str, text: &'a str },
    Plain(&'a str),
}

impl<'a> LineKind<'a> {
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineKind::Blank;
        }

        if trimmed.starts_with("```") {
            let ticks = trimmed.chars().take_while(|&c| c == '`').count();
            return LineKind::Fence {
                ticks,
                info: trimmed[ticks..].trim(),
            };
        }

        if is_rule(trimmed) {
            return LineKind::Rule;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            let (Some(prefix), Some(hashes), Some(text)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                return LineKind::Plain(line);
            };
            return LineKind::Heading {
                level: hashes.as_str().len(),
                prefix: prefix.as_str(),
                text: text.as_str(),
            };
        }

        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            let (Some(prefix), Some(indent), Some(marker), Some(text)) =
                (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
            else {
                return LineKind::Plain(line);
            };
            return LineKind::ListItem {
                prefix: prefix.as_str(),
                indent: indent.as_str().chars().map(indent_width).sum(),
                ordered: marker.as_str().ends_with('.'),
                text: text.as_str(),
            };
        }

        if let Some(caps) = QUOTE_RE.captures(line)
            && let (Some(prefix), Some(text)) = (caps.get(1), caps.get(2))
        {
            return LineKind::Quote {
                prefix: prefix.as_str(),
                text: text.as_str(),
            };
        }

        LineKind::Plain(line)
    }
}

/// Three or more of the same rule character (`-`, `*` or `_`) and nothing else.
pub fn is_rule(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && trimmed.len() >= 3 && chars.all(|c| c == first)
}

/// Whether the text contains an inline image.
pub fn contains_image(text: &str) -> bool {
    IMAGE_RE.is_match(text)
}

/// Closing fence for an opening fence of `ticks` backticks.
pub fn closes_fence(line: &str, ticks: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= ticks && trimmed.chars().all(|c| c == '`')
}

fn indent_width(c: char) -> usize {
    if c == '\t' { 4 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings() {
        assert_eq!(
            LineKind::classify("## Chapter Two"),
            LineKind::Heading {
                level: 2,
                prefix: "## ",
                text: "Chapter Two"
            }
        );
        assert!(matches!(
            LineKind::classify("###### Six"),
            LineKind::Heading { level: 6, .. }
        ));
        assert_eq!(LineKind::classify("####### Seven"), LineKind::Plain("####### Seven"));
        assert_eq!(LineKind::classify("#hashtag"), LineKind::Plain("#hashtag"));
        assert!(matches!(
            LineKind::classify("#"),
            LineKind::Heading { level: 1, text: "", .. }
        ));
    }

    #[test]
    fn test_rules() {
        assert!(is_rule("---"));
        assert!(is_rule("*****"));
        assert!(is_rule("___"));
        assert!(!is_rule("--"));
        assert!(!is_rule("-*-"));
        assert!(!is_rule("--- x"));
        assert_eq!(LineKind::classify("  ---  "), LineKind::Rule);
    }

    #[test]
    fn test_list_items() {
        assert_eq!(
            LineKind::classify("  - nested item"),
            LineKind::ListItem {
                prefix: "  - ",
                indent: 2,
                ordered: false,
                text: "nested item"
            }
        );
        assert!(matches!(
            LineKind::classify("12. twelfth"),
            LineKind::ListItem {
                ordered: true,
                text: "twelfth",
                ..
            }
        ));
        // Emphasis at line start is not a bullet
        assert_eq!(LineKind::classify("**bold** start"), LineKind::Plain("**bold** start"));
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            LineKind::classify("> quoted"),
            LineKind::Quote {
                prefix: "> ",
                text: "quoted"
            }
        );
        assert_eq!(
            LineKind::classify(">"),
            LineKind::Quote {
                prefix: ">",
                text: ""
            }
        );
    }

    #[test]
    fn test_fences() {
        assert_eq!(
            LineKind::classify("```rust"),
            LineKind::Fence {
                ticks: 3,
                info: "rust"
            }
        );
        assert!(closes_fence("```", 3));
        assert!(closes_fence("`````", 4));
        assert!(!closes_fence("```", 4));
        assert!(!closes_fence("``` x", 3));
    }

    #[test]
    fn test_images() {
        assert!(contains_image("see ![cover](Images/cover.jpg)"));
        assert!(!contains_image("[link](x.html)"));
    }
}
