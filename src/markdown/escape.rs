//! XML escaping and inline Markdown conversion.
//!
//! Escaping always runs before inline markup is recognised: the emphasis
//! and code patterns only ever see escaped text, so the tags they insert
//! are never themselves escaped and user text is never escaped twice.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

// Span contents exclude `<`: escaped text has none, so the only `<` a
// pattern can meet is a tag inserted by an earlier pass. Spans therefore
// nest inside earlier ones but never cross them.

/// Matches `***strong em***`
static BOLD_ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\*([^<]+?)\*\*\*").unwrap());

/// Matches `**strong**`
static BOLD_STARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^<]+?)\*\*").unwrap());

/// Matches `__strong__`
static BOLD_UNDERSCORES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__([^<]+?)__").unwrap());

/// Matches `*em*`
static ITALIC_STAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*<]+?)\*").unwrap());

/// Matches `_em_`
static ITALIC_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_<]+?)_").unwrap());

/// Matches `` `code` ``
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`<]+)`").unwrap());

/// Matches `[text](url)`; group 2 is the URL
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap());

/// Stand-ins for inline markers inside link URLs while the span passes
/// run. Escaped text never contains `&#`, so these cannot collide with
/// user text.
const URL_MARKERS: [(char, &str); 3] = [('_', "&#95;"), ('*', "&#42;"), ('`', "&#96;")];

/// Escape the five XML special characters.
///
/// # Examples
///
/// ```
/// use mdpub::markdown::escape_xml;
///
/// assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape text, then turn inline Markdown into XHTML tags.
///
/// Patterns apply in a fixed order: `***strong em***`, `**strong**`,
/// `__strong__`, `*em*`, `_em_`, then `` `code` ``. Unmatched markers stay
/// as literal text. Links keep their Markdown syntax; the URL of
/// `[text](url)` is escaped but never converted.
///
/// # Examples
///
/// ```
/// use mdpub::markdown::convert_inline;
///
/// assert_eq!(
///     convert_inline("**<b>** & *it*"),
///     "<strong>&lt;b&gt;</strong> &amp; <em>it</em>"
/// );
/// ```
pub fn convert_inline(text: &str) -> String {
    let escaped = escape_xml(text);
    let protected = LINK_RE.replace_all(&escaped, |caps: &Captures<'_>| {
        format!("[{}]({})", &caps[1], hide_markers(&caps[2]))
    });
    let html = BOLD_ITALIC_RE.replace_all(&protected, "<strong><em>${1}</em></strong>");
    let html = BOLD_STARS_RE.replace_all(&html, "<strong>${1}</strong>");
    let html = BOLD_UNDERSCORES_RE.replace_all(&html, "<strong>${1}</strong>");
    let html = ITALIC_STAR_RE.replace_all(&html, "<em>${1}</em>");
    let html = ITALIC_UNDERSCORE_RE.replace_all(&html, "<em>${1}</em>");
    let html = INLINE_CODE_RE.replace_all(&html, "<code>${1}</code>");
    restore_markers(&html)
}

fn hide_markers(url: &str) -> String {
    URL_MARKERS
        .iter()
        .fold(url.to_string(), |acc, (marker, stand_in)| acc.replace(*marker, stand_in))
}

fn restore_markers(html: &str) -> String {
    URL_MARKERS
        .iter()
        .fold(html.to_string(), |acc, (marker, stand_in)| acc.replace(stand_in, &marker.to_string()))
}

/// Calculate the minimum fence length needed for a code block.
///
/// Returns the smallest number of fence characters (at least 3) that
/// doesn't appear as a run in the content.
///
/// # Examples
///
/// ```
/// use mdpub::markdown::calculate_fence_length;
///
/// assert_eq!(calculate_fence_length("let x = 1;", '`'), 3);
/// assert_eq!(calculate_fence_length("```rust\ncode\n```", '`'), 4);
/// ```
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for c in content.chars() {
        if c == fence_char {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run.max(2) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_leaves_plain_text() {
        assert_eq!(escape_xml("plain text"), "plain text");
        assert_eq!(escape_xml(""), "");
    }

    #[test]
    fn test_inline_bold_wraps_escaped_content() {
        assert_eq!(
            convert_inline("Text with **<bold>** & more"),
            "Text with <strong>&lt;bold&gt;</strong> &amp; more"
        );
    }

    #[test]
    fn test_inline_no_double_escape() {
        let html = convert_inline("AT&T");
        assert_eq!(html, "AT&amp;T");
        assert!(!html.contains("&amp;amp;"));
    }

    #[test]
    fn test_inline_variants() {
        assert_eq!(convert_inline("__b__"), "<strong>b</strong>");
        assert_eq!(convert_inline("*i*"), "<em>i</em>");
        assert_eq!(convert_inline("_i_"), "<em>i</em>");
        assert_eq!(convert_inline("`x < y`"), "<code>x &lt; y</code>");
        assert_eq!(
            convert_inline("**bold** and *it*"),
            "<strong>bold</strong> and <em>it</em>"
        );
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(convert_inline("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(convert_inline("**open"), "**open");
        assert_eq!(convert_inline("a ` b"), "a ` b");
    }

    #[test]
    fn test_triple_stars_nest() {
        assert_eq!(convert_inline("***x***"), "<strong><em>x</em></strong>");
        assert_eq!(
            convert_inline("**a *b* c**"),
            "<strong>a <em>b</em> c</strong>"
        );
    }

    #[test]
    fn test_overlapping_spans_never_cross() {
        let html = convert_inline("**a *b** c*");
        assert_eq!(html, "<strong>a *b</strong> c*");
        let html = convert_inline("_a `b_ c`");
        assert_eq!(html, "<em>a `b</em> c`");
    }

    #[test]
    fn test_link_url_only_escaped() {
        assert_eq!(
            convert_inline("see [a_b](http://a.com/x_y_z?q=*1*&r=`2`)"),
            "see [a_b](http://a.com/x_y_z?q=*1*&amp;r=`2`)"
        );
        assert_eq!(
            convert_inline("[**bold** link](http://a.com/_x_)"),
            "[<strong>bold</strong> link](http://a.com/_x_)"
        );
    }

    #[test]
    fn test_fence_length_multiple_runs() {
        assert_eq!(calculate_fence_length("``", '`'), 3);
        assert_eq!(calculate_fence_length("`` and ```", '`'), 4);
    }
}
