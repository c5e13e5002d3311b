//! XHTML content document to Markdown.
//!
//! Walks the parsed tree depth-first, emitting Markdown as it goes.
//! Text nodes are trimmed; whitespace that separated them from their
//! neighbours survives as a single pending space, written only once more
//! visible text follows on the same line.

use super::escape::calculate_fence_length;
use crate::dom::{Arena, HtmlDocument, NodeData, NodeId};

/// Convert one content document to Markdown.
///
/// Returns an empty string when the document has no visible text.
/// `chapter_index` is used for diagnostics only.
///
/// # Example
///
/// ```
/// use mdpub::markdown::html_to_markdown;
///
/// let md = html_to_markdown("<h1>Title</h1><p>Some <em>text</em>.</p>", 1);
/// assert_eq!(md, "# Title\n\nSome *text*.");
/// ```
pub fn html_to_markdown(html: &str, chapter_index: usize) -> String {
    document_to_markdown(&HtmlDocument::parse(html), chapter_index)
}

/// Convert an already-parsed document to Markdown.
pub fn document_to_markdown(doc: &HtmlDocument, chapter_index: usize) -> String {
    let mut emitter = Emitter::new(doc.arena());
    emitter.children(doc.body(), 0);
    let markdown = emitter.finish();
    log::debug!(
        "chapter {chapter_index}: {} bytes of markdown",
        markdown.len()
    );
    markdown
}

struct Emitter<'a> {
    arena: &'a Arena,
    out: String,
    pending_space: bool,
    /// Set right after an opening marker; leading space is dropped.
    at_inline_open: bool,
    in_pre: bool,
}

impl<'a> Emitter<'a> {
    fn new(arena: &'a Arena) -> Self {
        Self {
            arena,
            out: String::new(),
            pending_space: false,
            at_inline_open: false,
            in_pre: false,
        }
    }

    fn finish(self) -> String {
        let mut result = String::with_capacity(self.out.len());
        let mut newlines = 0;
        for c in self.out.chars() {
            if c == '\n' {
                newlines += 1;
                if newlines > 2 {
                    continue;
                }
            } else {
                newlines = 0;
            }
            result.push(c);
        }
        result.trim().to_string()
    }

    fn children(&mut self, id: NodeId, depth: usize) {
        let arena = self.arena;
        for child in arena.children(id) {
            self.node(child, depth);
        }
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let arena = self.arena;
        let Some(node) = arena.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => self.text(text),
            NodeData::Element { name, .. } => self.element(id, name.local.as_ref(), depth),
            NodeData::Document | NodeData::Other => {}
        }
    }

    fn element(&mut self, id: NodeId, tag: &str, depth: usize) {
        let arena = self.arena;
        match tag {
            "head" | "script" | "style" | "title" => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.block_break();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.at_inline_open = true;
                self.children(id, depth);
                self.block_break();
            }
            "p" if depth > 0 => {
                self.pending_space = true;
                self.children(id, depth);
            }
            "p" => {
                self.block_break();
                self.children(id, depth);
                self.block_break();
            }
            "br" => {
                self.out.push_str("  \n");
                self.pending_space = false;
                self.at_inline_open = true;
            }
            "strong" | "b" => self.inline(id, "**", "**", depth),
            "em" | "i" => self.inline(id, "*", "*", depth),
            "code" if self.in_pre => self.children(id, depth),
            "code" => self.inline(id, "`", "`", depth),
            "pre" => self.preformatted(id),
            "blockquote" => self.blockquote(id, depth),
            "ul" => self.list(id, depth, false),
            "ol" => self.list(id, depth, true),
            "li" => self.list_item(id, depth.max(1), "- "),
            "a" => {
                let href = arena.attr(id, "href").unwrap_or_default();
                self.inline(id, "[", &format!("]({href})"), depth);
            }
            "img" => {
                let alt = arena.attr(id, "alt").unwrap_or_default();
                let src = arena.attr(id, "src").unwrap_or_default();
                self.flush_space();
                self.out.push_str(&format!("![{alt}]({src})"));
                self.at_inline_open = false;
            }
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            _ => self.children(id, depth),
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_pre {
            self.out.push_str(text);
            return;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            if !text.is_empty() {
                self.pending_space = true;
            }
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        self.flush_space();
        self.out.push_str(&words.join(" "));
        self.at_inline_open = false;
        self.pending_space = text.ends_with(char::is_whitespace);
    }

    fn inline(&mut self, id: NodeId, open: &str, close: &str, depth: usize) {
        self.flush_space();
        self.out.push_str(open);
        self.at_inline_open = true;
        self.children(id, depth);
        self.out.push_str(close);
        self.at_inline_open = false;
    }

    fn preformatted(&mut self, id: NodeId) {
        let mut inner = Emitter::new(self.arena);
        inner.in_pre = true;
        inner.children(id, 0);
        let code = inner.out.trim_matches('\n');
        let fence = "`".repeat(calculate_fence_length(code, '`'));

        self.block_break();
        self.out.push_str(&fence);
        self.out.push('\n');
        self.out.push_str(code);
        self.out.push('\n');
        self.out.push_str(&fence);
        self.block_break();
    }

    fn blockquote(&mut self, id: NodeId, depth: usize) {
        let mut inner = Emitter::new(self.arena);
        inner.children(id, depth);
        let quoted = inner.finish();
        if quoted.is_empty() {
            return;
        }

        self.block_break();
        let lines: Vec<String> = quoted
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect();
        self.out.push_str(&lines.join("\n"));
        self.block_break();
    }

    fn list(&mut self, id: NodeId, depth: usize, ordered: bool) {
        if depth == 0 {
            self.block_break();
        } else {
            self.line_break();
        }

        let arena = self.arena;
        let mut number = 0;
        for child in arena.children(id) {
            if arena.tag(child) == Some("li") {
                number += 1;
                let marker = if ordered {
                    format!("{number}. ")
                } else {
                    "- ".to_string()
                };
                self.list_item(child, depth + 1, &marker);
            } else {
                self.node(child, depth + 1);
            }
        }

        if depth == 0 {
            self.block_break();
        } else {
            self.line_break();
        }
    }

    fn list_item(&mut self, id: NodeId, depth: usize, marker: &str) {
        self.line_break();
        self.out.push_str(&"  ".repeat(depth.saturating_sub(1)));
        self.out.push_str(marker);
        self.at_inline_open = true;
        self.children(id, depth);
        self.line_break();
    }

    fn flush_space(&mut self) {
        if self.pending_space
            && !self.at_inline_open
            && !self.out.is_empty()
            && !self.out.ends_with([' ', '\n'])
        {
            self.out.push(' ');
        }
        self.pending_space = false;
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.pending_space = false;
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() {
            while !self.out.ends_with("\n\n") {
                self.out.push('\n');
            }
        }
        self.pending_space = false;
        self.at_inline_open = false;
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(body: &str) -> String {
        html_to_markdown(&format!("<html><body>{body}</body></html>"), 0)
    }

    #[test]
    fn test_headings_and_paragraphs() {
        assert_eq!(
            md("<h2>Part</h2><p>One.</p><p>Two.</p>"),
            "## Part\n\nOne.\n\nTwo."
        );
    }

    #[test]
    fn test_inline_spacing() {
        assert_eq!(
            md("<p>Some <strong>bold</strong> and <em>it </em>text</p>"),
            "Some **bold** and *it* text"
        );
        assert_eq!(md("<p>word<b>glued</b></p>"), "word**glued**");
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(md("<p>\n   many\n   lines   here\n</p>"), "many lines here");
    }

    #[test]
    fn test_links_and_images() {
        assert_eq!(
            md(r#"<p>See <a href="ch2.xhtml"> chapter two</a>.</p>"#),
            "See [chapter two](ch2.xhtml)."
        );
        assert_eq!(
            md(r#"<p><img src="i.png" alt="Pic"/></p>"#),
            "![Pic](i.png)"
        );
    }

    #[test]
    fn test_line_break() {
        assert_eq!(md("<p>one<br/>two</p>"), "one  \ntwo");
    }

    #[test]
    fn test_pre_keeps_raw_text() {
        assert_eq!(
            md("<pre><code>fn main() {\n    let a = 1 &lt; 2;\n}</code></pre>"),
            "```\nfn main() {\n    let a = 1 < 2;\n}\n```"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            md("<ul><li>a</li><li>b<ol><li>x</li><li>y</li></ol></li></ul>"),
            "- a\n- b\n  1. x\n  2. y"
        );
    }

    #[test]
    fn test_list_item_paragraphs() {
        assert_eq!(md("<ul>\n<li><p>para item</p></li>\n</ul>"), "- para item");
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            md("<blockquote><p>first</p><p>second</p></blockquote><p>after</p>"),
            "> first\n>\n> second\n\nafter"
        );
    }

    #[test]
    fn test_hidden_and_unknown_elements() {
        let html = "<html><head><title>T</title><style>p{}</style></head>\
                    <body><div><span>inside</span></div><script>x()</script></body></html>";
        assert_eq!(html_to_markdown(html, 3), "inside");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(md(""), "");
        assert_eq!(md("<div>  </div>"), "");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(md("<p>Tom &amp; Jerry</p>"), "Tom & Jerry");
    }
}
