//! Markdown chapter body to XHTML body fragment.

use super::escape::{convert_inline, escape_xml};
use super::line::{LineKind, closes_fence};

/// Render a chapter's Markdown body as an XHTML fragment.
///
/// Block handling:
/// - `#`..`######` headings become `<h1>`..`<h6>`
/// - consecutive text lines join into one `<p>`; a line ending in two
///   spaces becomes a `<br/>`
/// - fenced code is copied verbatim (escaped only) into `<pre><code>`
/// - `>` lines group into one `<blockquote>`
/// - list items nest by indentation into `<ul>`/`<ol>`
/// - `---`, `***` and `___` become `<hr/>`
///
/// Every text run is escaped before inline markup is applied.
pub fn markdown_to_xhtml(markdown: &str) -> String {
    let mut renderer = XhtmlRenderer::default();
    for line in markdown.lines() {
        renderer.push_line(line);
    }
    renderer.finish()
}

#[derive(Default)]
struct XhtmlRenderer {
    out: String,
    paragraph: Vec<String>,
    quote: Vec<String>,
    lists: Vec<OpenList>,
    code: Option<OpenFence>,
}

struct OpenList {
    ordered: bool,
    indent: usize,
}

struct OpenFence {
    ticks: usize,
    lines: Vec<String>,
}

impl XhtmlRenderer {
    fn push_line(&mut self, line: &str) {
        if let Some(fence) = &mut self.code {
            if closes_fence(line, fence.ticks) {
                self.close_code();
            } else {
                fence.lines.push(line.to_string());
            }
            return;
        }

        match LineKind::classify(line) {
            LineKind::Blank => self.flush(),
            LineKind::Fence { ticks, .. } => {
                self.flush();
                self.code = Some(OpenFence {
                    ticks,
                    lines: Vec::new(),
                });
            }
            LineKind::Rule => {
                self.flush();
                self.out.push_str("<hr/>\n");
            }
            LineKind::Heading { level, text, .. } if !text.trim().is_empty() => {
                self.flush();
                self.out.push_str(&format!(
                    "<h{level}>{}</h{level}>\n",
                    convert_inline(text.trim())
                ));
            }
            LineKind::ListItem {
                indent,
                ordered,
                text,
                ..
            } => {
                self.flush_paragraph();
                self.flush_quote();
                self.list_item(indent, ordered, text.trim());
            }
            LineKind::Quote { text, .. } => {
                self.flush_paragraph();
                self.flush_lists();
                self.quote.push(text.to_string());
            }
            LineKind::Heading { .. } | LineKind::Plain(_) => {
                self.flush_quote();
                self.flush_lists();
                self.paragraph.push(line.to_string());
            }
        }
    }

    fn finish(mut self) -> String {
        if self.code.is_some() {
            log::warn!("unterminated code fence closed at end of chapter");
            self.close_code();
        }
        self.flush();
        self.out
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_quote();
        self.flush_lists();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.paragraph);
        self.out.push_str("<p>");
        self.out.push_str(&render_paragraph(&lines));
        self.out.push_str("</p>\n");
    }

    fn flush_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.quote);
        self.out.push_str("<blockquote>\n");
        for block in lines.split(|l| l.trim().is_empty()) {
            if !block.is_empty() {
                self.out.push_str("<p>");
                self.out.push_str(&render_paragraph(block));
                self.out.push_str("</p>\n");
            }
        }
        self.out.push_str("</blockquote>\n");
    }

    fn flush_lists(&mut self) {
        while let Some(list) = self.lists.pop() {
            self.out.push_str("</li>\n");
            self.out.push_str(list_close(list.ordered));
        }
    }

    fn list_item(&mut self, indent: usize, ordered: bool, text: &str) {
        while self.lists.last().is_some_and(|l| l.indent > indent) {
            if let Some(list) = self.lists.pop() {
                self.out.push_str("</li>\n");
                self.out.push_str(list_close(list.ordered));
            }
        }

        match self.lists.last() {
            Some(top) if top.indent == indent && top.ordered == ordered => {
                self.out.push_str("</li>\n");
            }
            Some(top) if top.indent == indent => {
                // Same level, other list type: end this list and start a new one
                self.out.push_str("</li>\n");
                self.out.push_str(list_close(top.ordered));
                self.lists.pop();
                self.open_list(indent, ordered);
            }
            _ => self.open_list(indent, ordered),
        }

        self.out.push_str("<li>");
        self.out.push_str(&convert_inline(text));
    }

    fn open_list(&mut self, indent: usize, ordered: bool) {
        if !self.lists.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(if ordered { "<ol>\n" } else { "<ul>\n" });
        self.lists.push(OpenList { ordered, indent });
    }

    fn close_code(&mut self) {
        let Some(fence) = self.code.take() else {
            return;
        };
        self.out.push_str("<pre><code>");
        self.out.push_str(&escape_xml(&fence.lines.join("\n")));
        self.out.push_str("</code></pre>\n");
    }
}

fn list_close(ordered: bool) -> &'static str {
    if ordered { "</ol>\n" } else { "</ul>\n" }
}

/// Join paragraph lines with spaces, or hard breaks after two trailing spaces.
fn render_paragraph<S: AsRef<str>>(lines: &[S]) -> String {
    let mut joined = String::new();
    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        joined.push_str(line.trim());
        if idx + 1 < lines.len() {
            joined.push(if line.ends_with("  ") { '\n' } else { ' ' });
        }
    }
    convert_inline(&joined).replace('\n', "<br/>\n")
}
