//! Markdown in both directions.
//!
//! - `from_html`: XHTML content document → Markdown chapter
//! - `document`: [`Book`](crate::Book) of Markdown chapters → one Markdown file
//! - `parser`: Markdown file → [`Book`](crate::Book)
//! - `to_xhtml`: Markdown chapter body → XHTML body fragment
//! - `rewrite`: text-only rewriting that keeps Markdown syntax intact
//!
//! `line` holds the line-shape classifier the last three share.

mod document;
mod escape;
mod from_html;
mod line;
mod parser;
mod rewrite;
mod to_xhtml;

pub use document::render_markdown;
pub use escape::{calculate_fence_length, convert_inline, escape_xml};
pub use from_html::{document_to_markdown, html_to_markdown};
pub use line::{LineKind, is_rule};
pub use parser::{
    BoilerplateSkip, MarkdownParser, ParseOptions, ParsedMarkdown, parse_markdown,
    parse_markdown_reader, parse_markdown_with,
};
pub use rewrite::{CachedRewriter, MarkdownRewriter, TextRewriter, rewrite_markdown};
pub use to_xhtml::markdown_to_xhtml;
