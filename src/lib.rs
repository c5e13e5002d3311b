//! # mdpub
//!
//! Bidirectional conversion between EPUB containers and Markdown, plus
//! text rewriting (e.g. translation) of Markdown that leaves its syntax
//! intact.
//!
//! ## Features
//!
//! - Read EPUB 2/3 containers: metadata, spine order, cover image
//! - Render XHTML chapters to Markdown and assemble one Markdown document
//! - Parse Markdown with frontmatter into chapters
//! - Write EPUB 2 containers with escaped XHTML chapters
//! - Rewrite only the human-readable text of a Markdown document
//!
//! ## Quick Start
//!
//! ```no_run
//! use mdpub::{MarkdownOptions, ParseOptions, epub_file_to_markdown_file, markdown_file_to_epub};
//!
//! // EPUB to Markdown (cover extracted into out/Images/)
//! epub_file_to_markdown_file("input.epub", "out/book.md", &MarkdownOptions::default())?;
//!
//! // and back
//! markdown_file_to_epub("out/book.md", "output.epub", &ParseOptions::default())?;
//! # Ok::<(), mdpub::Error>(())
//! ```
//!
//! ## Rewriting text
//!
//! ```
//! use std::convert::Infallible;
//!
//! use mdpub::rewrite_markdown;
//!
//! let out = rewrite_markdown("- see [docs](a_b.html) and `code`", |s: &str| {
//!     Ok::<_, Infallible>(s.to_uppercase())
//! })?;
//! assert_eq!(out, "- SEE [DOCS](a_b.html) AND `code`");
//! # Ok::<(), mdpub::RewriteError>(())
//! ```

pub mod book;
pub mod convert;
pub mod dom;
pub mod epub;
pub mod error;
pub mod markdown;
pub(crate) mod util;

pub use book::{Book, Chapter, Metadata, Section};
pub use convert::{
    MarkdownOptions, MarkdownOutput, epub_file_to_markdown_file, epub_to_markdown,
    markdown_file_to_epub, markdown_to_book, markdown_to_epub, markdown_to_epub_bytes,
    rewrite_markdown_file,
};
pub use epub::{EpubContainer, WriterOptions, write_epub, write_epub_to_writer};
pub use error::{BoxError, ContainerError, Error, ParseError, Result, RewriteError, WriteError};
pub use markdown::{
    BoilerplateSkip, CachedRewriter, MarkdownRewriter, ParseOptions, TextRewriter,
    html_to_markdown, markdown_to_xhtml, parse_markdown, render_markdown, rewrite_markdown,
};
