//! Lenient HTML/XHTML parsing into an arena tree.
//!
//! Content documents are parsed with html5ever's HTML tree builder, so
//! malformed markup (unclosed tags, stray entities, missing `<body>`) is
//! recovered the way a browser would rather than rejected.

mod arena;
mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{Arena, Attribute, Children, Node, NodeData, NodeId};
pub use tree_sink::ArenaSink;

/// A parsed content document.
pub struct HtmlDocument {
    arena: Arena,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let sink = parse_document(ArenaSink::new(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes());
        Self {
            arena: sink.into_arena(),
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The `<body>` element, or the document root if none was produced.
    pub fn body(&self) -> NodeId {
        self.arena
            .find_by_tag("body")
            .unwrap_or_else(|| self.arena.document())
    }
}
