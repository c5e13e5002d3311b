//! EPUB container reading and writing.

mod parser;
mod reader;
mod writer;

pub use parser::{ManifestItem, OpfData, parse_container_xml, parse_opf};
pub use reader::EpubContainer;
pub use writer::{
    WriterOptions, generate_identifier, write_epub, write_epub_to_writer, write_epub_with_options,
};
