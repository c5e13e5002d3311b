//! End-to-end conversions built from the reader, renderers, parser and
//! writer, in memory and file to file.

use std::fs;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use crate::book::{Book, Chapter};
use crate::epub::{EpubContainer, write_epub, write_epub_to_writer};
use crate::error::{Error, ParseError, Result};
use crate::markdown::{
    LineKind, MarkdownRewriter, ParseOptions, TextRewriter, html_to_markdown, parse_markdown_reader,
    parse_markdown_with, render_markdown,
};

/// Options for the EPUB → Markdown direction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkdownOptions {
    /// Extract the cover image and reference it from the frontmatter.
    pub extract_cover: bool,
    /// Directory, relative to the Markdown file, that receives the cover.
    pub images_dir: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            extract_cover: true,
            images_dir: "Images".to_string(),
        }
    }
}

impl MarkdownOptions {
    pub fn with_images_dir(mut self, dir: impl Into<String>) -> Self {
        self.images_dir = dir.into();
        self
    }

    pub fn without_cover(mut self) -> Self {
        self.extract_cover = false;
        self
    }
}

/// Markdown produced from a container, plus the cover to store beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOutput {
    pub markdown: String,
    /// Relative path (as written in the frontmatter) and image bytes.
    pub cover: Option<(String, Vec<u8>)>,
}

/// Render every spine document of an opened container as one Markdown document.
///
/// Spine documents that are missing or yield no text are skipped with a
/// warning; only container-level failures are errors.
pub fn epub_to_markdown<R: Read + Seek>(
    container: &mut EpubContainer<R>,
    options: &MarkdownOptions,
) -> MarkdownOutput {
    let mut book = Book::new(container.metadata().clone());
    let documents = container.documents().to_vec();

    for (idx, href) in documents.iter().enumerate() {
        let html = match container.read_document(href) {
            Ok(html) => html,
            Err(err) => {
                log::warn!("skipping spine document {href}: {err}");
                continue;
            }
        };
        let markdown = html_to_markdown(&html, idx + 1);
        if markdown.is_empty() {
            log::debug!("chapter {}: {href} has no text", idx + 1);
            continue;
        }
        book.chapters.push(Chapter::new(first_heading(&markdown), markdown));
    }

    let cover = if options.extract_cover {
        cover_entry(container, &options.images_dir)
    } else {
        None
    };

    let markdown = render_markdown(&book, cover.as_ref().map(|(path, _)| path.as_str()));
    MarkdownOutput { markdown, cover }
}

fn cover_entry<R: Read + Seek>(
    container: &mut EpubContainer<R>,
    images_dir: &str,
) -> Option<(String, Vec<u8>)> {
    let extension = container
        .cover_href()
        .and_then(|href| Path::new(href).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string());
    let bytes = container.read_cover()?;
    let dir = images_dir.trim_end_matches('/');
    let path = if dir.is_empty() {
        format!("cover.{extension}")
    } else {
        format!("{dir}/cover.{extension}")
    };
    log::debug!("extracted cover: {path} ({} bytes)", bytes.len());
    Some((path, bytes))
}

/// Text of the first heading line, used as the chapter title.
fn first_heading(markdown: &str) -> String {
    markdown
        .lines()
        .find_map(|line| match LineKind::classify(line) {
            LineKind::Heading { text, .. } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        })
        .unwrap_or_default()
        .to_string()
}

/// Convert an EPUB file into a Markdown file, extracting the cover beside it.
///
/// Creates the output directory if needed.
///
/// # Example
///
/// ```no_run
/// use mdpub::{MarkdownOptions, epub_file_to_markdown_file};
///
/// epub_file_to_markdown_file("book.epub", "out/book.md", &MarkdownOptions::default())?;
/// # Ok::<(), mdpub::Error>(())
/// ```
pub fn epub_file_to_markdown_file<P: AsRef<Path>, Q: AsRef<Path>>(
    epub_path: P,
    markdown_path: Q,
    options: &MarkdownOptions,
) -> Result<()> {
    let markdown_path = markdown_path.as_ref();
    let mut container = EpubContainer::open(epub_path)?;
    let output = epub_to_markdown(&mut container, options);

    let out_dir = markdown_path.parent().unwrap_or_else(|| Path::new(""));
    create_dir(out_dir)?;
    write_file(markdown_path, output.markdown.as_bytes())?;

    if let Some((relative, bytes)) = &output.cover {
        let cover_path = out_dir.join(relative);
        if let Some(parent) = cover_path.parent() {
            create_dir(parent)?;
        }
        write_file(&cover_path, bytes)?;
    }
    Ok(())
}

/// Parse Markdown into a [`Book`], loading the frontmatter cover relative
/// to `base_dir`.
///
/// A cover that cannot be read is logged and left out.
pub fn markdown_to_book(markdown: &str, base_dir: Option<&Path>, options: &ParseOptions) -> Book {
    let parsed = parse_markdown_with(markdown, options);
    attach_cover(parsed.book, parsed.cover_path.as_deref(), base_dir)
}

fn attach_cover(mut book: Book, cover_path: Option<&str>, base_dir: Option<&Path>) -> Book {
    let (Some(cover_path), Some(base_dir)) = (cover_path, base_dir) else {
        return book;
    };
    let full = base_dir.join(cover_path);
    match fs::read(&full) {
        Ok(bytes) => book.metadata.cover = Some(bytes),
        Err(err) => log::warn!("cover {} unreadable: {err}", full.display()),
    }
    book
}

/// Convert Markdown to an EPUB written to `writer`.
pub fn markdown_to_epub<W: Write + Seek>(
    markdown: &str,
    base_dir: Option<&Path>,
    writer: W,
    options: &ParseOptions,
) -> Result<()> {
    let book = markdown_to_book(markdown, base_dir, options);
    write_epub_to_writer(&book, writer)?;
    Ok(())
}

/// Convert Markdown to EPUB bytes.
pub fn markdown_to_epub_bytes(markdown: &str, options: &ParseOptions) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    markdown_to_epub(markdown, None, &mut cursor, options)?;
    Ok(cursor.into_inner())
}

/// Convert a Markdown file into an EPUB file.
///
/// The Markdown is read line by line; a relative `cover:` path is resolved
/// against the Markdown file's directory.
pub fn markdown_file_to_epub<P: AsRef<Path>, Q: AsRef<Path>>(
    markdown_path: P,
    epub_path: Q,
    options: &ParseOptions,
) -> Result<()> {
    let markdown_path = markdown_path.as_ref();
    let epub_path = epub_path.as_ref();
    let file = fs::File::open(markdown_path).map_err(|source| ParseError::Io {
        path: markdown_path.display().to_string(),
        source,
    })?;
    let parsed = parse_markdown_reader(BufReader::new(file), options).map_err(|err| match err {
        ParseError::Stream(source) => ParseError::Io {
            path: markdown_path.display().to_string(),
            source,
        },
        other => other,
    })?;
    let base_dir = markdown_path.parent().unwrap_or_else(|| Path::new(""));
    let book = attach_cover(parsed.book, parsed.cover_path.as_deref(), Some(base_dir));

    if let Some(parent) = epub_path.parent() {
        create_dir(parent)?;
    }
    write_epub(&book, epub_path)?;
    Ok(())
}

/// Rewrite a Markdown file's text into a new file.
pub fn rewrite_markdown_file<P, Q, R>(input: P, output: Q, rewriter: R) -> Result<R>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: TextRewriter,
{
    let input = input.as_ref();
    let output = output.as_ref();
    let content = fs::read_to_string(input).map_err(|source| ParseError::Io {
        path: input.display().to_string(),
        source,
    })?;

    let mut markdown_rewriter = MarkdownRewriter::new(rewriter);
    let rewritten = markdown_rewriter.rewrite(&content)?;

    if let Some(parent) = output.parent() {
        create_dir(parent)?;
    }
    write_file(output, rewritten.as_bytes())?;
    Ok(markdown_rewriter.into_inner())
}

fn create_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.display().to_string(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Metadata;

    #[test]
    fn test_first_heading() {
        assert_eq!(first_heading("intro\n\n## Part *One*\n\ntext"), "Part *One*");
        assert_eq!(first_heading("no heading"), "");
    }

    #[test]
    fn test_markdown_options_builder() {
        let options = MarkdownOptions::default().with_images_dir("img").without_cover();
        assert_eq!(options.images_dir, "img");
        assert!(!options.extract_cover);
    }

    #[test]
    fn test_in_memory_round_trip() {
        let book = Book::new(Metadata::new("Round").with_author("A").with_language("en"))
            .with_chapter("First", "# First\n\nHello & *you*.")
            .with_chapter("Second", "# Second\n\n- one\n- two");
        let markdown = render_markdown(&book, None);
        let bytes = markdown_to_epub_bytes(&markdown, &ParseOptions::default()).unwrap();

        let mut container = EpubContainer::from_reader(Cursor::new(bytes)).unwrap();
        let output = epub_to_markdown(&mut container, &MarkdownOptions::default());
        assert!(output.cover.is_none());

        let reparsed = parse_markdown_with(&output.markdown, &ParseOptions::default());
        assert_eq!(reparsed.book.metadata.title, "Round");
        assert_eq!(reparsed.book.chapters.len(), 2);
        assert_eq!(reparsed.book.chapters[0].body(), "Hello & *you*.");
        assert_eq!(reparsed.book.chapters[1].body(), "- one\n- two");
    }

    #[test]
    fn test_missing_cover_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let book = markdown_to_book(
            "---\ntitle: T\ncover: Images/none.jpg\n---\n",
            Some(dir.path()),
            &ParseOptions::default(),
        );
        assert_eq!(book.metadata.title, "T");
        assert!(book.metadata.cover.is_none());
    }
}
