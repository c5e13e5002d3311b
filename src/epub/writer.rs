use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::parser::CONTAINER_PATH;
use crate::book::Book;
use crate::error::WriteError;
use crate::markdown::{convert_inline, escape_xml, markdown_to_xhtml};

/// Writer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterOptions {
    /// `dc:language` used when the book has none.
    pub language_fallback: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            language_fallback: "en".to_string(),
        }
    }
}

impl WriterOptions {
    pub fn with_language_fallback(mut self, language: impl Into<String>) -> Self {
        self.language_fallback = language.into();
        self
    }
}

/// Write a [`Book`] of Markdown chapters to an EPUB file on disk.
///
/// Creates an EPUB 2 file with an OPF package document, an NCX table of
/// contents and one XHTML document per chapter.
///
/// # Example
///
/// ```no_run
/// use mdpub::{Book, Metadata, write_epub};
///
/// let book = Book::new(Metadata::new("My Book").with_author("Me"))
///     .with_chapter("One", "Hello, **world**.");
/// write_epub(&book, "output.epub")?;
/// # Ok::<(), mdpub::WriteError>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> Result<(), WriteError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| WriteError::Create {
        path: path.display().to_string(),
        source,
    })?;
    write_epub_to_writer(book, BufWriter::new(file))
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<(), WriteError> {
    write_epub_with_options(book, writer, &WriterOptions::default())
}

/// Write a [`Book`] with explicit [`WriterOptions`].
///
/// Entries are written in a fixed order: `mimetype` (stored, never
/// compressed), `META-INF/container.xml`, `OEBPS/content.opf`,
/// `OEBPS/toc.ncx`, the chapters, then the cover image if any.
pub fn write_epub_with_options<W: Write + Seek>(
    book: &Book,
    writer: W,
    options: &WriterOptions,
) -> Result<(), WriteError> {
    let mut zip = EntryWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.entry("mimetype", stored, b"application/epub+zip")?;
    zip.entry(CONTAINER_PATH, deflated, CONTAINER_XML.as_bytes())?;

    // Shared by the OPF and the NCX
    let identifier = match &book.metadata.isbn {
        Some(isbn) if !isbn.trim().is_empty() => isbn.trim().to_string(),
        _ => generate_identifier(book),
    };
    let cover = book.metadata.cover.as_deref().map(CoverImage::sniff);

    let opf = generate_opf(book, &identifier, cover.as_ref(), options);
    zip.entry("OEBPS/content.opf", deflated, opf.as_bytes())?;

    let ncx = generate_ncx(book, &identifier);
    zip.entry("OEBPS/toc.ncx", deflated, ncx.as_bytes())?;

    for (idx, chapter) in book.chapters.iter().enumerate() {
        let xhtml = generate_chapter(&chapter.title, &chapter.body());
        zip.entry(
            &format!("OEBPS/{}", chapter_href(idx)),
            deflated,
            xhtml.as_bytes(),
        )?;
    }

    if let (Some(_), Some(bytes)) = (&cover, &book.metadata.cover) {
        zip.entry(&format!("OEBPS/{COVER_HREF}"), deflated, bytes)?;
    }

    log::debug!(
        "wrote epub: {} chapters, identifier {identifier}",
        book.chapters.len()
    );
    zip.finish()
}

/// Content-derived package identifier (`urn:uuid:...`).
///
/// SHA-1 over title, authors and chapter content, laid out as a
/// name-based (version 5) UUID. The same book always gets the same
/// identifier.
pub fn generate_identifier(book: &Book) -> String {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(book.metadata.title.as_bytes());
    for author in &book.metadata.authors {
        hasher.update(b"\0");
        hasher.update(author.as_bytes());
    }
    for chapter in &book.chapters {
        hasher.update(b"\x1e");
        hasher.update(chapter.title.as_bytes());
        hasher.update(b"\0");
        hasher.update(chapter.body().as_bytes());
    }

    let digest = hasher.digest().bytes();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Wraps the archive so every failure names the entry it happened on.
struct EntryWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> EntryWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
        }
    }

    fn entry(&mut self, name: &str, options: SimpleFileOptions, data: &[u8]) -> Result<(), WriteError> {
        self.zip
            .start_file(name, options)
            .map_err(|source| WriteError::Entry {
                entry: name.to_string(),
                source,
            })?;
        self.zip.write_all(data).map_err(|source| WriteError::Io {
            entry: name.to_string(),
            source,
        })?;
        log::debug!("wrote {name} ({} bytes)", data.len());
        Ok(())
    }

    fn finish(self) -> Result<(), WriteError> {
        let mut writer = self.zip.finish().map_err(WriteError::Finish)?;
        writer.flush().map_err(|source| WriteError::Io {
            entry: "archive".to_string(),
            source,
        })
    }
}

/// Archive path of the cover relative to `OEBPS/`. Fixed regardless of
/// format; only the declared media type follows the bytes.
const COVER_HREF: &str = "cover.jpg";

struct CoverImage {
    media_type: &'static str,
}

impl CoverImage {
    fn sniff(bytes: &[u8]) -> Self {
        let media_type = if bytes.starts_with(b"\x89PNG") {
            "image/png"
        } else if bytes.starts_with(b"GIF8") {
            "image/gif"
        } else {
            "image/jpeg"
        };
        Self { media_type }
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn chapter_href(idx: usize) -> String {
    format!("chapter{}.xhtml", idx + 1)
}

fn generate_opf(
    book: &Book,
    identifier: &str,
    cover: Option<&CoverImage>,
    options: &WriterOptions,
) -> String {
    let meta = &book.metadata;
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookID">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&meta.title)
    ));

    for author in &meta.authors {
        opf.push_str(&format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape_xml(author)
        ));
    }

    let language = if meta.language.trim().is_empty() {
        options.language_fallback.as_str()
    } else {
        meta.language.as_str()
    };
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(language)
    ));

    let scheme = if meta.isbn.as_deref().is_some_and(|i| !i.trim().is_empty()) {
        " opf:scheme=\"ISBN\""
    } else {
        ""
    };
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookID\"{scheme}>{}</dc:identifier>\n",
        escape_xml(identifier)
    ));

    if let Some(ref description) = meta.description {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(description)
        ));
    }
    if let Some(ref publisher) = meta.publisher {
        opf.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            escape_xml(publisher)
        ));
    }
    if let Some(ref date) = meta.date {
        opf.push_str(&format!("    <dc:date>{}</dc:date>\n", escape_xml(date)));
    }
    if cover.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    if let Some(cover) = cover {
        opf.push_str(&format!(
            "    <item id=\"cover-image\" href=\"{COVER_HREF}\" media-type=\"{}\"/>\n",
            cover.media_type
        ));
    }
    for idx in 0..book.chapters.len() {
        opf.push_str(&format!(
            "    <item id=\"chapter{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            idx + 1,
            chapter_href(idx)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for idx in 0..book.chapters.len() {
        opf.push_str(&format!("    <itemref idref=\"chapter{}\"/>\n", idx + 1));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(book: &Book, identifier: &str) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata.title));
    ncx.push_str("</text>\n  </docTitle>\n  <navMap>\n");

    for (idx, chapter) in book.chapters.iter().enumerate() {
        let order = idx + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"chapter{order}\" playOrder=\"{order}\">\n      <navLabel>\n        <text>{}</text>\n      </navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
            escape_xml(&chapter.title),
            chapter_href(idx)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn generate_chapter(title: &str, body: &str) -> String {
    let mut xhtml = String::new();
    xhtml.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>"#,
    );
    xhtml.push_str(&escape_xml(title));
    xhtml.push_str("</title>\n</head>\n<body>\n");
    if !title.trim().is_empty() {
        xhtml.push_str(&format!("<h1>{}</h1>\n", convert_inline(title.trim())));
    }
    xhtml.push_str(&markdown_to_xhtml(body));
    xhtml.push_str("</body>\n</html>\n");
    xhtml
}
