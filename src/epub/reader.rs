use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use super::parser::{CONTAINER_PATH, OpfData, parse_container_xml, parse_opf};
use crate::book::Metadata;
use crate::error::ContainerError;
use crate::util::{archive_dir, decode_text, resolve_path, strip_bom, xml_declared_encoding};

/// An opened EPUB container: metadata, reading order and the archive
/// handle used to fetch content documents.
///
/// The archive is owned by this value and released when it is dropped,
/// on success and error paths alike.
pub struct EpubContainer<R: Read + Seek> {
    archive: ZipArchive<R>,
    metadata: Metadata,
    documents: Vec<String>,
    base_dir: String,
    cover_href: Option<String>,
}

impl EpubContainer<BufReader<File>> {
    /// Open an EPUB file from disk.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mdpub::EpubContainer;
    ///
    /// let container = EpubContainer::open("path/to/book.epub")?;
    /// println!("Title: {}", container.metadata().title);
    /// # Ok::<(), mdpub::ContainerError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ContainerError::Io {
            entry: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> EpubContainer<R> {
    /// Read an EPUB from any [`Read`] + [`Seek`] source.
    pub fn from_reader(reader: R) -> Result<Self, ContainerError> {
        let mut archive = ZipArchive::new(reader)?;

        let container_xml = read_entry(&mut archive, CONTAINER_PATH)?;
        let opf_path = parse_container_xml(&container_xml)?;
        let base_dir = archive_dir(&opf_path);

        let opf_bytes = read_entry(&mut archive, &opf_path)?;
        let opf_content = String::from_utf8(strip_bom(&opf_bytes).to_vec())
            .map_err(|_| ContainerError::Utf8 {
                entry: opf_path.clone(),
            })?;
        let opf: OpfData = parse_opf(&opf_content, &opf_path)?;
        let documents = opf.reading_order();

        log::debug!(
            "opened container: manifest {opf_path}, {} spine documents",
            documents.len()
        );

        Ok(Self {
            archive,
            metadata: opf.metadata,
            documents,
            base_dir,
            cover_href: opf.cover_href,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Manifest-relative document hrefs in spine order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Directory of the manifest inside the archive (e.g. `"OEBPS/"`).
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    pub fn cover_href(&self) -> Option<&str> {
        self.cover_href.as_deref()
    }

    /// Raw bytes of a manifest-relative resource.
    pub fn read_resource(&mut self, href: &str) -> Result<Vec<u8>, ContainerError> {
        let full_path = resolve_path(&self.base_dir, href);
        read_entry(&mut self.archive, &full_path)
    }

    /// Decoded text of a manifest-relative content document.
    pub fn read_document(&mut self, href: &str) -> Result<String, ContainerError> {
        let bytes = self.read_resource(href)?;
        let hint = xml_declared_encoding(&bytes);
        Ok(decode_text(strip_bom(&bytes), hint.as_deref()).into_owned())
    }

    /// Cover image bytes, if the manifest declares a cover that exists.
    pub fn read_cover(&mut self) -> Option<Vec<u8>> {
        let href = self.cover_href.clone()?;
        match self.read_resource(&href) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("cover {href} declared but unreadable: {err}");
                None
            }
        }
    }
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>, ContainerError> {
    match read_entry_exact(archive, path) {
        Err(ContainerError::MissingEntry(_)) => {}
        other => return other,
    }

    // Fallback: manifest hrefs are often percent-encoded
    let decoded = percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| ContainerError::Utf8 {
            entry: path.to_string(),
        })?;
    if decoded == path {
        return Err(ContainerError::MissingEntry(path.to_string()));
    }
    read_entry_exact(archive, &decoded)
}

fn read_entry_exact<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>, ContainerError> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(ContainerError::MissingEntry(path.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|source| ContainerError::Io {
            entry: path.to_string(),
            source,
        })?;
    Ok(contents)
}
