//! EPUB parsing utilities (container.xml, OPF).

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::Metadata;
use crate::error::ContainerError;
use crate::util::strip_bom;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parsed OPF package data.
#[derive(Debug, Default)]
pub struct OpfData {
    pub metadata: Metadata,
    /// Maps manifest id -> item
    pub manifest: HashMap<String, ManifestItem>,
    pub spine_ids: Vec<String>,
    /// Manifest-relative href of the cover image, if one is declared.
    pub cover_href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl OpfData {
    /// Resolve spine idrefs against the manifest, in spine order.
    ///
    /// Idrefs that name no manifest item are dropped.
    pub fn reading_order(&self) -> Vec<String> {
        self.spine_ids
            .iter()
            .filter_map(|id| match self.manifest.get(id) {
                Some(item) => Some(item.href.clone()),
                None => {
                    log::warn!("spine idref '{id}' has no manifest item");
                    None
                }
            })
            .collect()
    }
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String, ContainerError> {
    let content = std::str::from_utf8(strip_bom(bytes)).map_err(|_| ContainerError::Utf8 {
        entry: CONTAINER_PATH.to_string(),
    })?;

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr_value(&e, b"full-path", CONTAINER_PATH)?
                    && !path.is_empty()
                {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(ContainerError::Xml {
                    entry: CONTAINER_PATH.to_string(),
                    source,
                });
            }
            _ => {}
        }
    }

    Err(ContainerError::NoRootfile)
}

/// Parse an OPF package document. `entry` names the archive entry for
/// error context.
pub fn parse_opf(content: &str, entry: &str) -> Result<OpfData, ContainerError> {
    let mut reader = Reader::from_str(content);
    // Text is split around entity references; trimming each piece would
    // eat the spaces next to `&amp;`, so values are trimmed once at the end.
    reader.config_mut().trim_text(false);

    let mut metadata = Metadata::default();
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    let mut spine_ids: Vec<String> = Vec::new();
    let mut epub2_cover_id: Option<String> = None;
    let mut identifiers: Vec<(String, bool)> = Vec::new();

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut identifier_is_isbn = false;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                    | b"description" | b"date"
                        if in_metadata =>
                    {
                        if local == b"identifier" {
                            identifier_is_isbn = is_isbn_scheme(&e, entry)?;
                        }
                        current_element = Some(String::from_utf8_lossy(local).into_owned());
                        buf_text.clear();
                    }
                    b"item" | b"itemref" | b"meta" => handle_empty(
                        &e,
                        entry,
                        &mut manifest,
                        &mut spine_ids,
                        &mut epub2_cover_id,
                    )?,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                handle_empty(&e, entry, &mut manifest, &mut spine_ids, &mut epub2_cover_id)?
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element
                    && elem.as_bytes() == local
                {
                    let value = buf_text.trim().to_string();
                    match elem.as_str() {
                        "title" if metadata.title.is_empty() => metadata.title = value,
                        "creator" if !value.is_empty() => metadata.authors.push(value),
                        "language" if metadata.language.is_empty() => metadata.language = value,
                        "identifier" => identifiers.push((value, identifier_is_isbn)),
                        "publisher" => metadata.publisher = Some(value),
                        "description" => metadata.description = Some(value),
                        "date" => metadata.date = Some(value),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(ContainerError::Xml {
                    entry: entry.to_string(),
                    source,
                });
            }
            _ => {}
        }
    }

    metadata.isbn = identifiers.into_iter().find_map(|(value, scheme_isbn)| {
        if let Some(isbn) = value.strip_prefix("urn:isbn:") {
            Some(isbn.to_string())
        } else if scheme_isbn {
            Some(value)
        } else {
            None
        }
    });

    // EPUB3 property takes priority over the EPUB2 meta
    let cover_href = manifest
        .values()
        .find(|item| {
            item.properties
                .as_ref()
                .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
        })
        .or_else(|| epub2_cover_id.and_then(|id| manifest.get(&id)))
        .map(|item| item.href.clone());

    Ok(OpfData {
        metadata,
        manifest,
        spine_ids,
        cover_href,
    })
}

/// Manifest items, spine itemrefs and EPUB2 cover metas.
fn handle_empty(
    e: &BytesStart<'_>,
    entry: &str,
    manifest: &mut HashMap<String, ManifestItem>,
    spine_ids: &mut Vec<String>,
    epub2_cover_id: &mut Option<String>,
) -> Result<(), ContainerError> {
    let name = e.name();
    match local_name(name.as_ref()) {
        b"item" => {
            let id = attr_value(e, b"id", entry)?.unwrap_or_default();
            if !id.is_empty() {
                manifest.insert(
                    id,
                    ManifestItem {
                        href: attr_value(e, b"href", entry)?.unwrap_or_default(),
                        media_type: attr_value(e, b"media-type", entry)?.unwrap_or_default(),
                        properties: attr_value(e, b"properties", entry)?,
                    },
                );
            }
        }
        b"itemref" => {
            if let Some(idref) = attr_value(e, b"idref", entry)? {
                spine_ids.push(idref);
            }
        }
        b"meta" => {
            if attr_value(e, b"name", entry)?.as_deref() == Some("cover")
                && let Some(content) = attr_value(e, b"content", entry)?
                && !content.is_empty()
            {
                *epub2_cover_id = Some(content);
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_isbn_scheme(e: &BytesStart<'_>, entry: &str) -> Result<bool, ContainerError> {
    Ok(attr_value(e, b"scheme", entry)?.is_some_and(|s| s.eq_ignore_ascii_case("isbn")))
}

/// Look up an attribute by local name and return its raw value.
fn attr_value(e: &BytesStart<'_>, key: &[u8], entry: &str) -> Result<Option<String>, ContainerError> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == key {
            let value = String::from_utf8(attr.value.to_vec()).map_err(|_| ContainerError::Utf8 {
                entry: entry.to_string(),
            })?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Tom &amp; Jerry</dc:title>
    <dc:creator>Author One</dc:creator>
    <dc:creator>Author Two</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="BookId" opf:scheme="ISBN">9780000000001</dc:identifier>
    <dc:publisher>Test Publisher</dc:publisher>
    <dc:description>A test book description.</dc:description>
    <dc:date>2024-01-15</dc:date>
    <meta name="cover" content="cover"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover" href="cover.jpg" media-type="image/jpeg"/>
    <item id="ch2" href="chapter2.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"title"), b"title");
        assert_eq!(local_name(b"dc:title"), b"title");
        assert_eq!(local_name(b"opf:meta"), b"meta");
        assert_eq!(local_name(b""), b"");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("apos"), Some("'".to_string()));
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("#65"), Some("A".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("nbsp"), None);
    }

    #[test]
    fn test_parse_container_xml() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

        assert_eq!(parse_container_xml(container).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_parse_container_xml_with_bom() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#,
        );
        assert_eq!(parse_container_xml(&container).unwrap(), "content.opf");
    }

    #[test]
    fn test_parse_container_xml_without_rootfile() {
        let container = br#"<container><rootfiles></rootfiles></container>"#;
        assert!(matches!(
            parse_container_xml(container),
            Err(ContainerError::NoRootfile)
        ));
    }

    #[test]
    fn test_parse_opf_metadata() {
        let opf = parse_opf(OPF, "OEBPS/content.opf").unwrap();

        assert_eq!(opf.metadata.title, "Tom & Jerry");
        assert_eq!(opf.metadata.authors, vec!["Author One", "Author Two"]);
        assert_eq!(opf.metadata.language, "en");
        assert_eq!(opf.metadata.isbn.as_deref(), Some("9780000000001"));
        assert_eq!(opf.metadata.publisher.as_deref(), Some("Test Publisher"));
        assert_eq!(
            opf.metadata.description.as_deref(),
            Some("A test book description.")
        );
        assert_eq!(opf.metadata.date.as_deref(), Some("2024-01-15"));
        assert_eq!(opf.cover_href.as_deref(), Some("cover.jpg"));
    }

    #[test]
    fn test_reading_order_follows_spine_not_manifest() {
        let opf = parse_opf(OPF, "OEBPS/content.opf").unwrap();
        assert_eq!(opf.reading_order(), vec!["chapter1.xhtml", "chapter2.xhtml"]);
    }

    #[test]
    fn test_reading_order_drops_unknown_idrefs() {
        let opf = r#"<package><metadata/><manifest>
            <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
        </manifest><spine><itemref idref="missing"/><itemref idref="a"/></spine></package>"#;
        let opf = parse_opf(opf, "content.opf").unwrap();
        assert_eq!(opf.reading_order(), vec!["a.xhtml"]);
    }

    #[test]
    fn test_parse_opf_urn_isbn_identifier() {
        let opf = r#"<package><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
            <dc:identifier>urn:uuid:1234</dc:identifier>
            <dc:identifier>urn:isbn:12345</dc:identifier>
        </metadata><manifest/><spine/></package>"#;
        let opf = parse_opf(opf, "content.opf").unwrap();
        assert_eq!(opf.metadata.isbn.as_deref(), Some("12345"));
    }

    #[test]
    fn test_parse_opf_cover_epub3() {
        let opf = r#"<package version="3.0">
  <metadata><dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">Book</dc:title></metadata>
  <manifest>
    <item id="cover-img" href="images/cover.png" media-type="image/png" properties="cover-image"/>
  </manifest>
  <spine/>
</package>"#;
        let opf = parse_opf(opf, "content.opf").unwrap();
        assert_eq!(opf.cover_href.as_deref(), Some("images/cover.png"));
    }

    #[test]
    fn test_parse_opf_malformed() {
        let result = parse_opf("<package><metadata></package>", "content.opf");
        assert!(matches!(result, Err(ContainerError::Xml { .. })));
    }
}
