//! Book-shaped value shared by both conversion directions.
//!
//! A [`Book`] is built fresh by a reader or parser, handed to the renderer
//! or writer of the opposite direction, and dropped. Chapters carry no
//! identifiers: their position in [`Book::chapters`] is the reading order.

/// Book metadata (Dublin Core subset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub date: Option<String>,
    /// Raw cover image bytes.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cover: Option<Vec<u8>>,
}

/// A chapter in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chapter {
    pub title: String,
    pub sections: Vec<Section>,
}

/// An opaque content blob: Markdown or an XHTML body fragment, depending
/// on which direction produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    pub content: String,
}

/// Metadata plus ordered chapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Book {
    pub metadata: Metadata,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            chapters: Vec::new(),
        }
    }

    /// Append a chapter holding a single section.
    pub fn add_chapter(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.chapters.push(Chapter::new(title, content));
    }

    pub fn with_chapter(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.add_chapter(title, content);
        self
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_cover(mut self, cover: Vec<u8>) -> Self {
        self.cover = Some(cover);
        self
    }

    /// Authors joined for display (`"A, B"`).
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: vec![Section::new(content)],
        }
    }

    /// All section contents joined by blank lines, skipping empty ones.
    pub fn body(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.content.as_str())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Section {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::new("Title")
            .with_author("A")
            .with_author("B")
            .with_language("fr")
            .with_isbn("978-0")
            .with_description("About")
            .with_publisher("Press")
            .with_date("2021-05-01");

        assert_eq!(meta.title, "Title");
        assert_eq!(meta.authors, vec!["A", "B"]);
        assert_eq!(meta.authors_joined(), "A, B");
        assert_eq!(meta.language, "fr");
        assert_eq!(meta.isbn.as_deref(), Some("978-0"));
        assert_eq!(meta.description.as_deref(), Some("About"));
        assert_eq!(meta.publisher.as_deref(), Some("Press"));
        assert_eq!(meta.date.as_deref(), Some("2021-05-01"));
        assert!(meta.cover.is_none());
    }

    #[test]
    fn test_chapter_body_skips_empty_sections() {
        let mut chapter = Chapter::new("One", "first");
        chapter.sections.push(Section::new(""));
        chapter.sections.push(Section::new("second"));
        assert_eq!(chapter.body(), "first\n\nsecond");
    }

    #[test]
    fn test_chapter_order_is_insertion_order() {
        let book = Book::new(Metadata::new("B"))
            .with_chapter("1", "a")
            .with_chapter("2", "b");
        let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["1", "2"]);
    }
}
