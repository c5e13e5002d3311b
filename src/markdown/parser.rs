//! Markdown document to [`Book`].
//!
//! The parser is a single pass over lines driven by [`ParserState`]. It
//! never fails on content: missing frontmatter, missing headings or stray
//! text all produce a (possibly empty) book. Only I/O on the input stream
//! can fail.

use std::io::BufRead;

use super::line::{LineKind, closes_fence};
use crate::book::{Book, Chapter, Metadata, Section};
use crate::error::ParseError;

/// How to skip the title block written after the frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoilerplateSkip {
    /// Drop a fixed number of lines after the closing `---`.
    Lines(usize),
    /// Drop blank lines, a `# <title>` heading matching the frontmatter
    /// title, a `**By ...**` byline and the first rule, stopping at the
    /// first line that is none of these.
    Structural,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    pub skip: BoilerplateSkip,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            skip: BoilerplateSkip::Lines(5),
        }
    }
}

impl ParseOptions {
    pub fn with_skip(mut self, skip: BoilerplateSkip) -> Self {
        self.skip = skip;
        self
    }
}

/// Result of parsing a Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMarkdown {
    pub book: Book,
    /// `cover:` path from the frontmatter, as written.
    pub cover_path: Option<String>,
}

#[derive(Debug)]
enum ParserState {
    /// Before the first line, or inside a frontmatter block that opened there.
    BeforeOrInFrontmatter { opened: bool },
    AfterFrontmatter(SkipProgress),
    NoChapter,
    InChapter(OpenChapter),
}

#[derive(Debug, Clone, Copy)]
enum SkipProgress {
    Lines(usize),
    Structural { title_seen: bool },
}

#[derive(Debug)]
struct OpenChapter {
    title: String,
    body: Vec<String>,
}

impl OpenChapter {
    fn seal(self) -> Chapter {
        let content = self.body.join("\n").trim().to_string();
        Chapter {
            title: self.title,
            sections: vec![Section::new(content)],
        }
    }
}

/// Line-at-a-time parser. Feed lines with [`MarkdownParser::push_line`]
/// and collect the result with [`MarkdownParser::finish`].
pub struct MarkdownParser {
    options: ParseOptions,
    state: ParserState,
    metadata: Metadata,
    chapters: Vec<Chapter>,
    cover_path: Option<String>,
    /// A closed frontmatter block owns the title; headings after it only
    /// open chapters.
    frontmatter_seen: bool,
    /// Backtick count of the open code fence inside a chapter.
    fence: Option<usize>,
}

impl MarkdownParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            state: ParserState::BeforeOrInFrontmatter { opened: false },
            metadata: Metadata::default(),
            chapters: Vec::new(),
            cover_path: None,
            frontmatter_seen: false,
            fence: None,
        }
    }

    pub fn push_line(&mut self, line: &str) {
        let state = std::mem::replace(&mut self.state, ParserState::NoChapter);
        self.state = self.step(state, line);
    }

    pub fn finish(mut self) -> ParsedMarkdown {
        if let ParserState::InChapter(open) = std::mem::replace(&mut self.state, ParserState::NoChapter) {
            self.chapters.push(open.seal());
        }
        log::debug!(
            "parsed markdown: title {:?}, {} chapters",
            self.metadata.title,
            self.chapters.len()
        );
        ParsedMarkdown {
            book: Book {
                metadata: self.metadata,
                chapters: self.chapters,
            },
            cover_path: self.cover_path,
        }
    }

    fn step(&mut self, state: ParserState, line: &str) -> ParserState {
        match state {
            ParserState::BeforeOrInFrontmatter { opened: false } => {
                if line.trim_start_matches('\u{feff}').trim_end() == "---" {
                    ParserState::BeforeOrInFrontmatter { opened: true }
                } else {
                    self.body_line(ParserState::NoChapter, line)
                }
            }
            ParserState::BeforeOrInFrontmatter { opened: true } => {
                if line.trim_end() == "---" {
                    self.frontmatter_seen = true;
                    ParserState::AfterFrontmatter(match self.options.skip {
                        BoilerplateSkip::Lines(n) => SkipProgress::Lines(n),
                        BoilerplateSkip::Structural => SkipProgress::Structural { title_seen: false },
                    })
                } else {
                    self.frontmatter_line(line);
                    ParserState::BeforeOrInFrontmatter { opened: true }
                }
            }
            ParserState::AfterFrontmatter(progress) => self.skip_line(progress, line),
            state => self.body_line(state, line),
        }
    }

    fn skip_line(&mut self, progress: SkipProgress, line: &str) -> ParserState {
        match progress {
            SkipProgress::Lines(0) => self.body_line(ParserState::NoChapter, line),
            SkipProgress::Lines(n) => ParserState::AfterFrontmatter(SkipProgress::Lines(n - 1)),
            SkipProgress::Structural { title_seen } => match LineKind::classify(line) {
                LineKind::Blank => ParserState::AfterFrontmatter(progress),
                LineKind::Rule => ParserState::NoChapter,
                LineKind::Heading { level: 1, text, .. }
                    if !title_seen && text.trim() == self.metadata.title =>
                {
                    ParserState::AfterFrontmatter(SkipProgress::Structural { title_seen: true })
                }
                _ if is_byline(line) => ParserState::AfterFrontmatter(progress),
                _ => self.body_line(ParserState::NoChapter, line),
            },
        }
    }

    fn body_line(&mut self, state: ParserState, line: &str) -> ParserState {
        if let Some(ticks) = self.fence {
            if closes_fence(line, ticks) {
                self.fence = None;
            }
            return push_body(state, line);
        }

        match LineKind::classify(line) {
            LineKind::Heading { level, text, .. } if level <= 2 && !text.trim().is_empty() => {
                let text = text.trim();
                let no_chapters = self.chapters.is_empty() && !matches!(state, ParserState::InChapter(_));
                if level == 1
                    && !self.frontmatter_seen
                    && self.metadata.title.is_empty()
                    && no_chapters
                {
                    self.metadata.title = text.to_string();
                    return state;
                }
                if let ParserState::InChapter(open) = state {
                    self.chapters.push(open.seal());
                }
                ParserState::InChapter(OpenChapter {
                    title: text.to_string(),
                    body: Vec::new(),
                })
            }
            LineKind::Rule => {
                if let ParserState::InChapter(open) = state {
                    self.chapters.push(open.seal());
                }
                ParserState::NoChapter
            }
            LineKind::Fence { ticks, .. } => {
                if matches!(state, ParserState::InChapter(_)) {
                    self.fence = Some(ticks);
                }
                push_body(state, line)
            }
            _ => push_body(state, line),
        }
    }

    fn frontmatter_line(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        let meta = &mut self.metadata;
        match key.trim() {
            "title" => meta.title = value.to_string(),
            "authors" => {
                meta.authors = value
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect();
            }
            "author" if !value.is_empty() => meta.authors = vec![value.to_string()],
            "language" => meta.language = value.to_string(),
            "description" => meta.description = non_empty(value),
            "publisher" => meta.publisher = non_empty(value),
            "isbn" => meta.isbn = non_empty(value),
            "date" => meta.date = non_empty(value),
            "cover" => self.cover_path = non_empty(value),
            _ => {}
        }
    }
}

fn push_body(state: ParserState, line: &str) -> ParserState {
    match state {
        ParserState::InChapter(mut open) => {
            open.body.push(line.to_string());
            ParserState::InChapter(open)
        }
        other => other,
    }
}

fn is_byline(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("**By ") && line.ends_with("**") && line.len() > "**By **".len()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a Markdown document with default options.
///
/// # Example
///
/// ```
/// use mdpub::markdown::parse_markdown;
///
/// let parsed = parse_markdown("# My Book\n\n## One\n\nHello.\n");
/// assert_eq!(parsed.book.metadata.title, "My Book");
/// assert_eq!(parsed.book.chapters.len(), 1);
/// assert_eq!(parsed.book.chapters[0].body(), "Hello.");
/// ```
pub fn parse_markdown(text: &str) -> ParsedMarkdown {
    parse_markdown_with(text, &ParseOptions::default())
}

pub fn parse_markdown_with(text: &str, options: &ParseOptions) -> ParsedMarkdown {
    let mut parser = MarkdownParser::new(*options);
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}

/// Parse from a buffered reader, one line at a time.
pub fn parse_markdown_reader<R: BufRead>(
    reader: R,
    options: &ParseOptions,
) -> Result<ParsedMarkdown, ParseError> {
    let mut parser = MarkdownParser::new(*options);
    for line in reader.lines() {
        parser.push_line(&line.map_err(ParseError::Stream)?);
    }
    Ok(parser.finish())
}
