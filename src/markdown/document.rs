//! [`Book`] of Markdown chapters to a single Markdown document.

use std::fmt::Write;

use super::line::LineKind;
use crate::book::{Book, Chapter, Metadata};

/// Render a book whose chapter sections hold Markdown.
///
/// Layout: frontmatter, a title block (`# Title`, byline, rule), then each
/// non-empty chapter followed by a `---` separator. A chapter body that
/// does not open with a level-1 or level-2 heading gets `# <chapter title>`
/// (or `# Chapter N`) so it parses back as its own chapter. The title block is
/// exactly five lines after the closing frontmatter delimiter when authors
/// are present, which is what [`crate::markdown::BoilerplateSkip::Lines`]
/// expects.
///
/// `cover_path` is written to the frontmatter as `cover:` along with
/// `has_cover: true`.
pub fn render_markdown(book: &Book, cover_path: Option<&str>) -> String {
    let mut out = String::new();
    write_frontmatter(&mut out, &book.metadata, cover_path);

    out.push('\n');
    let _ = writeln!(out, "# {}", single_line(&book.metadata.title));
    out.push('\n');
    if !book.metadata.authors.is_empty() {
        let _ = writeln!(out, "**By {}**", single_line(&book.metadata.authors_joined()));
        out.push('\n');
    }
    out.push_str("---\n\n");

    for (idx, chapter) in book.chapters.iter().enumerate() {
        let body = chapter.body();
        if body.trim().is_empty() {
            continue;
        }
        if !opens_with_chapter_heading(&body) {
            let _ = writeln!(out, "# {}\n", chapter_heading(chapter, idx + 1));
        }
        out.push_str(&body);
        out.push_str("\n\n---\n\n");
    }

    out
}

fn write_frontmatter(out: &mut String, meta: &Metadata, cover_path: Option<&str>) {
    out.push_str("---\n");
    let _ = writeln!(out, "title: {}", single_line(&meta.title));
    let _ = writeln!(out, "authors: {}", single_line(&meta.authors_joined()));
    let _ = writeln!(out, "language: {}", single_line(&meta.language));

    let optional = [
        ("description", &meta.description),
        ("publisher", &meta.publisher),
        ("isbn", &meta.isbn),
        ("date", &meta.date),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().map(single_line)
            && !value.is_empty()
        {
            let _ = writeln!(out, "{key}: {value}");
        }
    }

    if let Some(path) = cover_path {
        let _ = writeln!(out, "cover: {path}");
        out.push_str("has_cover: true\n");
    }
    out.push_str("---\n");
}

fn opens_with_chapter_heading(body: &str) -> bool {
    body.lines()
        .map(LineKind::classify)
        .find(|kind| *kind != LineKind::Blank)
        .is_some_and(|kind| {
            matches!(kind, LineKind::Heading { level, text, .. } if level <= 2 && !text.trim().is_empty())
        })
}

fn chapter_heading(chapter: &Chapter, number: usize) -> String {
    let title = single_line(&chapter.title);
    if title.is_empty() {
        format!("Chapter {number}")
    } else {
        title
    }
}

/// Frontmatter values are one line each.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
