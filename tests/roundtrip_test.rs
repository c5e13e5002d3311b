//! File-to-file conversions in both directions.

use std::fs;

use mdpub::markdown::parse_markdown;
use mdpub::{
    BoilerplateSkip, EpubContainer, MarkdownOptions, ParseOptions, epub_file_to_markdown_file,
    markdown_file_to_epub,
};
use tempfile::TempDir;

const BOOK_MD: &str = "---
title: Round Trip
authors: Ada Lovelace, Charles Babbage
language: en
publisher: Analytical Press
---

# Round Trip

**By Ada Lovelace, Charles Babbage**

---

# The Engine

Numbers & *patterns* with **weight**.

```
loop { **not bold** }
```

---

## Notes

> A quoted line.

- first
- second

---

# Last Words

Fin.

---
";

fn write_markdown(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_chapter_count_and_metadata_survive_round_trip() {
    let dir = TempDir::new().unwrap();
    let md_path = write_markdown(&dir, "book.md", BOOK_MD);
    let epub_path = dir.path().join("out/book.epub");
    let back_path = dir.path().join("back/book.md");

    markdown_file_to_epub(&md_path, &epub_path, &ParseOptions::default()).unwrap();
    let container = EpubContainer::open(&epub_path).unwrap();
    assert_eq!(container.documents().len(), 3);
    drop(container);

    epub_file_to_markdown_file(&epub_path, &back_path, &MarkdownOptions::default()).unwrap();
    let back = fs::read_to_string(&back_path).unwrap();
    let parsed = parse_markdown(&back);

    assert_eq!(parsed.book.metadata.title, "Round Trip");
    assert_eq!(
        parsed.book.metadata.authors,
        vec!["Ada Lovelace", "Charles Babbage"]
    );
    assert_eq!(parsed.book.metadata.publisher.as_deref(), Some("Analytical Press"));
    assert_eq!(parsed.book.chapters.len(), 3);

    let titles: Vec<_> = parsed.book.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["The Engine", "Notes", "Last Words"]);
}

#[test]
fn test_chapter_bodies_survive_round_trip() {
    let dir = TempDir::new().unwrap();
    let md_path = write_markdown(&dir, "book.md", BOOK_MD);
    let epub_path = dir.path().join("book.epub");
    let back_path = dir.path().join("back.md");

    markdown_file_to_epub(&md_path, &epub_path, &ParseOptions::default()).unwrap();
    epub_file_to_markdown_file(&epub_path, &back_path, &MarkdownOptions::default()).unwrap();
    let parsed = parse_markdown(&fs::read_to_string(&back_path).unwrap());

    assert_eq!(
        parsed.book.chapters[0].body(),
        "Numbers & *patterns* with **weight**.\n\n```\nloop { **not bold** }\n```"
    );
    assert_eq!(
        parsed.book.chapters[1].body(),
        "> A quoted line.\n\n- first\n- second"
    );
    assert_eq!(parsed.book.chapters[2].body(), "Fin.");
}

#[test]
fn test_cover_round_trip() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("art")).unwrap();
    fs::write(dir.path().join("art/front.jpg"), b"\xFF\xD8\xFF cover").unwrap();
    let md = BOOK_MD.replace("language: en\n", "language: en\ncover: art/front.jpg\n");
    let md_path = write_markdown(&dir, "book.md", &md);
    let epub_path = dir.path().join("book.epub");

    markdown_file_to_epub(&md_path, &epub_path, &ParseOptions::default()).unwrap();

    let out_dir = dir.path().join("export");
    let back_path = out_dir.join("book.md");
    epub_file_to_markdown_file(&epub_path, &back_path, &MarkdownOptions::default()).unwrap();

    let back = fs::read_to_string(&back_path).unwrap();
    assert!(back.contains("cover: Images/cover.jpg\nhas_cover: true\n"));
    assert_eq!(
        fs::read(out_dir.join("Images/cover.jpg")).unwrap(),
        b"\xFF\xD8\xFF cover"
    );

    // The exported Markdown is itself convertible, cover included
    let again = dir.path().join("again.epub");
    markdown_file_to_epub(&back_path, &again, &ParseOptions::default()).unwrap();
    let mut container = EpubContainer::open(&again).unwrap();
    assert_eq!(container.read_cover().as_deref(), Some(b"\xFF\xD8\xFF cover".as_slice()));
}

#[test]
fn test_structural_skip_for_hand_written_markdown() {
    let dir = TempDir::new().unwrap();
    let md_path = write_markdown(
        &dir,
        "notes.md",
        "---\ntitle: Notes\n---\n## Only Chapter\nBody text.\n",
    );
    let epub_path = dir.path().join("notes.epub");

    let options = ParseOptions::default().with_skip(BoilerplateSkip::Structural);
    markdown_file_to_epub(&md_path, &epub_path, &options).unwrap();
    let container = EpubContainer::open(&epub_path).unwrap();
    assert_eq!(container.documents().len(), 1);
}

#[test]
fn test_missing_input_reports_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.md");
    let err = markdown_file_to_epub(&missing, dir.path().join("x.epub"), &ParseOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("missing.md"));

    let err = epub_file_to_markdown_file(
        dir.path().join("missing.epub"),
        dir.path().join("x.md"),
        &MarkdownOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, mdpub::Error::Container(_)));
}

#[cfg(feature = "serde")]
#[test]
fn test_parse_options_serde() {
    let options = ParseOptions::default().with_skip(BoilerplateSkip::Structural);
    let json = serde_json::to_string(&options).unwrap();
    let back: ParseOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(back, options);
}
