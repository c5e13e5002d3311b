//! Structure-preserving rewriting of whole documents and files.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;

use mdpub::markdown::{CachedRewriter, MarkdownRewriter, rewrite_markdown};
use mdpub::{Error, rewrite_markdown_file};
use proptest::prelude::*;
use tempfile::TempDir;

fn upper(s: &str) -> Result<String, Infallible> {
    Ok(s.to_uppercase())
}

#[test]
fn test_rewrite_preserves_syntax() {
    let out = rewrite_markdown("Text with **bold** and *italic*.", upper).unwrap();
    assert_eq!(out, "TEXT WITH **BOLD** AND *ITALIC*.");
    assert!(!out.contains("****"));
}

#[test]
fn test_empty_input() {
    assert_eq!(rewrite_markdown("", upper).unwrap(), "");
}

#[test]
fn test_full_document() {
    let doc = "---
title: keep me
---

# Chapter one

Plain text with `code_here` and a [link](http://x.org/a_b).

> quoted *words*

1. first item
   - nested item

```
fn untouched() {}
```

![Cover](Images/cover.jpg)

---
";
    let expected = "---
title: keep me
---

# CHAPTER ONE

PLAIN TEXT WITH `code_here` AND A [LINK](http://x.org/a_b).

> QUOTED *WORDS*

1. FIRST ITEM
   - NESTED ITEM

```
fn untouched() {}
```

![Cover](Images/cover.jpg)

---
";
    assert_eq!(rewrite_markdown(doc, upper).unwrap(), expected);
}

#[test]
fn test_shared_cache_across_documents() {
    let mut calls = 0;
    let counting = |s: &str| {
        calls += 1;
        Ok::<_, Infallible>(format!("<{s}>"))
    };

    let mut rewriter = MarkdownRewriter::new(CachedRewriter::new(counting));
    let first = rewriter.rewrite("Hello\n\n**Hello**").unwrap();
    let second = rewriter.rewrite("- Hello").unwrap();
    assert_eq!(first, "<Hello>\n\n**<Hello>**");
    assert_eq!(second, "- <Hello>");

    let cached = rewriter.into_inner();
    assert_eq!(cached.hits(), 2);
    drop(cached);
    assert_eq!(calls, 1);
}

#[test]
fn test_seeded_cache() {
    let mut seed = HashMap::new();
    seed.insert("Bonjour".to_string(), "Hello".to_string());
    let never_called = |_: &str| -> Result<String, String> { Err("not cached".to_string()) };

    let mut rewriter = MarkdownRewriter::new(CachedRewriter::with_cache(never_called, seed));
    assert_eq!(rewriter.rewrite("## Bonjour").unwrap(), "## Hello");

    let err = rewriter.rewrite("Bonjour\nAu revoir").unwrap_err();
    assert_eq!(err.line, 2);
}

#[test]
fn test_rewrite_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.md");
    let output = dir.path().join("nested/out.md");
    fs::write(&input, "# Title\n\nSome **text**.\n").unwrap();

    rewrite_markdown_file(&input, &output, upper).unwrap();
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "# TITLE\n\nSOME **TEXT**.\n"
    );
}

#[test]
fn test_rewrite_file_error_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.md");
    let output = dir.path().join("out.md");
    fs::write(&input, "fine\nbroken\n").unwrap();

    let failing = |s: &str| {
        if s == "broken" {
            Err("backend down")
        } else {
            Ok(s.to_string())
        }
    };
    let Err(err) = rewrite_markdown_file(&input, &output, failing) else {
        panic!("expected the rewrite to fail");
    };
    match err {
        Error::Rewrite(err) => assert_eq!(err.line, 2),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

proptest! {
    #[test]
    fn prop_identity_rewrite_is_lossless(
        lines in prop::collection::vec("[a-z #*_>`\\-\\[\\]()!.1]{0,24}", 0..12),
        trailing_newline in any::<bool>(),
    ) {
        let mut doc = lines.join("\n");
        if trailing_newline {
            doc.push('\n');
        }
        let out = rewrite_markdown(&doc, |s: &str| Ok::<_, Infallible>(s.to_string())).unwrap();
        prop_assert_eq!(out, doc);
    }
}
