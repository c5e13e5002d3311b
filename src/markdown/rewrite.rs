//! Structure-preserving text rewriting.
//!
//! A caller-supplied function sees only human-readable text: heading,
//! list and quote markers, emphasis delimiters, link targets, inline and
//! fenced code, frontmatter and image lines are passed through untouched.
//! Leading and trailing whitespace of each segment is kept as-is and only
//! the trimmed text is handed to the function.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;

use super::line::{LineKind, closes_fence, contains_image};
use crate::error::{BoxError, RewriteError};

/// Inline spans, in priority order: `**`, `__`, `*`, `_`, code, link
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*.+?\*\*|__.+?__|\*[^*]+?\*|_[^_]+?_|`[^`]+`|\[[^\]]*\]\([^)]*\)").unwrap()
});

/// A function from text to replacement text.
///
/// Implemented for any `FnMut(&str) -> Result<String, E>` whose error
/// converts into a boxed error.
pub trait TextRewriter {
    fn rewrite(&mut self, text: &str) -> Result<String, BoxError>;
}

impl<F, E> TextRewriter for F
where
    F: FnMut(&str) -> Result<String, E>,
    E: Into<BoxError>,
{
    fn rewrite(&mut self, text: &str) -> Result<String, BoxError> {
        self(text).map_err(Into::into)
    }
}

/// Memoizes another rewriter by exact input text.
///
/// The cache is owned by this value; pass one in with
/// [`CachedRewriter::with_cache`] and take it back with
/// [`CachedRewriter::into_cache`] to share it across documents.
pub struct CachedRewriter<R> {
    inner: R,
    cache: HashMap<String, String>,
    hits: usize,
}

impl<R: TextRewriter> CachedRewriter<R> {
    pub fn new(inner: R) -> Self {
        Self::with_cache(inner, HashMap::new())
    }

    pub fn with_cache(inner: R, cache: HashMap<String, String>) -> Self {
        Self {
            inner,
            cache,
            hits: 0,
        }
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn into_cache(self) -> HashMap<String, String> {
        self.cache
    }
}

impl<R: TextRewriter> TextRewriter for CachedRewriter<R> {
    fn rewrite(&mut self, text: &str) -> Result<String, BoxError> {
        if let Some(cached) = self.cache.get(text) {
            self.hits += 1;
            return Ok(cached.clone());
        }
        let result = self.inner.rewrite(text)?;
        self.cache.insert(text.to_string(), result.clone());
        Ok(result)
    }
}

/// Rewrites the text of a Markdown document line by line.
pub struct MarkdownRewriter<R> {
    rewriter: R,
}

impl<R: TextRewriter> MarkdownRewriter<R> {
    pub fn new(rewriter: R) -> Self {
        Self { rewriter }
    }

    pub fn into_inner(self) -> R {
        self.rewriter
    }

    /// Rewrite a whole document.
    ///
    /// Line structure is kept, including each line's ending (`\n` or
    /// `\r\n`) and whether the input ended with a newline. The first
    /// failing call aborts with the line number where it happened.
    pub fn rewrite(&mut self, content: &str) -> Result<String, RewriteError> {
        let mut out = String::with_capacity(content.len());
        let mut in_frontmatter = false;
        let mut fence: Option<usize> = None;

        for (idx, raw) in content.split_inclusive('\n').enumerate() {
            let (line, ending) = split_line_ending(raw);

            let verbatim = if idx == 0 && line.trim_end() == "---" {
                in_frontmatter = true;
                true
            } else if in_frontmatter {
                if line.trim_end() == "---" {
                    in_frontmatter = false;
                }
                true
            } else if let Some(ticks) = fence {
                if closes_fence(line, ticks) {
                    fence = None;
                }
                true
            } else if let LineKind::Fence { ticks, .. } = LineKind::classify(line) {
                fence = Some(ticks);
                true
            } else {
                false
            };

            if verbatim {
                out.push_str(line);
            } else {
                let rewritten = self
                    .rewrite_line(line)
                    .map_err(|source| RewriteError {
                        line: idx + 1,
                        source,
                    })?;
                out.push_str(&rewritten);
            }
            out.push_str(ending);
        }

        Ok(out)
    }

    fn rewrite_line(&mut self, line: &str) -> Result<String, BoxError> {
        match LineKind::classify(line) {
            LineKind::Blank | LineKind::Rule | LineKind::Fence { .. } => Ok(line.to_string()),
            LineKind::Heading { prefix, text, .. }
            | LineKind::ListItem { prefix, text, .. }
            | LineKind::Quote { prefix, text } => {
                Ok(format!("{prefix}{}", self.rewrite_inline(text)?))
            }
            LineKind::Plain(text) => self.rewrite_inline(text),
        }
    }

    /// Rewrite the plain text and span contents of one line of inline Markdown.
    fn rewrite_inline(&mut self, text: &str) -> Result<String, BoxError> {
        if contains_image(text) {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for span in SEGMENT_RE.find_iter(text) {
            out.push_str(&self.rewrite_text(&text[last..span.start()])?);
            out.push_str(&self.rewrite_span(span.as_str())?);
            last = span.end();
        }
        out.push_str(&self.rewrite_text(&text[last..])?);
        Ok(out)
    }

    fn rewrite_span(&mut self, span: &str) -> Result<String, BoxError> {
        if span.starts_with('`') {
            return Ok(span.to_string());
        }
        if span.starts_with('[')
            && let Some(split) = span.find("](")
        {
            let label = self.rewrite_text(&span[1..split])?;
            return Ok(format!("[{label}{}", &span[split..]));
        }

        let delimiter = if span.starts_with("**") || span.starts_with("__") {
            2
        } else {
            1
        };
        let inner = &span[delimiter..span.len() - delimiter];
        Ok(format!(
            "{}{}{}",
            &span[..delimiter],
            self.rewrite_text(inner)?,
            &span[span.len() - delimiter..]
        ))
    }

    /// Rewrite the trimmed core of `text`, keeping surrounding whitespace.
    fn rewrite_text(&mut self, text: &str) -> Result<String, BoxError> {
        let core = text.trim();
        if core.is_empty() {
            return Ok(text.to_string());
        }
        let start = text.len() - text.trim_start().len();
        let end = start + core.len();
        let replaced = self.rewriter.rewrite(core)?;
        Ok(format!("{}{replaced}{}", &text[..start], &text[end..]))
    }
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    let body_len = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .map_or(raw.len(), str::len);
    raw.split_at(body_len)
}

/// Rewrite a Markdown document with a closure.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
///
/// use mdpub::markdown::rewrite_markdown;
///
/// let out = rewrite_markdown("# Hello\n\nSome **bold** text.\n", |s: &str| {
///     Ok::<_, Infallible>(s.to_uppercase())
/// })?;
/// assert_eq!(out, "# HELLO\n\nSOME **BOLD** TEXT.\n");
/// # Ok::<(), mdpub::RewriteError>(())
/// ```
pub fn rewrite_markdown<F, E>(content: &str, rewrite: F) -> Result<String, RewriteError>
where
    F: FnMut(&str) -> Result<String, E>,
    E: Into<BoxError>,
{
    MarkdownRewriter::new(rewrite).rewrite(content)
}
