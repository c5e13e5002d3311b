//! Error types for mdpub operations.

use thiserror::Error;

/// Boxed error returned by a caller-supplied rewrite function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while converting between EPUB and Markdown.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to read an EPUB container.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("cannot open archive: {0}")]
    Open(#[from] zip::result::ZipError),

    #[error("missing archive entry: {0}")]
    MissingEntry(String),

    #[error("no rootfile found in META-INF/container.xml")]
    NoRootfile,

    #[error("malformed XML in {entry}: {source}")]
    Xml {
        entry: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("invalid UTF-8 in {entry}")]
    Utf8 { entry: String },

    #[error("cannot read {entry}: {source}")]
    Io {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while assembling an EPUB container.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("cannot create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start archive entry {entry}: {source}")]
    Entry {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot write archive entry {entry}: {source}")]
    Io {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot finish archive: {0}")]
    Finish(#[source] zip::result::ZipError),
}

/// Failure to read Markdown input. Missing structure is never an error.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read markdown {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read markdown stream: {0}")]
    Stream(#[source] std::io::Error),
}

/// Error raised by a rewrite function, with the line where rewriting stopped.
#[derive(Error, Debug)]
#[error("rewrite failed at line {line}: {source}")]
pub struct RewriteError {
    pub line: usize,
    #[source]
    pub source: BoxError,
}

pub type Result<T> = std::result::Result<T, Error>;
