//! Error taxonomy shared by every editing component.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while reading, transforming or writing sections and locales.
#[derive(Debug, Error)]
pub enum SectionError {
    /// The source template, locale directory or locale subtree is absent.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// A duplication or creation target is already occupied.
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// The configuration block or a locale file cannot be located or balanced.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A setting id or block type collides with an existing one.
    #[error("duplicate identifier `{id}` in {scope}")]
    DuplicateIdentifier { scope: String, id: String },

    /// A merge targeted a destination subtree that does not exist yet.
    #[error("cannot merge into `{0}`: destination subtree does not exist")]
    Conflict(String),

    /// Translation requested for a locale outside the configured set.
    #[error("locale `{0}` is not supported")]
    UnsupportedLocale(String),

    /// A document operation was called in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A locale file carries the subtree under both naming conventions.
    #[error("key `{key}` is present under both `{key}` and `{alternate}`")]
    AmbiguousConvention { key: String, alternate: String },

    /// The tool configuration file could not be interpreted.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SectionError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        SectionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        SectionError::MalformedDocument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SectionError>;
