//! Error types for invitation generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating invitations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input file (name list or template) does not exist.
    #[error("Required input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// The name list contains no names.
    #[error("No names found in {}", .0.display())]
    EmptyInput(PathBuf),

    /// The name list could not be decoded.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The template is unreadable or not a valid presentation.
    #[error("Failed to load template: {0}")]
    TemplateLoad(String),

    /// A generated file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external converter failed or produced no images.
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Another recipient already claimed this output file name.
    #[error("Duplicate recipient file name: {0}")]
    DuplicateName(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML rewriting error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Write`] for `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole run rather than a single recipient.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingInput(_) | Self::EmptyInput(_) | Self::InvalidInput(_) | Self::TemplateLoad(_)
        )
    }

    /// Classify an error raised while processing a single recipient.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Write { .. } | Self::Io(_) => FailureKind::WriteError,
            Self::Conversion(_) => FailureKind::ConversionError,
            Self::DuplicateName(_) => FailureKind::DuplicateName,
            _ => FailureKind::PersonalizeError,
        }
    }
}

/// Reported kind of a per-recipient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Substituting the placeholder into the template failed.
    PersonalizeError,
    /// Writing the personalized document failed.
    WriteError,
    /// The converter failed for this document.
    ConversionError,
    /// The recipient's file name collided with an earlier recipient.
    DuplicateName,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PersonalizeError => "PersonalizeError",
            Self::WriteError => "WriteError",
            Self::ConversionError => "ConversionError",
            Self::DuplicateName => "DuplicateName",
        };
        f.write_str(name)
    }
}
