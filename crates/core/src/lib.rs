//! Core domain types, name source reading, file name sanitizing and the
//! batch driver for personalized invitations.

pub mod batch;
pub mod config;
pub mod error;
pub mod names;
pub mod sanitize;
pub mod types;

pub use batch::{BatchRunner, Converter, TemplateDocument};
pub use config::{BatchConfig, DuplicatePolicy, RunStyle};
pub use error::{Error, FailureKind, Result};
pub use names::{NameSource, Recipients};
pub use sanitize::sanitize_file_stem;
pub use types::{
    BatchSummary, OutcomeStatus, PersonalizedDocument, Recipient, RecipientOutcome, Substitution,
};
