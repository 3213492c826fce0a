//! Domain types for recipients, generated documents and batch results.

use crate::config::RunStyle;
use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single invitation recipient read from the name list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Trimmed, non-empty name.
    pub name: String,

    /// 1-based line number in the name file.
    pub line: usize,
}

impl Recipient {
    /// Create a recipient from a raw line. Returns `None` for blank lines.
    pub fn from_line(raw: &str, line: usize) -> Option<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            line,
        })
    }
}

/// What to substitute into the template for one recipient.
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    /// Literal marker to search for.
    pub placeholder: &'a str,

    /// Replacement text (the recipient's name).
    pub value: &'a str,

    /// Optional styling applied to runs that contained the marker.
    pub style: Option<&'a RunStyle>,
}

/// A template copy with the placeholder substituted, ready to be written.
#[derive(Debug, Clone)]
pub struct PersonalizedDocument {
    /// Serialized document.
    pub bytes: Vec<u8>,

    /// Number of placeholder occurrences that were replaced.
    pub replacements: usize,

    /// Number of slides/pages in the document.
    pub slide_count: usize,
}

/// Final state of a single recipient's cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Document written and images produced.
    Succeeded {
        images: Vec<PathBuf>,
        placeholder_found: bool,
    },
    /// The cycle stopped at some step.
    Failed { kind: FailureKind, message: String },
}

/// Result of processing one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient: Recipient,

    /// Path of the personalized document, if one was written.
    pub document: Option<PathBuf>,

    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl RecipientOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded { .. })
    }

    /// Images produced for this recipient (empty on failure).
    pub fn images(&self) -> &[PathBuf] {
        match &self.status {
            OutcomeStatus::Succeeded { images, .. } => images,
            OutcomeStatus::Failed { .. } => &[],
        }
    }
}

/// Aggregate result of a batch run, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub outcomes: Vec<RecipientOutcome>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: RecipientOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of recipients processed.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// True when every recipient succeeded.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failed outcomes, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &RecipientOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// All produced images, in input order.
    pub fn images(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().flat_map(|o| o.images().iter())
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed {} recipient(s): {} succeeded, {} failed",
            self.total(),
            self.succeeded(),
            self.failed()
        )?;

        for outcome in self.failures() {
            if let OutcomeStatus::Failed { kind, message } = &outcome.status {
                writeln!(
                    f,
                    "  - {} (line {}): {}: {}",
                    outcome.recipient.name, outcome.recipient.line, kind, message
                )?;
            }
        }

        Ok(())
    }
}
