//! Batch personalizer/exporter.
//!
//! Drives one generate-and-export cycle per recipient, in input order.
//! File-level preconditions (missing, empty or unreadable name list, missing
//! or broken template, uncreatable output directory) abort the run before
//! anything is written. Errors inside a recipient's cycle are recorded in its outcome and
//! processing moves on to the next recipient.

use crate::config::{BatchConfig, DuplicatePolicy};
use crate::error::{Error, Result};
use crate::names::NameSource;
use crate::sanitize::{collision_key, sanitize_file_stem};
use crate::types::{
    BatchSummary, OutcomeStatus, PersonalizedDocument, Recipient, RecipientOutcome, Substitution,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A template that can produce personalized copies of itself.
pub trait TemplateDocument: Sized {
    /// Load and validate the template.
    ///
    /// Must fail with [`Error::MissingInput`] if `path` does not exist and
    /// [`Error::TemplateLoad`] if it is not a usable document.
    fn load(path: &Path) -> Result<Self>;

    /// File extension of produced documents, without the dot.
    fn extension(&self) -> &str;

    /// Produce a copy with `substitution` applied. The template itself is not modified.
    fn personalize(&self, substitution: &Substitution<'_>) -> Result<PersonalizedDocument>;
}

/// External tool that rasterizes a document into images.
pub trait Converter {
    /// Convert `document` into images inside `output_dir`, returning the image
    /// paths in page order.
    fn convert(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Runs a batch described by a [`BatchConfig`].
pub struct BatchRunner<'a, C: Converter> {
    config: &'a BatchConfig,
    converter: &'a C,
}

impl<'a, C: Converter> BatchRunner<'a, C> {
    pub fn new(config: &'a BatchConfig, converter: &'a C) -> Self {
        Self { config, converter }
    }

    /// Run the whole batch with template backend `T`.
    pub fn run<T: TemplateDocument>(&self) -> Result<BatchSummary> {
        let source = NameSource::open(&self.config.names_file)?;
        let template = T::load(&self.config.template)?;

        // Read the whole list up front so a bad line aborts before any output.
        let recipients = source.load()?;

        let output_dir = self.config.output_dir();
        fs::create_dir_all(output_dir).map_err(|e| Error::write(output_dir, e))?;

        log::info!(
            "Generating invitations from {} into {}",
            self.config.template.display(),
            output_dir.display()
        );

        let mut stems = StemRegistry::new(self.config.duplicates);
        let mut summary = BatchSummary::new();

        for recipient in recipients {
            let outcome = self.process(&template, &mut stems, recipient);
            summary.push(outcome);
        }

        log::info!(
            "Finished: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );

        Ok(summary)
    }

    /// Run one recipient's cycle, folding any error into its outcome.
    fn process<T: TemplateDocument>(
        &self,
        template: &T,
        stems: &mut StemRegistry,
        recipient: Recipient,
    ) -> RecipientOutcome {
        log::debug!("Processing recipient '{}' (line {})", recipient.name, recipient.line);

        let mut document = None;
        let result = self.generate(template, stems, &recipient, &mut document);

        let status = match result {
            Ok((images, placeholder_found)) => OutcomeStatus::Succeeded {
                images,
                placeholder_found,
            },
            Err(e) => {
                log::error!("Recipient '{}' failed: {}", recipient.name, e);
                OutcomeStatus::Failed {
                    kind: e.failure_kind(),
                    message: e.to_string(),
                }
            }
        };

        RecipientOutcome {
            recipient,
            document,
            status,
        }
    }

    fn generate<T: TemplateDocument>(
        &self,
        template: &T,
        stems: &mut StemRegistry,
        recipient: &Recipient,
        document: &mut Option<PathBuf>,
    ) -> Result<(Vec<PathBuf>, bool)> {
        let raw_stem = format!("{}{}", self.config.file_prefix, recipient.name);
        let stem = stems.claim(&sanitize_file_stem(&raw_stem))?;

        let substitution = Substitution {
            placeholder: &self.config.placeholder,
            value: &recipient.name,
            style: self.config.style.as_ref(),
        };
        let personalized = template.personalize(&substitution)?;

        let placeholder_found = personalized.replacements > 0;
        if !placeholder_found {
            log::warn!(
                "Placeholder '{}' not found in template; '{}' gets an unmodified copy",
                self.config.placeholder,
                recipient.name
            );
        }

        let path = self.config.document_path(&stem, template.extension());
        fs::write(&path, &personalized.bytes).map_err(|e| Error::write(&path, e))?;
        log::debug!(
            "Wrote {} ({} replacement(s), {} slide(s))",
            path.display(),
            personalized.replacements,
            personalized.slide_count
        );
        *document = Some(path.clone());

        let images = self.converter.convert(&path, self.config.output_dir())?;
        log::info!("{}: {} image(s)", recipient.name, images.len());

        if !self.config.keep_documents {
            match fs::remove_file(&path) {
                Ok(()) => *document = None,
                Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok((images, placeholder_found))
    }
}

/// Hands out output stems and applies the duplicate policy.
#[derive(Debug)]
struct StemRegistry {
    policy: DuplicatePolicy,
    claimed: HashMap<String, usize>,
}

impl StemRegistry {
    fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            claimed: HashMap::new(),
        }
    }

    fn claim(&mut self, stem: &str) -> Result<String> {
        let key = collision_key(stem);
        let Some(&count) = self.claimed.get(&key) else {
            self.claimed.insert(key, 1);
            return Ok(stem.to_string());
        };

        match self.policy {
            DuplicatePolicy::Overwrite => {
                log::warn!("Output name '{}' is used twice; overwriting", stem);
                Ok(stem.to_string())
            }
            DuplicatePolicy::Reject => Err(Error::DuplicateName(stem.to_string())),
            DuplicatePolicy::Rename => {
                let mut n = count + 1;
                let mut candidate = format!("{}-{}", stem, n);
                while self.claimed.contains_key(&collision_key(&candidate)) {
                    n += 1;
                    candidate = format!("{}-{}", stem, n);
                }
                self.claimed.insert(key, n);
                self.claimed.insert(collision_key(&candidate), 1);
                log::warn!("Output name '{}' is used twice; using '{}'", stem, candidate);
                Ok(candidate)
            }
        }
    }
}
