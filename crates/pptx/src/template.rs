//! PPTX template loading and personalization.

use crate::package::{self, PRESENTATION_PART};
use crate::rewrite::substitute_part;
use invite_core::{Error, PersonalizedDocument, Result, Substitution, TemplateDocument};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// A validated PPTX template held in memory.
///
/// The template bytes are never modified; each call to
/// [`PptxTemplate::personalize`] builds a new package.
#[derive(Debug, Clone)]
pub struct PptxTemplate {
    bytes: Vec<u8>,

    /// Slide part paths in presentation order.
    slide_parts: Vec<String>,

    /// Decompressed XML of every slide part.
    slide_xml: HashMap<String, String>,
}

impl PptxTemplate {
    /// Load a template from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingInput(path.to_path_buf()),
            _ => Error::TemplateLoad(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        let template = Self::from_bytes(bytes).map_err(|e| match e {
            Error::TemplateLoad(msg) => Error::TemplateLoad(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        log::debug!(
            "Loaded template {} with {} slide(s)",
            path.display(),
            template.slide_count()
        );
        Ok(template)
    }

    /// Validate an in-memory PPTX package.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !package::is_zip(&bytes) {
            return Err(Error::TemplateLoad("not a PPTX (ZIP) file".to_string()));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| Error::TemplateLoad(format!("Failed to open ZIP: {}", e)))?;

        if archive.by_name(PRESENTATION_PART).is_err() {
            return Err(Error::TemplateLoad(format!("missing {}", PRESENTATION_PART)));
        }

        let slide_parts = package::slide_parts(&mut archive)
            .map_err(|e| Error::TemplateLoad(e.to_string()))?;
        if slide_parts.is_empty() {
            return Err(Error::TemplateLoad("presentation has no slides".to_string()));
        }

        let mut slide_xml = HashMap::with_capacity(slide_parts.len());
        for part in &slide_parts {
            let xml = package::read_part(&mut archive, part)
                .map_err(|e| Error::TemplateLoad(e.to_string()))?;
            slide_xml.insert(part.clone(), xml);
        }
        drop(archive);

        Ok(Self {
            bytes,
            slide_parts,
            slide_xml,
        })
    }

    pub fn slide_count(&self) -> usize {
        self.slide_parts.len()
    }

    /// Slide part paths in presentation order.
    pub fn slide_parts(&self) -> &[String] {
        &self.slide_parts
    }

    /// Build a personalized copy of the template.
    ///
    /// Slide parts are rewritten and stored deflated with a fixed timestamp;
    /// every other entry is copied without recompression, so the same input
    /// always yields the same bytes.
    pub fn personalize(&self, substitution: &Substitution<'_>) -> Result<PersonalizedDocument> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| Error::Zip(format!("Failed to reopen template: {}", e)))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.bytes.len())));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut replacements = 0;

        for idx in 0..archive.len() {
            let entry = archive
                .by_index_raw(idx)
                .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", idx, e)))?;

            match self.slide_xml.get(entry.name()) {
                Some(xml) => {
                    let name = entry.name().to_string();
                    drop(entry);

                    let rewrite = substitute_part(xml, substitution)?;
                    if rewrite.replacements > 0 {
                        log::debug!("{}: {} replacement(s)", name, rewrite.replacements);
                    }
                    replacements += rewrite.replacements;

                    writer
                        .start_file(name.as_str(), options)
                        .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
                    writer.write_all(&rewrite.xml)?;
                }
                None => {
                    writer
                        .raw_copy_file(entry)
                        .map_err(|e| Error::Zip(format!("Failed to copy entry {}: {}", idx, e)))?;
                }
            }
        }

        let bytes = writer
            .finish()
            .map_err(|e| Error::Zip(format!("Failed to finish package: {}", e)))?
            .into_inner();

        Ok(PersonalizedDocument {
            bytes,
            replacements,
            slide_count: self.slide_count(),
        })
    }
}

impl TemplateDocument for PptxTemplate {
    fn load(path: &Path) -> Result<Self> {
        Self::open(path)
    }

    fn extension(&self) -> &str {
        "pptx"
    }

    fn personalize(&self, substitution: &Substitution<'_>) -> Result<PersonalizedDocument> {
        PptxTemplate::personalize(self, substitution)
    }
}
