//! Batch configuration.
//!
//! Every path and policy the batch needs is carried here explicitly; the
//! CLI layer decides the defaults.

use std::path::{Path, PathBuf};

/// What to do when two recipients map to the same output file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Append `-2`, `-3`, ... to later collisions.
    #[default]
    Rename,
    /// Record a failure for later collisions.
    Reject,
    /// Let later recipients overwrite earlier output.
    Overwrite,
}

/// Character styling forced onto text runs that contained the placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStyle {
    /// Latin typeface name.
    pub typeface: Option<String>,

    /// Font size in points.
    pub size_pt: Option<f32>,
}

impl RunStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_typeface(mut self, typeface: impl Into<String>) -> Self {
        self.typeface = Some(typeface.into());
        self
    }

    pub fn with_size_pt(mut self, size_pt: f32) -> Self {
        self.size_pt = Some(size_pt);
        self
    }

    /// Whether this style changes nothing.
    pub fn is_empty(&self) -> bool {
        self.typeface.is_none() && self.size_pt.is_none()
    }

    /// Size in hundredths of a point, as stored in DrawingML `sz`.
    pub fn size_hundredths(&self) -> Option<u32> {
        self.size_pt
            .filter(|pt| pt.is_finite() && *pt > 0.0)
            .map(|pt| (pt * 100.0).round() as u32)
    }
}

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Line-delimited list of recipient names.
    pub names_file: PathBuf,

    /// Template document.
    pub template: PathBuf,

    /// Directory receiving documents and images.
    pub output_dir: PathBuf,

    /// Literal marker replaced by each name.
    pub placeholder: String,

    /// Text prepended to each name before sanitizing it into a file name.
    pub file_prefix: String,

    /// Styling applied to runs containing the placeholder.
    pub style: Option<RunStyle>,

    pub duplicates: DuplicatePolicy,

    /// Keep personalized documents after they have been converted.
    pub keep_documents: bool,
}

impl BatchConfig {
    /// Create a configuration with the given input and output paths.
    pub fn new(
        names_file: impl Into<PathBuf>,
        template: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            names_file: names_file.into(),
            template: template.into(),
            output_dir: output_dir.into(),
            placeholder: placeholder.into(),
            file_prefix: String::new(),
            style: None,
            duplicates: DuplicatePolicy::default(),
            keep_documents: true,
        }
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Set the run style. An empty style is dropped.
    pub fn with_style(mut self, style: RunStyle) -> Self {
        self.style = if style.is_empty() { None } else { Some(style) };
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_keep_documents(mut self, keep: bool) -> Self {
        self.keep_documents = keep;
        self
    }

    /// Output path for a document with the given stem and extension.
    pub fn document_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", stem, extension))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
