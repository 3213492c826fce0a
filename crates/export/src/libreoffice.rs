//! LibreOffice-backed converter.

use crate::images;
use crate::process::run_with_timeout;
use invite_core::{Converter, Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

/// Image file format produced by the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
}

impl ImageFormat {
    /// File extension, also used as the LibreOffice filter name.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    /// Output format flag for pdftoppm.
    fn pdftoppm_flag(self) -> &'static str {
        match self {
            Self::Jpg => "-jpeg",
            Self::Png => "-png",
        }
    }
}

/// How documents are rasterized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// LibreOffice's image filter. It renders the first slide only.
    #[default]
    Direct,
    /// LibreOffice to PDF, then pdftoppm for one image per slide.
    PerSlide,
}

/// Settings for [`LibreOfficeConverter`].
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// LibreOffice executable (`libreoffice` or `soffice`).
    pub program: OsString,

    pub mode: ExportMode,

    pub format: ImageFormat,

    /// Upper bound on each external process.
    pub timeout: Duration,

    /// Resolution used in per-slide mode.
    pub dpi: u32,

    /// PDF rasterizer used in per-slide mode.
    pub pdf_program: OsString,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "libreoffice".into(),
            mode: ExportMode::default(),
            format: ImageFormat::default(),
            timeout: Duration::from_secs(120),
            dpi: 150,
            pdf_program: "pdftoppm".into(),
        }
    }
}

impl ConverterConfig {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn with_pdf_program(mut self, program: impl Into<OsString>) -> Self {
        self.pdf_program = program.into();
        self
    }
}

/// Converts documents to images by running LibreOffice headless.
#[derive(Debug, Clone, Default)]
pub struct LibreOfficeConverter {
    config: ConverterConfig,
}

impl LibreOfficeConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// `<program> --headless --convert-to <filter> <document> --outdir <dir>`
    fn soffice(&self, document: &Path, output_dir: &Path, filter: &str) -> Result<()> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg(filter)
            .arg(document)
            .arg("--outdir")
            .arg(output_dir);
        run_with_timeout(&mut cmd, self.config.timeout)
    }

    /// Scratch directory for raw converter output, removed on drop.
    ///
    /// LibreOffice names its output after the document, and `alice-1.jpg`
    /// for `alice-1.pptx` is also page 1 of `alice`.
    fn scratch_dir(output_dir: &Path) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(".render-")
            .tempdir_in(output_dir)
            .map_err(|e| Error::write(output_dir, e))
    }

    fn convert_direct(&self, document: &Path, output_dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        let ext = self.config.format.extension();
        let scratch = Self::scratch_dir(output_dir)?;
        self.soffice(document, scratch.path(), ext)?;

        let produced = scratch.path().join(format!("{}.{}", stem, ext));
        if !produced.is_file() {
            return Err(Error::Conversion(format!(
                "converter reported success but {}.{} was not produced",
                stem, ext
            )));
        }

        let target = images::page_path(output_dir, stem, 1, ext);
        fs::rename(&produced, &target).map_err(|e| Error::write(&target, e))?;
        Ok(vec![target])
    }

    fn convert_per_slide(&self, document: &Path, output_dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        let ext = self.config.format.extension();
        let scratch = Self::scratch_dir(output_dir)?;
        self.soffice(document, scratch.path(), "pdf")?;

        let pdf = scratch.path().join(format!("{}.pdf", stem));
        if !pdf.is_file() {
            return Err(Error::Conversion(format!(
                "converter reported success but {}.pdf was not produced",
                stem
            )));
        }

        let mut cmd = Command::new(&self.config.pdf_program);
        cmd.arg(self.config.format.pdftoppm_flag())
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(&pdf)
            .arg(scratch.path().join(stem));
        run_with_timeout(&mut cmd, self.config.timeout)?;

        images::collect_pages(scratch.path(), output_dir, stem, ext)
    }
}

impl Converter for LibreOfficeConverter {
    fn convert(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let stem = document
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Conversion(format!("Bad document name: {}", document.display())))?;
        let ext = self.config.format.extension();

        images::remove_stale(output_dir, stem, ext)?;

        let images = match self.config.mode {
            ExportMode::Direct => self.convert_direct(document, output_dir, stem)?,
            ExportMode::PerSlide => self.convert_per_slide(document, output_dir, stem)?,
        };

        if images.is_empty() {
            return Err(Error::Conversion(format!(
                "no images produced for {}",
                document.display()
            )));
        }

        log::debug!("Exported {} image(s) for {}", images.len(), document.display());
        Ok(images)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script into `dir`.
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Sorted file names in `dir`.
    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Mimics `soffice --headless --convert-to <fmt> <doc> --outdir <dir>`.
    const FAKE_SOFFICE: &str = r#"fmt="$3"; doc="$4"; out="$6"
stem=$(basename "$doc"); stem="${stem%.*}"
printf 'image' > "$out/$stem.$fmt""#;

    /// Mimics `pdftoppm -jpeg -r <dpi> <pdf> <prefix>` for a three page PDF.
    const FAKE_PDFTOPPM: &str = r#"prefix="$5"
for n in 1 2 3; do printf 'page' > "$prefix-$n.jpg"; done"#;

    struct Setup {
        dir: tempfile::TempDir,
        out: PathBuf,
        document: PathBuf,
    }

    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let document = out.join("Alice.pptx");
        fs::write(&document, b"pptx").unwrap();
        Setup { dir, out, document }
    }

    #[test]
    fn test_direct_mode_renames_to_first_page() {
        let s = setup();
        let soffice = script(s.dir.path(), "soffice", FAKE_SOFFICE);
        let converter = LibreOfficeConverter::new(ConverterConfig::new(soffice));

        let images = converter.convert(&s.document, &s.out).unwrap();

        assert_eq!(images, vec![s.out.join("Alice-1.jpg")]);
        assert!(!s.out.join("Alice.jpg").exists());
        assert_eq!(entries(&s.out), vec!["Alice-1.jpg", "Alice.pptx"]);
    }

    #[test]
    fn test_per_slide_mode() {
        let s = setup();
        let soffice = script(s.dir.path(), "soffice", FAKE_SOFFICE);
        let pdftoppm = script(s.dir.path(), "pdftoppm", FAKE_PDFTOPPM);
        let converter = LibreOfficeConverter::new(
            ConverterConfig::new(soffice)
                .with_mode(ExportMode::PerSlide)
                .with_pdf_program(pdftoppm),
        );

        let images = converter.convert(&s.document, &s.out).unwrap();

        assert_eq!(
            images,
            vec![
                s.out.join("Alice-1.jpg"),
                s.out.join("Alice-2.jpg"),
                s.out.join("Alice-3.jpg")
            ]
        );
        assert!(!s.out.join("Alice.pdf").exists());
        assert_eq!(
            entries(&s.out),
            vec!["Alice-1.jpg", "Alice-2.jpg", "Alice-3.jpg", "Alice.pptx"]
        );
    }

    /// Convert `Alice` and then a document whose stem is `Alice-1`.
    fn convert_alice_then_alice_1(config: ConverterConfig) -> (Setup, Vec<PathBuf>, Vec<PathBuf>) {
        let s = setup();
        let converter = LibreOfficeConverter::new(config);
        let second = s.out.join("Alice-1.pptx");
        fs::write(&second, b"pptx").unwrap();

        let first_images = converter.convert(&s.document, &s.out).unwrap();
        let second_images = converter.convert(&second, &s.out).unwrap();
        (s, first_images, second_images)
    }

    #[test]
    fn test_direct_mode_keeps_pages_of_overlapping_stems() {
        let tools = tempfile::tempdir().unwrap();
        let soffice = script(tools.path(), "soffice", FAKE_SOFFICE);

        let (s, first, second) = convert_alice_then_alice_1(ConverterConfig::new(soffice));

        assert_eq!(first, vec![s.out.join("Alice-1.jpg")]);
        assert_eq!(second, vec![s.out.join("Alice-1-1.jpg")]);
        assert!(first.iter().chain(&second).all(|image| image.is_file()));
    }

    #[test]
    fn test_per_slide_mode_keeps_pages_of_overlapping_stems() {
        let tools = tempfile::tempdir().unwrap();
        let soffice = script(tools.path(), "soffice", FAKE_SOFFICE);
        let pdftoppm = script(tools.path(), "pdftoppm", FAKE_PDFTOPPM);

        let (s, first, second) = convert_alice_then_alice_1(
            ConverterConfig::new(soffice)
                .with_mode(ExportMode::PerSlide)
                .with_pdf_program(pdftoppm),
        );

        assert_eq!(first.len(), 3);
        assert_eq!(second[0], s.out.join("Alice-1-1.jpg"));
        assert!(first.iter().chain(&second).all(|image| image.is_file()));
    }

    #[test]
    fn test_png_format() {
        let s = setup();
        let soffice = script(s.dir.path(), "soffice", FAKE_SOFFICE);
        let converter =
            LibreOfficeConverter::new(ConverterConfig::new(soffice).with_format(ImageFormat::Png));

        let images = converter.convert(&s.document, &s.out).unwrap();
        assert_eq!(images, vec![s.out.join("Alice-1.png")]);
    }

    #[test]
    fn test_rerun_replaces_stale_images() {
        let s = setup();
        fs::write(s.out.join("Alice-7.jpg"), b"old").unwrap();
        let soffice = script(s.dir.path(), "soffice", FAKE_SOFFICE);
        let converter = LibreOfficeConverter::new(ConverterConfig::new(soffice));

        let first = converter.convert(&s.document, &s.out).unwrap();
        let second = converter.convert(&s.document, &s.out).unwrap();

        assert_eq!(first, second);
        assert!(!s.out.join("Alice-7.jpg").exists());
    }

    #[test]
    fn test_missing_converter() {
        let s = setup();
        let converter = LibreOfficeConverter::new(ConverterConfig::new(s.dir.path().join("no-soffice")));

        let err = converter.convert(&s.document, &s.out).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_success_without_output_is_failure() {
        let s = setup();
        let soffice = script(s.dir.path(), "soffice", "exit 0");
        let converter = LibreOfficeConverter::new(ConverterConfig::new(soffice));

        let err = converter.convert(&s.document, &s.out).unwrap_err();
        assert!(matches!(err, Error::Conversion(msg) if msg.contains("was not produced")));
    }

    #[test]
    fn test_hanging_converter_times_out() {
        let s = setup();
        let soffice = script(s.dir.path(), "soffice", "exec sleep 10");
        let converter = LibreOfficeConverter::new(
            ConverterConfig::new(soffice).with_timeout(Duration::from_millis(200)),
        );

        let err = converter.convert(&s.document, &s.out).unwrap_err();
        assert!(matches!(err, Error::Conversion(msg) if msg.contains("timed out")));
    }
}
