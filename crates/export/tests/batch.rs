//! Whole batches through the LibreOffice converter, with stub tools.

#![cfg(unix)]

use invite_core::{
    BatchConfig, BatchRunner, BatchSummary, Error, PersonalizedDocument, Result, Substitution,
    TemplateDocument,
};
use invite_export::{ConverterConfig, ExportMode, LibreOfficeConverter};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// `soffice --headless --convert-to <fmt> <doc> --outdir <dir>`
const FAKE_SOFFICE: &str = r#"#!/bin/sh
fmt="$3"; doc="$4"; out="$6"
stem=$(basename "$doc"); stem="${stem%.*}"
printf '%s' "$stem" > "$out/$stem.$fmt"
"#;

/// `pdftoppm -jpeg -r <dpi> <pdf> <prefix>` for a three page PDF.
const FAKE_PDFTOPPM: &str = r#"#!/bin/sh
prefix="$5"
for n in 1 2 3; do printf '%s' "$n" > "$prefix-0$n.jpg"; done
"#;

/// Text file template; enough for the runner, which never looks inside.
struct TextTemplate(String);

impl TemplateDocument for TextTemplate {
    fn load(path: &Path) -> Result<Self> {
        fs::read_to_string(path)
            .map(Self)
            .map_err(|_| Error::MissingInput(path.to_path_buf()))
    }

    fn extension(&self) -> &str {
        "txt"
    }

    fn personalize(&self, substitution: &Substitution<'_>) -> Result<PersonalizedDocument> {
        Ok(PersonalizedDocument {
            bytes: self.0.replace(substitution.placeholder, substitution.value).into_bytes(),
            replacements: self.0.matches(substitution.placeholder).count(),
            slide_count: 1,
        })
    }
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn run_batch(names: &str, mode: ExportMode) -> (tempfile::TempDir, BatchSummary) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("names.txt"), names).unwrap();
    fs::write(dir.path().join("invite.txt"), "Dear {}").unwrap();

    let converter = LibreOfficeConverter::new(
        ConverterConfig::new(script(dir.path(), "soffice", FAKE_SOFFICE))
            .with_mode(mode)
            .with_pdf_program(script(dir.path(), "pdftoppm", FAKE_PDFTOPPM)),
    );
    let config = BatchConfig::new(
        dir.path().join("names.txt"),
        dir.path().join("invite.txt"),
        dir.path().join("out"),
        "{}",
    );

    let summary = BatchRunner::new(&config, &converter)
        .run::<TextTemplate>()
        .unwrap();
    (dir, summary)
}

fn assert_all_images_survive(summary: &BatchSummary) {
    assert!(summary.is_success(), "{}", summary);
    for image in summary.images() {
        assert!(image.is_file(), "{} was removed by a later recipient", image.display());
    }
}

const OVERLAPPING_NAMES: &str = "Alice\nAlice 1\nAlice\nAlice 2\n";

#[test]
fn test_direct_mode_images_of_overlapping_names_survive() {
    let (dir, summary) = run_batch(OVERLAPPING_NAMES, ExportMode::Direct);

    assert_all_images_survive(&summary);
    assert_eq!(summary.images().count(), 4);

    // Every image still holds the content written for its own document.
    let out = dir.path().join("out");
    assert_eq!(fs::read_to_string(out.join("Alice-1.jpg")).unwrap(), "Alice");
    assert_eq!(fs::read_to_string(out.join("Alice-1-1.jpg")).unwrap(), "Alice-1");
}

#[test]
fn test_per_slide_images_of_overlapping_names_survive() {
    let (dir, summary) = run_batch(OVERLAPPING_NAMES, ExportMode::PerSlide);

    assert_all_images_survive(&summary);
    assert_eq!(summary.images().count(), 12);

    // No raw converter output or scratch directory is left behind.
    let leftovers: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.ends_with(".txt") && !name.ends_with(".jpg"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}
