//! CLI tool for generating personalized invitation images.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use invite_core::{BatchConfig, BatchRunner, BatchSummary, DuplicatePolicy, RunStyle};
use invite_export::{ConverterConfig, ExportMode, ImageFormat, LibreOfficeConverter};
use invite_pptx::PptxTemplate;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Exit code when at least one recipient failed, or the archive could not be written.
const EXIT_RECIPIENT_FAILED: u8 = 1;

/// Exit code when the run could not start or finish.
const EXIT_FATAL: u8 = 2;

/// Generate one personalized invitation image per name from a PowerPoint template.
#[derive(Parser, Debug)]
#[command(name = "invite-gen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text file with one guest name per line
    #[arg(short, long, default_value = "names.txt")]
    names: PathBuf,

    /// PowerPoint template containing the placeholder
    #[arg(short, long, default_value = "invite.pptx")]
    template: PathBuf,

    /// Directory for generated presentations and images
    #[arg(short, long, default_value = "output-images")]
    output: PathBuf,

    /// Placeholder text replaced by each name
    #[arg(short, long, default_value = "{}")]
    placeholder: String,

    /// Text prepended to each name in output file names
    #[arg(long, default_value = "")]
    prefix: String,

    /// Font applied to text that contained the placeholder
    #[arg(long)]
    font: Option<String>,

    /// Font size in points applied to text that contained the placeholder
    #[arg(long)]
    font_size: Option<f32>,

    /// What to do when two names map to the same file name
    #[arg(long, value_enum, default_value_t = Duplicates::Rename)]
    duplicates: Duplicates,

    /// Delete generated presentations once their images exist
    #[arg(long)]
    remove_documents: bool,

    /// LibreOffice executable
    #[arg(long, default_value = "libreoffice")]
    converter: PathBuf,

    /// How slides are rasterized
    #[arg(long, value_enum, default_value_t = Mode::Direct)]
    mode: Mode,

    /// Image format
    #[arg(long, value_enum, default_value_t = Format::Jpg)]
    format: Format,

    /// Seconds to wait for each converter run
    #[arg(long, default_value = "120")]
    timeout: u64,

    /// Resolution for per-slide export
    #[arg(long, default_value = "150")]
    dpi: u32,

    /// ZIP archive collecting all images
    #[arg(long, default_value = "invitations.zip")]
    archive: PathBuf,

    /// Do not create the ZIP archive
    #[arg(long)]
    no_archive: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Duplicates {
    Rename,
    Reject,
    Overwrite,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(value: Duplicates) -> Self {
        match value {
            Duplicates::Rename => Self::Rename,
            Duplicates::Reject => Self::Reject,
            Duplicates::Overwrite => Self::Overwrite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// First slide only, straight from LibreOffice
    Direct,
    /// Every slide, via PDF and pdftoppm
    PerSlide,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Jpg,
    Png,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_RECIPIENT_FAILED),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Run the batch and report its outcome. Returns whether every step succeeded.
///
/// Only failures that stop the batch from running are errors; a failed
/// archive still leaves every image on disk.
fn run(args: &Args) -> Result<bool> {
    let config = batch_config(args);
    let converter = LibreOfficeConverter::new(converter_config(args));

    if args.verbose {
        eprintln!(
            "Generating invitations from {} and {}",
            config.names_file.display(),
            config.template.display()
        );
    }

    let summary = BatchRunner::new(&config, &converter)
        .run::<PptxTemplate>()
        .context("Invitation batch aborted")?;

    print_summary(&summary, args.json)?;

    let mut complete = summary.is_success();
    if !args.no_archive {
        if let Err(e) = write_archive(&summary, &args.archive, &args.output) {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            complete = false;
        }
    }

    Ok(complete)
}

/// Build the batch configuration from the command line.
fn batch_config(args: &Args) -> BatchConfig {
    let mut style = RunStyle::new();
    if let Some(font) = &args.font {
        style = style.with_typeface(font);
    }
    if let Some(size) = args.font_size {
        style = style.with_size_pt(size);
    }

    BatchConfig::new(&args.names, &args.template, &args.output, &args.placeholder)
        .with_file_prefix(&args.prefix)
        .with_style(style)
        .with_duplicates(args.duplicates.into())
        .with_keep_documents(!args.remove_documents)
}

fn converter_config(args: &Args) -> ConverterConfig {
    let mode = match args.mode {
        Mode::Direct => ExportMode::Direct,
        Mode::PerSlide => ExportMode::PerSlide,
    };
    let format = match args.format {
        Format::Jpg => ImageFormat::Jpg,
        Format::Png => ImageFormat::Png,
    };

    ConverterConfig::new(&args.converter)
        .with_mode(mode)
        .with_format(format)
        .with_timeout(Duration::from_secs(args.timeout.max(1)))
        .with_dpi(args.dpi)
}

fn print_summary(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
        println!("{}", text);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

/// Bundle every produced image into the archive, if there are any.
fn write_archive(summary: &BatchSummary, archive: &Path, output_dir: &Path) -> Result<()> {
    let images: Vec<&Path> = summary.images().map(PathBuf::as_path).collect();
    if images.is_empty() {
        log::warn!("No images produced; skipping {}", archive.display());
        return Ok(());
    }

    let root = output_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("images");

    invite_export::archive_images(images, archive, root)
        .with_context(|| format!("Failed to write {}", archive.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_no_arguments() {
        let args = Args::try_parse_from(["invite-gen"]).unwrap();
        let config = batch_config(&args);

        assert_eq!(config.names_file, PathBuf::from("names.txt"));
        assert_eq!(config.template, PathBuf::from("invite.pptx"));
        assert_eq!(config.output_dir, PathBuf::from("output-images"));
        assert_eq!(config.placeholder, "{}");
        assert!(config.style.is_none());
        assert!(config.keep_documents);
        assert_eq!(args.archive, PathBuf::from("invitations.zip"));
    }

    #[test]
    fn test_style_flags() {
        let args =
            Args::try_parse_from(["invite-gen", "--font", "2 Davat", "--font-size", "36"]).unwrap();
        let style = batch_config(&args).style.unwrap();

        assert_eq!(style.typeface.as_deref(), Some("2 Davat"));
        assert_eq!(style.size_hundredths(), Some(3600));
    }

    #[test]
    fn test_converter_flags() {
        let args = Args::try_parse_from([
            "invite-gen",
            "--mode",
            "per-slide",
            "--format",
            "png",
            "--timeout",
            "5",
            "--converter",
            "soffice",
        ])
        .unwrap();
        let config = converter_config(&args);

        assert_eq!(config.mode, ExportMode::PerSlide);
        assert_eq!(config.format, ImageFormat::Png);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.program, "soffice");
    }

    #[test]
    fn test_duplicate_policy_flag() {
        let args = Args::try_parse_from(["invite-gen", "--duplicates", "reject"]).unwrap();
        assert_eq!(batch_config(&args).duplicates, DuplicatePolicy::Reject);
    }
}
