//! Image export for personalized documents.
//!
//! Rasterizing is delegated to LibreOffice running headless, optionally
//! followed by `pdftoppm` to get one image per slide. Produced images can be
//! bundled into a ZIP archive.

pub mod archive;
pub mod images;
pub mod libreoffice;
mod process;

pub use archive::archive_images;
pub use libreoffice::{ConverterConfig, ExportMode, ImageFormat, LibreOfficeConverter};
