//! PPTX (Office Open XML) template backend for invitation generation.
//!
//! A .pptx file is a ZIP archive of XML parts. Personalizing a template
//! rewrites the text runs of each slide part and copies every other entry
//! unchanged.

mod package;
mod rewrite;
pub mod template;

pub use template::PptxTemplate;

#[cfg(test)]
pub(crate) mod testutil;
