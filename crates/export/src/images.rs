//! Naming and discovery of exported page images.
//!
//! Every image of a document is named `<stem>-<page>.<ext>` with an
//! unpadded, 1-based page number. The page is everything after the last `-`,
//! so two different stems never share an image name. Raw converter output
//! (`<stem>.<ext>`, `<stem>-01.<ext>`) is only ever written to a scratch
//! directory and moved into place from there.

use invite_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Path of page `page` of `stem`.
pub fn page_path(dir: &Path, stem: &str, page: usize, ext: &str) -> PathBuf {
    dir.join(format!("{}-{}.{}", stem, page, ext))
}

/// Parse the page number from a file name of the form `<stem>-<digits>.<ext>`.
pub fn parse_page(file_name: &str, stem: &str, ext: &str) -> Option<usize> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('-')?;
    let digits = rest.strip_suffix(ext)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// All page images of `stem` in `dir`, sorted by page.
fn find_pages(dir: &Path, stem: &str, ext: &str) -> Result<Vec<(usize, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(page) = parse_page(name, stem, ext) {
            pages.push((page, entry.path()));
        }
    }
    pages.sort();
    Ok(pages)
}

/// Remove page images left over from an earlier export of `stem`.
///
/// Only `<stem>-<page>.<ext>` names are touched. An unnumbered `<stem>.<ext>`
/// may be a page of another stem (`alice-1.jpg` is page 1 of `alice`).
pub fn remove_stale(dir: &Path, stem: &str, ext: &str) -> Result<()> {
    for (_, path) in find_pages(dir, stem, ext)? {
        log::debug!("Removing stale image {}", path.display());
        fs::remove_file(&path).map_err(|e| Error::write(&path, e))?;
    }
    Ok(())
}

/// Move the page images of `stem` from `scratch` into `dir`, renaming
/// zero-padded page numbers (`alice-01.jpg`) to the canonical form
/// (`alice-1.jpg`).
pub fn collect_pages(scratch: &Path, dir: &Path, stem: &str, ext: &str) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for (page, path) in find_pages(scratch, stem, ext)? {
        let canonical = page_path(dir, stem, page, ext);
        fs::rename(&path, &canonical).map_err(|e| Error::write(&canonical, e))?;
        images.push(canonical);
    }
    Ok(images)
}
