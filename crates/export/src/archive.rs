//! ZIP archive of exported images.

use invite_core::{Error, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Write `images` into a ZIP archive at `archive_path`, under a top-level
/// folder named `root`. Returns the number of archived images.
///
/// Images are stored without recompression and with a fixed timestamp, so
/// archiving the same images twice gives the same bytes.
pub fn archive_images<'a, I>(images: I, archive_path: &Path, root: &str) -> Result<usize>
where
    I: IntoIterator<Item = &'a Path>,
{
    let file = File::create(archive_path).map_err(|e| Error::write(archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());

    let mut count = 0;
    for image in images {
        let Some(file_name) = image.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping image with non UTF-8 name: {}", image.display());
            continue;
        };
        let entry = if root.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", root, file_name)
        };

        zip.start_file(entry.as_str(), options)
            .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", entry, e)))?;
        let mut source = File::open(image)?;
        io::copy(&mut source, &mut zip).map_err(|e| Error::write(archive_path, e))?;
        count += 1;
    }

    zip.finish()
        .map_err(|e| Error::Zip(format!("Failed to finish {}: {}", archive_path.display(), e)))?;

    log::info!("Archived {} image(s) into {}", count, archive_path.display());
    Ok(count)
}
