//! Name source reader.
//!
//! Reads a line-delimited list of recipient names. Blank lines are skipped,
//! names are trimmed, and the sequence is produced lazily. Calling
//! [`NameSource::recipients`] again reopens the file, so the sequence can be
//! replayed.

use crate::error::{Error, Result};
use crate::types::Recipient;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

const UTF8_BOM: char = '\u{feff}';

/// A name list on disk.
#[derive(Debug, Clone)]
pub struct NameSource {
    path: PathBuf,
}

impl NameSource {
    /// Open a name list. Fails with [`Error::MissingInput`] if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::MissingInput(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh pass over the recipients.
    pub fn recipients(&self) -> Result<Recipients<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingInput(self.path.clone()),
            _ => Error::Io(e),
        })?;
        Ok(Recipients::new(BufReader::new(file)))
    }

    /// Read every recipient. Fails with [`Error::EmptyInput`] if there are none.
    pub fn load(&self) -> Result<Vec<Recipient>> {
        let recipients = self.recipients()?.collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(Error::EmptyInput(self.path.clone()));
        }
        Ok(recipients)
    }
}

/// Lazy iterator over the recipients of a name list.
#[derive(Debug)]
pub struct Recipients<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> Recipients<R> {
    /// Iterate over the recipients in any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Recipients<R> {
    type Item = Result<Recipient>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Some(Err(Error::InvalidInput(format!(
                        "line {} is not valid UTF-8",
                        self.line + 1
                    ))));
                }
                Err(e) => return Some(Err(Error::Io(e))),
            };
            self.line += 1;

            let raw = if self.line == 1 {
                raw.trim_start_matches(UTF8_BOM)
            } else {
                raw.as_str()
            };

            if let Some(recipient) = Recipient::from_line(raw, self.line) {
                return Some(Ok(recipient));
            }
        }
    }
}
