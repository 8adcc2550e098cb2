//! Stream decompressor and line reader
//!
//! Chains a gzip decoder with a buffered delimiter-splitting reader to yield
//! one [`RawLine`] per newline-delimited record. The archive is never fully
//! decompressed into memory, and individual lines may grow arbitrarily large:
//! the line buffer grows as needed rather than truncating.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::models::RawLine;

/// Lazy, finite, non-restartable sequence of raw lines from a gzip archive
#[derive(Debug)]
pub struct LineStream {
    reader: BufReader<GzDecoder<File>>,
    path: PathBuf,
    ordinal: u64,
    done: bool,
}

impl LineStream {
    /// Open a compressed archive for streaming
    ///
    /// The file is only opened here; corrupt gzip data (bad magic bytes,
    /// truncated blocks, checksum failures) surfaces as a decompression
    /// error from the iterator, which is fatal for the dataset.
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        let file = File::open(path).map_err(|e| ImportError::Decompression {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            reader: BufReader::new(GzDecoder::new(file)),
            path: path.to_path_buf(),
            ordinal: 0,
            done: false,
        })
    }

    /// Ordinal of the most recently yielded line (0 before the first)
    pub fn current_ordinal(&self) -> u64 {
        self.ordinal
    }
}

impl Iterator for LineStream {
    type Item = Result<RawLine, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.done = true;
                None
            },
            Ok(_) => {
                while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                self.ordinal += 1;
                // Invalid UTF-8 is a per-line problem, not archive corruption:
                // degrade lossily and let the parser reject the record.
                let text = String::from_utf8_lossy(&buf).into_owned();
                Some(Ok(RawLine {
                    ordinal: self.ordinal,
                    text,
                }))
            },
            Err(e) => {
                self.done = true;
                Some(Err(ImportError::Decompression {
                    path: self.path.clone(),
                    source: e,
                }))
            },
        }
    }
}
