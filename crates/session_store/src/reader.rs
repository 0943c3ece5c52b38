use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::TranscriptError;
use crate::schema::{TranscriptEntry, TranscriptHeader, TranscriptItem, TRANSCRIPT_VERSION};

/// A transcript read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    path: PathBuf,
    header: TranscriptHeader,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Reads and checks a whole transcript file.
    ///
    /// The header must carry a known version and entries must be numbered
    /// 1, 2, 3... with RFC 3339 timestamps. Blank trailing lines are ignored.
    pub fn read(path: &Path) -> Result<Self, TranscriptError> {
        let file = File::open(path).map_err(|source| TranscriptError::io("open", path, source))?;
        let mut lines = BufReader::new(file).lines().enumerate();

        let header: TranscriptHeader = match lines.next() {
            Some((_, line)) => {
                let line = line.map_err(|source| TranscriptError::io("read", path, source))?;
                decode(path, 1, &line)?
            }
            None => return Err(TranscriptError::Empty { path: path.to_path_buf() }),
        };
        if header.version != TRANSCRIPT_VERSION {
            return Err(TranscriptError::Version {
                path: path.to_path_buf(),
                found: header.version,
                expected: TRANSCRIPT_VERSION,
            });
        }
        check_timestamp(path, 1, &header.started_at)?;

        let mut entries: Vec<TranscriptEntry> = Vec::new();
        for (index, line) in lines {
            let line_number = index + 1;
            let line = line.map_err(|source| TranscriptError::io("read", path, source))?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: TranscriptEntry = decode(path, line_number, &line)?;
            let expected = entries.len() as u64 + 1;
            if entry.seq != expected {
                return Err(TranscriptError::OutOfOrder {
                    path: path.to_path_buf(),
                    line: line_number,
                    expected,
                    found: entry.seq,
                });
            }
            check_timestamp(path, line_number, &entry.ts)?;
            entries.push(entry);
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            entries,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &TranscriptHeader {
        &self.header
    }

    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Conversation items in the order they were recorded.
    #[must_use]
    pub fn items(&self) -> Vec<TranscriptItem> {
        self.entries.iter().map(|entry| entry.item.clone()).collect()
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    path: &Path,
    line: usize,
    text: &str,
) -> Result<T, TranscriptError> {
    serde_json::from_str(text).map_err(|source| TranscriptError::Malformed {
        path: path.to_path_buf(),
        line,
        source,
    })
}

fn check_timestamp(path: &Path, line: usize, value: &str) -> Result<(), TranscriptError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(|_| ())
        .map_err(|_| TranscriptError::Timestamp {
            path: path.to_path_buf(),
            line,
            value: value.to_string(),
        })
}
