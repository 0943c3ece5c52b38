use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::TranscriptError;
use crate::paths::transcript_file_name;
use crate::schema::{TranscriptEntry, TranscriptHeader, TranscriptItem, TRANSCRIPT_VERSION};

/// Write side of one task transcript. Every line is flushed as it is recorded
/// so a crashed run still leaves a readable prefix.
pub struct TranscriptWriter {
    path: PathBuf,
    out: BufWriter<File>,
    header: TranscriptHeader,
    next_seq: u64,
}

impl TranscriptWriter {
    /// Creates `dir` if needed and starts a fresh transcript file in it.
    pub fn create(dir: &Path, package_root: &Path, provider: &str) -> Result<Self, TranscriptError> {
        if !package_root.is_absolute() {
            return Err(TranscriptError::RelativePackageRoot(package_root.to_path_buf()));
        }
        std::fs::create_dir_all(dir).map_err(|source| TranscriptError::io("create directory for", dir, source))?;

        let header = TranscriptHeader {
            version: TRANSCRIPT_VERSION,
            task_id: Uuid::new_v4().to_string(),
            started_at: now()?,
            package_root: package_root.display().to_string(),
            provider: provider.to_string(),
        };
        let path = dir.join(transcript_file_name(&header.started_at, &header.task_id));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| TranscriptError::io("create", &path, source))?;

        let mut writer = Self {
            path,
            out: BufWriter::new(file),
            header,
            next_seq: 1,
        };
        let header = writer.header.clone();
        writer.write_line(&header)?;
        Ok(writer)
    }

    /// Appends `item` and returns its sequence number.
    pub fn record(&mut self, item: TranscriptItem) -> Result<u64, TranscriptError> {
        let entry = TranscriptEntry {
            seq: self.next_seq,
            ts: now()?,
            item,
        };
        self.write_line(&entry)?;
        self.next_seq += 1;
        Ok(entry.seq)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &TranscriptHeader {
        &self.header
    }

    /// Items recorded so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.next_seq - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_line<T: serde::Serialize>(&mut self, value: &T) -> Result<(), TranscriptError> {
        serde_json::to_writer(&mut self.out, value).map_err(TranscriptError::Encode)?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(|source| TranscriptError::io("append to", &self.path, source))
    }
}

fn now() -> Result<String, TranscriptError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(TranscriptError::Clock)
}
