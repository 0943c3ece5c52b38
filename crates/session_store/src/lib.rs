//! JSONL journal of documentation agent task executions.
//!
//! Each task execution gets its own file. Line 1 is a versioned header; every
//! further line is one conversation item numbered from 1 in write order.
//! Files are written once, front to back, and read back whole.

mod error;
mod paths;
mod reader;
mod schema;
mod writer;

pub use error::TranscriptError;
pub use paths::{sanitize_timestamp_for_filename, transcript_file_name};
pub use reader::Transcript;
pub use schema::{TranscriptEntry, TranscriptHeader, TranscriptItem, TRANSCRIPT_VERSION};
pub use writer::TranscriptWriter;
