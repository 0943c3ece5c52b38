pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Replaces characters that are not portable in file names.
#[must_use]
pub fn sanitize_timestamp_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            _ => c,
        })
        .collect()
}

/// `<started_at>_<task_id>.jsonl`, so a directory listing sorts by start time.
#[must_use]
pub fn transcript_file_name(started_at: &str, task_id: &str) -> String {
    format!(
        "{}_{task_id}.{TRANSCRIPT_EXTENSION}",
        sanitize_timestamp_for_filename(started_at)
    )
}
