//! Blob storage key derivation.
//!
//! Keys embed a millisecond wall-clock timestamp so two uploads of files
//! with the same name land under different keys.

use capsule_shared::models::RowId;
use chrono::{DateTime, Utc};

/// `{folder_id}/{unix_millis}-{file_name}`
pub fn image_key(folder_id: &RowId, at: DateTime<Utc>, file_name: &str) -> String {
    format!(
        "{folder_id}/{}-{}",
        at.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// `{unix_millis}.{extension}`
pub fn voicemail_key(at: DateTime<Utc>, extension: &str) -> String {
    format!("{}.{}", at.timestamp_millis(), extension.trim_start_matches('.'))
}

// Keys are path-like; a file name must stay a single segment.
fn sanitize_file_name(name: &str) -> String {
    let cleaned = name
        .trim()
        .replace(['/', '\\'], "_")
        .replace("..", "_");
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
