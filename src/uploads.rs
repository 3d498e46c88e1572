//! Upload validation and expiry of old uploads.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Check a multipart content type against the allow-list.
/// Parameters such as `; codecs=...` are ignored.
pub fn is_allowed_content_type(content_type: &str, allowed: &[String]) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    allowed.iter().any(|a| a.eq_ignore_ascii_case(&essence))
}

/// Delete files directly inside `directory` whose modification time is older
/// than `max_age`. Returns the number of files removed.
pub fn clean_expired(directory: &Path, max_age: Duration) -> usize {
    if !directory.is_dir() {
        return 0;
    }

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(modified) => modified,
            None => {
                warn!("Failed to get file info for {}", path.display());
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    info!("Cleaned up old file: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to cleanup old file {}: {}", path.display(), e),
            }
        }
    }

    removed
}
