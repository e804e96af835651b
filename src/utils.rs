use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// One non-directory entry found while walking a root.
///
/// `hash` stays `None` until strict-mode verification hashes the record,
/// which only happens for members of a multi-file name group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Base filename, the grouping key. Kept as raw OS bytes so names that
    /// aren't valid UTF-8 never collapse into the same key.
    #[serde(serialize_with = "serialize_name")]
    pub name: OsString,
    /// Full path, unique per record within a group.
    pub path: PathBuf,
    pub size: u64,
    #[serde(serialize_with = "serialize_mod_time")]
    pub modified: SystemTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl FileRecord {
    /// Newest first, then full path ascending so equal timestamps still
    /// produce the same order on every run.
    pub fn newest_first(a: &FileRecord, b: &FileRecord) -> Ordering {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    }
}

/// Formats a modification time as RFC 3339 in the local offset, falling
/// back to UTC when the local offset can't be determined.
pub fn format_mod_time(modified: SystemTime) -> String {
    let utc = OffsetDateTime::from(modified);
    let local = match UtcOffset::current_local_offset() {
        Ok(offset) => utc.to_offset(offset),
        Err(_) => utc,
    };
    local
        .format(&Rfc3339)
        .unwrap_or_else(|_| format!("{modified:?}"))
}

/// Serializes a filename lossily; invalid UTF-8 shows as U+FFFD.
pub fn serialize_name<S: Serializer>(name: &OsString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&name.to_string_lossy())
}

fn serialize_mod_time<S: Serializer>(modified: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_mod_time(*modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn record(path: &str, secs: u64) -> FileRecord {
        FileRecord {
            name: "x.txt".into(),
            path: PathBuf::from(path),
            size: 0,
            modified: UNIX_EPOCH + Duration::from_secs(secs),
            hash: None,
        }
    }

    #[test]
    fn newest_first_orders_by_mtime_then_path() {
        let mut files = vec![record("/b/x.txt", 10), record("/c/x.txt", 20), record("/a/x.txt", 10)];
        files.sort_by(FileRecord::newest_first);
        let paths: Vec<_> = files.iter().map(|f| f.path.to_str().unwrap()).collect();
        assert_eq!(paths, ["/c/x.txt", "/a/x.txt", "/b/x.txt"]);
    }

    #[test]
    fn mod_time_formats_as_rfc3339() {
        let formatted = format_mod_time(UNIX_EPOCH + Duration::from_secs(86_400 * 365));
        assert!(formatted.starts_with("1970-12-31") || formatted.starts_with("1971-01-01"));
    }
}
