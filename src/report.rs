//! Renders a [`ScanResult`] for people (text) or tools (JSON).
//!
//! The reporter never reorders or filters: groups come out in the map's
//! filename order and records in the order the scan produced.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use colored::Colorize;

use crate::duplicates::ScanResult;
use crate::error::ScanError;
use crate::utils::format_mod_time;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Opens `path` for appending, creating it if needed.
pub fn open_output(path: &Path) -> Result<BufWriter<std::fs::File>, ScanError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|source| ScanError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Green for the newest record of a group, shading to red for the oldest.
pub fn ramp(index: usize, len: usize) -> (u8, u8, u8) {
    if len < 2 {
        return (0, 255, 0);
    }
    let red = (index as f64 / (len - 1) as f64 * 255.0) as u8;
    (red, 255 - red, 0)
}

pub fn write_report<W: Write>(
    w: &mut W,
    result: &ScanResult,
    format: OutputFormat,
    verbose: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(w, result, verbose),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, result)?;
            writeln!(w)
        }
    }
}

fn write_text<W: Write>(w: &mut W, result: &ScanResult, verbose: bool) -> io::Result<()> {
    for (name, grouping) in &result.groups {
        let files = grouping.records();
        if verbose {
            writeln!(w, "{}", format!("{}:", name.to_string_lossy()).bold())?;
        }

        for (index, file) in files.iter().enumerate() {
            let mut line = file.path.display().to_string();
            if verbose {
                line.push_str(&format!(
                    " ({}b) - Modified on: {}",
                    file.size,
                    format_mod_time(file.modified)
                ));
                if let Some(hash) = &file.hash {
                    line.push_str(&format!(" - Hash: {hash}"));
                }
            }
            let (r, g, b) = ramp(index, files.len());
            writeln!(w, "{}", line.truecolor(r, g, b))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// The closing totals line, printed to the console in verbose mode.
pub fn summary(result: &ScanResult) -> String {
    format!(
        "Total files: {} (with {} uniques)",
        result.total_files, result.total_groups
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{ContentGroup, Grouping};
    use crate::utils::FileRecord;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::{Duration, UNIX_EPOCH};

    fn record(path: &str, hash: Option<&str>) -> FileRecord {
        FileRecord {
            name: "x.txt".into(),
            path: PathBuf::from(path),
            size: 12,
            modified: UNIX_EPOCH + Duration::from_secs(1_000_000),
            hash: hash.map(str::to_string),
        }
    }

    fn render(result: &ScanResult, format: OutputFormat, verbose: bool) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_report(&mut out, result, format, verbose).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn name_result() -> ScanResult {
        let mut groups = BTreeMap::new();
        groups.insert(
            "x.txt".into(),
            Grouping::Name(vec![record("/b/x.txt", None), record("/a/x.txt", None)]),
        );
        ScanResult::new(false, groups)
    }

    #[test]
    fn ramp_runs_green_to_red() {
        assert_eq!(ramp(0, 3), (0, 255, 0));
        assert_eq!(ramp(1, 3), (127, 128, 0));
        assert_eq!(ramp(2, 3), (255, 0, 0));
        assert_eq!(ramp(0, 1), (0, 255, 0));
    }

    #[test]
    fn quiet_text_lists_paths_only() {
        let text = render(&name_result(), OutputFormat::Text, false);
        assert_eq!(text, "/b/x.txt\n/a/x.txt\n\n");
    }

    #[test]
    fn verbose_text_has_header_and_details() {
        let text = render(&name_result(), OutputFormat::Text, true);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "x.txt:");
        assert!(lines[1].starts_with("/b/x.txt (12b) - Modified on: "));
        assert!(lines[2].starts_with("/a/x.txt (12b) - Modified on: "));
        assert!(!text.contains("Hash:"));
    }

    #[test]
    fn strict_text_shows_hashes() {
        let mut groups = BTreeMap::new();
        groups.insert(
            "x.txt".into(),
            Grouping::Content(vec![ContentGroup {
                hash: "abc".to_string(),
                files: vec![record("/b/x.txt", Some("abc")), record("/a/x.txt", Some("abc"))],
            }]),
        );
        let text = render(&ScanResult::new(true, groups), OutputFormat::Text, true);
        assert_eq!(text.matches(" - Hash: abc").count(), 2);
    }

    #[test]
    fn json_carries_groups_and_counters() {
        let json = render(&name_result(), OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_files"], 2);
        assert_eq!(value["total_groups"], 1);
        assert_eq!(value["groups"]["x.txt"][0]["path"], "/b/x.txt");
        assert!(value["groups"]["x.txt"][0].get("hash").is_none());
    }

    #[test]
    fn summary_reports_totals() {
        assert_eq!(summary(&name_result()), "Total files: 2 (with 1 uniques)");
    }

    #[test]
    fn output_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "previous\n").unwrap();

        let mut out = open_output(&path).unwrap();
        writeln!(out, "next").unwrap();
        out.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous\nnext\n");
    }

    #[test]
    fn unopenable_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_output(&dir.path().join("missing/report.txt")).unwrap_err();
        assert!(matches!(err, ScanError::OutputWrite { .. }));
    }
}
