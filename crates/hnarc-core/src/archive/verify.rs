//! Check existing archives: decodable, no `null` records, mtime matches content.
//!
//! The resumability gate treats any existing file as complete; this pass is
//! how a truncated or foreign file gets noticed (and then deleted by hand so
//! the next run re-fetches it).

use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::partition::KeyKind;
use crate::storage::TEMP_SUFFIX;

use super::reader::read_archive;
use super::retime::list_archives;
use super::timestamp::record_timestamp;

/// One problem found by [`verify_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyIssue {
    pub path: PathBuf,
    pub problem: String,
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub checked: usize,
    pub records: usize,
    pub issues: Vec<VerifyIssue>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, path: &Path, problem: impl Into<String>) {
        self.issues.push(VerifyIssue {
            path: path.to_path_buf(),
            problem: problem.into(),
        });
    }
}

pub fn verify_dir(dir: &Path, kind: KeyKind) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(TEMP_SUFFIX));
        if is_temp {
            report.issue(&path, "stale temp file from an interrupted write");
        }
    }

    for path in list_archives(dir)? {
        report.checked += 1;
        // Read mtime first: decoding may bump atime but never mtime.
        let mtime = std::fs::metadata(&path)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let records = match read_archive(&path) {
            Ok(r) => r,
            Err(e) => {
                report.issue(&path, format!("unreadable: {:#}", e));
                continue;
            }
        };
        if records.is_empty() {
            report.issue(&path, "archive holds no records");
            continue;
        }
        report.records += records.len();
        let nulls = records.iter().filter(|r| r.is_null()).count();
        if nulls > 0 {
            report.issue(&path, format!("{} null record(s)", nulls));
        }
        match records.iter().filter_map(|r: &Value| record_timestamp(r, kind)).max() {
            Some(ts) if ts == mtime => {}
            Some(ts) => report.issue(&path, format!("mtime {} but newest record is {}", mtime, ts)),
            None => report.issue(&path, format!("no record carries `{}`", kind.timestamp_field())),
        }
    }
    Ok(report)
}
