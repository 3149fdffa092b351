//! Archive naming, writing, reading and timestamp repair.
//!
//! A bundle archive is the zstd-compressed raw concatenation of its records'
//! JSON, named `{firstKey}-{lastKey}.zst` after the bundle's key range (not the
//! keys that happened to be present). In single mode each record is written
//! uncompressed as `{key}.json`. Every archive's mtime and atime are the
//! newest content timestamp among its records.

mod reader;
mod retime;
mod timestamp;
mod verify;
mod writer;

pub use reader::{read_archive, split_records};
pub use retime::{list_archives, retime_dir, RetimeReport};
pub use timestamp::{content_timestamp, record_timestamp};
pub use verify::{verify_dir, VerifyIssue, VerifyReport};
pub use writer::{write_bundle, write_single, write_unit};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::partition::Bundle;

/// File extension of compressed bundle archives.
pub const BUNDLE_EXT: &str = "zst";
/// File extension of single-record archives.
pub const SINGLE_EXT: &str = "json";

/// How records map to archive files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// One compressed archive per bundle.
    Bundled,
    /// One `{key}.json` per record.
    Single,
}

/// Content problems that make a bundle unarchivable.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No record in the bundle carries a usable timestamp.
    #[error("{archive}: no record carries a `{field}` timestamp")]
    NoTimestamp { archive: String, field: &'static str },
    /// A record is not valid JSON.
    #[error("{archive}: record {index} is not valid JSON: {source}")]
    Malformed {
        archive: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Canonical file name of a bundle's archive.
pub fn archive_name(bundle: &Bundle, mode: ArchiveMode) -> String {
    match mode {
        ArchiveMode::Bundled => format!("{}-{}.{}", bundle.first(), bundle.last(), BUNDLE_EXT),
        ArchiveMode::Single => format!("{}.{}", bundle.first(), SINGLE_EXT),
    }
}

pub fn archive_path(dir: &Path, bundle: &Bundle, mode: ArchiveMode) -> PathBuf {
    dir.join(archive_name(bundle, mode))
}
