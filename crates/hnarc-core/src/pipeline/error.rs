use thiserror::Error;

use crate::archive::ArchiveError;
use crate::retry::FetchError;

/// Failures that end a chunk. The chunk's process exits non-zero; other
/// chunks are unaffected.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// A group kept failing after every group retry.
    #[error(
        "group {range} failed after {attempts} attempt(s); not written: {}",
        .archives.join(", ")
    )]
    GroupExhausted {
        range: String,
        attempts: u32,
        archives: Vec<String>,
        #[source]
        source: FetchError,
    },
    /// Fetched content cannot be archived (e.g. no record has a timestamp).
    #[error(transparent)]
    Malformed(#[from] ArchiveError),
    /// Writing an archive failed (disk full, permissions, ...).
    #[error("writing {archive}: {cause:#}")]
    Write { archive: String, cause: anyhow::Error },
    /// Inconsistent input, such as an outcome count that does not match the keys.
    #[error("{0:#}")]
    Fatal(anyhow::Error),
}
