//! Fetch error type for retry classification.

use thiserror::Error;

/// Error returned when a record could not be fetched. Carries the fetch key
/// so a failed batch can be reported with enough context to re-run it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection refused/reset, DNS, ...).
    #[error("fetch {key}: {source}")]
    Transport {
        key: String,
        #[source]
        source: curl::Error,
    },
    /// Response had a non-2xx status.
    #[error("fetch {key}: HTTP {status}")]
    Http { key: String, status: u32 },
    /// The curl multi handle itself failed; not tied to a single key.
    #[error("curl multi: {0}")]
    Multi(#[from] curl::MultiError),
    /// A non-HTTP record source could not serve the key.
    #[error("fetch {key}: {reason}")]
    Unavailable { key: String, reason: String },
}

impl FetchError {
    /// Key whose request failed, when the failure is tied to one.
    pub fn key(&self) -> Option<&str> {
        match self {
            FetchError::Transport { key, .. }
            | FetchError::Http { key, .. }
            | FetchError::Unavailable { key, .. } => Some(key),
            FetchError::Multi(_) => None,
        }
    }
}
