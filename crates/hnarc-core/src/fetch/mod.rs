//! Bounded fetch client.
//!
//! Issues one request per key of a bundle group through a single curl multi
//! handle, keeping at most `max_in_flight` transfers active. Each request
//! retries transport failures with backoff on its own; the first failure that
//! outlives its retries aborts the rest of the group. A literal `null` body is
//! an empty result, not an error.

mod endpoint;
mod handler;
mod max_item;
mod run;

pub use endpoint::Endpoints;
pub use max_item::fetch_max_item;

use std::time::Duration;

use crate::partition::{FetchKey, KeyKind};
use crate::retry::{FetchError, RetryPolicy};

/// Per-key result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw JSON text of the record.
    Payload(Vec<u8>),
    /// The API has no record for this key.
    Empty,
}

impl FetchOutcome {
    /// Classify a response body: `null` (ignoring surrounding whitespace) or
    /// an empty body is `Empty`, anything else is kept verbatim.
    pub fn from_body(body: Vec<u8>) -> Self {
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Payload(body)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty)
    }
}

/// Counters for one source over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests started, including retries.
    pub requests: u64,
    /// Requests re-issued after a retryable failure.
    pub retries: u64,
    /// Highest number of requests simultaneously in flight.
    pub peak_in_flight: usize,
}

/// Anything that can resolve a batch of fetch keys to records.
///
/// Implementations return one outcome per key, in key order, or the first
/// failure that survived per-request retries.
pub trait RecordSource {
    fn fetch_group(&mut self, keys: &[FetchKey]) -> Result<Vec<FetchOutcome>, FetchError>;

    fn stats(&self) -> FetchStats;
}

/// Transfer settings for [`HttpSource`].
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub max_in_flight: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 25,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP record source over one curl multi handle (connections are reused
/// across groups for the life of the process).
pub struct HttpSource {
    multi: curl::multi::Multi,
    endpoints: Endpoints,
    kind: KeyKind,
    opts: HttpOptions,
    stats: FetchStats,
}

impl HttpSource {
    pub fn new(endpoints: Endpoints, kind: KeyKind, opts: HttpOptions) -> Self {
        Self {
            multi: curl::multi::Multi::new(),
            endpoints,
            kind,
            opts,
            stats: FetchStats::default(),
        }
    }
}

impl RecordSource for HttpSource {
    fn fetch_group(&mut self, keys: &[FetchKey]) -> Result<Vec<FetchOutcome>, FetchError> {
        run::run_group(
            &self.multi,
            &self.endpoints,
            self.kind,
            keys,
            &self.opts,
            &mut self.stats,
        )
    }

    fn stats(&self) -> FetchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_body_is_empty() {
        assert_eq!(FetchOutcome::from_body(b"null".to_vec()), FetchOutcome::Empty);
        assert_eq!(FetchOutcome::from_body(b" null\n".to_vec()), FetchOutcome::Empty);
        assert_eq!(FetchOutcome::from_body(Vec::new()), FetchOutcome::Empty);
    }

    #[test]
    fn record_body_is_kept_verbatim() {
        let body = br#"{"id":1,"time":1160418111,"type":"story"}"#.to_vec();
        assert_eq!(
            FetchOutcome::from_body(body.clone()),
            FetchOutcome::Payload(body)
        );
        assert!(!FetchOutcome::from_body(b"\"null\"".to_vec()).is_empty());
    }
}
