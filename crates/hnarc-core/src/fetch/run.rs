//! Curl multi event loop for one bundle group: perform, wait, messages;
//! per-request retry with backoff; first unrecoverable failure cancels the rest.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use curl::multi::{Easy2Handle, Multi};

use crate::partition::{FetchKey, KeyKind};
use crate::retry::{classify, FetchError, RetryDecision};

use super::endpoint::Endpoints;
use super::handler::BodyHandler;
use super::{FetchOutcome, FetchStats, HttpOptions};

/// Active transfer: handle, index of its key in the group, attempt number.
type ActiveItem = (Easy2Handle<BodyHandler>, usize, u32);

/// Longest single wait inside the loop, so retries come due promptly.
const MAX_WAIT: Duration = Duration::from_millis(100);

/// Fetch every key of `keys`, keeping at most `opts.max_in_flight` transfers
/// active. Returns outcomes in key order.
pub(super) fn run_group(
    multi: &Multi,
    endpoints: &Endpoints,
    kind: KeyKind,
    keys: &[FetchKey],
    opts: &HttpOptions,
    stats: &mut FetchStats,
) -> Result<Vec<FetchOutcome>, FetchError> {
    let max_in_flight = opts.max_in_flight.max(1);
    let mut results: Vec<Option<FetchOutcome>> = (0..keys.len()).map(|_| None).collect();
    let mut pending: VecDeque<(usize, u32)> = (0..keys.len()).map(|i| (i, 1)).collect();
    let mut retry_after: Vec<(Instant, usize, u32)> = Vec::new();
    let mut active: Vec<ActiveItem> = Vec::with_capacity(max_in_flight);

    refill_active(
        multi,
        endpoints,
        kind,
        keys,
        opts,
        &mut active,
        &mut pending,
        &mut retry_after,
        stats,
    )?;

    while !active.is_empty() || !retry_after.is_empty() {
        if active.is_empty() {
            // Everything left is backing off; nothing for curl to do.
            std::thread::sleep(next_retry_wait(&retry_after));
        } else {
            multi.perform()?;
            let mut completed: Vec<(usize, Result<(), curl::Error>)> = Vec::new();
            multi.messages(|msg| {
                for (i, (handle, ..)) in active.iter().enumerate() {
                    if let Some(res) = msg.result_for2(handle) {
                        completed.push((i, res));
                        break;
                    }
                }
            });
            completed.sort_by(|a, b| b.0.cmp(&a.0));

            for (i, transfer) in completed {
                let (handle, index, attempt) = active.remove(i);
                let mut easy = multi.remove2(handle)?;
                let key = &keys[index];
                let res = match transfer {
                    Err(source) => Err(FetchError::Transport {
                        key: key.to_string(),
                        source,
                    }),
                    Ok(()) => match easy.response_code() {
                        Err(source) => Err(FetchError::Transport {
                            key: key.to_string(),
                            source,
                        }),
                        Ok(code) if (200..300).contains(&code) => {
                            Ok(FetchOutcome::from_body(easy.get_mut().take_body()))
                        }
                        Ok(code) => Err(FetchError::Http {
                            key: key.to_string(),
                            status: code,
                        }),
                    },
                };
                match res {
                    Ok(outcome) => results[index] = Some(outcome),
                    Err(e) => match opts.retry.decide(attempt, classify(&e)) {
                        RetryDecision::RetryAfter(d) => {
                            tracing::debug!(%key, attempt, delay_ms = d.as_millis() as u64, "request failed, retrying: {}", e);
                            retry_after.push((Instant::now() + d, index, attempt + 1));
                        }
                        // Dropping `active` on return detaches the remaining
                        // transfers from the multi handle.
                        RetryDecision::NoRetry => return Err(e),
                    },
                }
            }
        }

        refill_active(
            multi,
            endpoints,
            kind,
            keys,
            opts,
            &mut active,
            &mut pending,
            &mut retry_after,
            stats,
        )?;

        if !active.is_empty() {
            let wait = next_retry_wait(&retry_after);
            multi.wait(&mut [], wait)?;
        }
    }

    results
        .into_iter()
        .zip(keys)
        .map(|(r, key)| {
            r.ok_or_else(|| FetchError::Unavailable {
                key: key.to_string(),
                reason: "transfer finished without a result".to_string(),
            })
        })
        .collect()
}

/// Time until the next retry is due, capped at [`MAX_WAIT`].
fn next_retry_wait(retry_after: &[(Instant, usize, u32)]) -> Duration {
    let now = Instant::now();
    retry_after
        .iter()
        .map(|(t, ..)| t.saturating_duration_since(now))
        .min()
        .unwrap_or(MAX_WAIT)
        .min(MAX_WAIT)
}

/// Configure one GET for `keys[index]` and add it to the multi handle.
fn add_request(
    multi: &Multi,
    endpoints: &Endpoints,
    kind: KeyKind,
    key: &FetchKey,
    opts: &HttpOptions,
) -> Result<Easy2Handle<BodyHandler>, FetchError> {
    let transport = |source: curl::Error| FetchError::Transport {
        key: key.to_string(),
        source,
    };
    let mut easy = curl::easy::Easy2::new(BodyHandler::default());
    easy.url(endpoints.record_url(kind, key).as_str())
        .map_err(transport)?;
    easy.get(true).map_err(transport)?;
    easy.follow_location(true).map_err(transport)?;
    easy.max_redirections(10).map_err(transport)?;
    easy.connect_timeout(opts.connect_timeout).map_err(transport)?;
    easy.timeout(opts.request_timeout).map_err(transport)?;
    Ok(multi.add2(easy)?)
}

/// Fill the active set with pending or due-for-retry requests until
/// `max_in_flight` is reached or there is nothing left to schedule.
#[allow(clippy::too_many_arguments)]
fn refill_active(
    multi: &Multi,
    endpoints: &Endpoints,
    kind: KeyKind,
    keys: &[FetchKey],
    opts: &HttpOptions,
    active: &mut Vec<ActiveItem>,
    pending: &mut VecDeque<(usize, u32)>,
    retry_after: &mut Vec<(Instant, usize, u32)>,
    stats: &mut FetchStats,
) -> Result<(), FetchError> {
    let now = Instant::now();
    while active.len() < opts.max_in_flight.max(1) {
        let (index, attempt) = if let Some(pos) = retry_after.iter().position(|(t, ..)| now >= *t) {
            let (_, index, attempt) = retry_after.remove(pos);
            stats.retries += 1;
            (index, attempt)
        } else if let Some(next) = pending.pop_front() {
            next
        } else {
            break;
        };
        let handle = add_request(multi, endpoints, kind, &keys[index], opts)?;
        active.push((handle, index, attempt));
        stats.requests += 1;
        stats.peak_in_flight = stats.peak_in_flight.max(active.len());
    }
    Ok(())
}
