//! Highest current item id, used as the upper end of the items range.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::retry::{classify, run_with_retry, FetchError, RetryPolicy};

use super::endpoint::Endpoints;

/// GET `{base}maxitem.json` and parse the integer body. Transport failures are
/// retried under `policy`.
pub fn fetch_max_item(endpoints: &Endpoints, timeout: Duration, policy: &RetryPolicy) -> Result<u64> {
    let url = endpoints.max_item_url();
    let body = run_with_retry(policy, |_| get_body(url.as_str(), timeout), classify)
        .with_context(|| format!("GET {}", url))?;
    parse_max_item(&body).with_context(|| format!("parse body of {}", url))
}

fn get_body(url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let transport = |source: curl::Error| FetchError::Transport {
        key: "maxitem".to_string(),
        source,
    };
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(transport)?;
    easy.follow_location(true).map_err(transport)?;
    easy.timeout(timeout).map_err(transport)?;
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport)?;
        transfer.perform().map_err(transport)?;
    }
    let code = easy.response_code().map_err(transport)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http {
            key: "maxitem".to_string(),
            status: code,
        });
    }
    Ok(body)
}

fn parse_max_item(body: &[u8]) -> Result<u64> {
    let id: u64 = serde_json::from_slice(body).context("max item is not an unsigned integer")?;
    Ok(id)
}
