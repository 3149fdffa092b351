//! Record URLs under a configurable API root.

use anyhow::{ensure, Context, Result};
use url::Url;

use crate::partition::{FetchKey, KeyKind};

/// Builds `{base}item/{id}.json`, `{base}user/{name}.json` and `{base}maxitem.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid API base URL: {}", base))?;
        ensure!(
            matches!(base.scheme(), "http" | "https"),
            "API base must be http(s): {}",
            base
        );
        ensure!(base.path().ends_with('/'), "API base must end with '/': {}", base);
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL of one record. Path segments are percent-encoded, so a key can
    /// never escape its directory.
    pub fn record_url(&self, kind: KeyKind, key: &FetchKey) -> Url {
        let dir = match kind {
            KeyKind::Items => "item",
            KeyKind::Users => "user",
        };
        self.with_segments(&[dir, &format!("{}.json", key)])
    }

    pub fn max_item_url(&self) -> Url {
        self.with_segments(&["maxitem.json"])
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a hierarchical path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_and_user_urls() {
        let e = Endpoints::new("https://hacker-news.firebaseio.com/v0/").unwrap();
        assert_eq!(
            e.record_url(KeyKind::Items, &FetchKey::Id(8863)).as_str(),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
        assert_eq!(
            e.record_url(KeyKind::Users, &FetchKey::Name("pg".into())).as_str(),
            "https://hacker-news.firebaseio.com/v0/user/pg.json"
        );
        assert_eq!(
            e.max_item_url().as_str(),
            "https://hacker-news.firebaseio.com/v0/maxitem.json"
        );
    }

    #[test]
    fn usernames_are_encoded() {
        let e = Endpoints::new("http://127.0.0.1:8080/v0/").unwrap();
        let url = e.record_url(KeyKind::Users, &FetchKey::Name("a/b?c".into()));
        assert_eq!(url.path(), "/v0/user/a%2Fb%3Fc.json");
    }

    #[test]
    fn rejects_bad_base() {
        assert!(Endpoints::new("not a url").is_err());
        assert!(Endpoints::new("ftp://example.com/v0/").is_err());
        assert!(Endpoints::new("https://example.com/v0").is_err());
    }
}
