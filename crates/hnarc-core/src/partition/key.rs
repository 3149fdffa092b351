//! Fetch keys and key kinds.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Address of one record: a numeric item id or a username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchKey {
    Id(u64),
    Name(String),
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKey::Id(id) => write!(f, "{}", id),
            FetchKey::Name(name) => f.write_str(name),
        }
    }
}

/// Check that a username can be used verbatim as a file name.
pub fn validate_username(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("invalid username '{}'", name));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c == '\0' || c.is_whitespace()) {
        return Err(format!("username contains a path separator or whitespace: {:?}", name));
    }
    Ok(())
}

/// Read a username list: one per line, surrounding whitespace trimmed, blank
/// lines skipped, repeats dropped (first occurrence wins). Every name must be
/// usable as a file name.
///
/// Workers re-read the same file and index into the result, so the order is
/// a pure function of the file contents.
pub fn load_usernames(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read username list {}", path.display()))?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut repeats = 0usize;
    for (i, line) in text.lines().enumerate() {
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        validate_username(name).map_err(|e| anyhow!("{}:{}: {}", path.display(), i + 1, e))?;
        if seen.insert(name) {
            names.push(name.to_string());
        } else {
            repeats += 1;
        }
    }
    if repeats > 0 {
        tracing::debug!(path = %path.display(), repeats, "dropped repeated usernames");
    }
    Ok(names)
}

/// Which kind of record a run archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Items,
    Users,
}

impl KeyKind {
    /// Working directory name under the output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            KeyKind::Items => "items",
            KeyKind::Users => "users",
        }
    }

    /// JSON field holding the record's unix timestamp.
    pub fn timestamp_field(self) -> &'static str {
        match self {
            KeyKind::Items => "time",
            KeyKind::Users => "created",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for KeyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "items" | "item" => Ok(KeyKind::Items),
            "users" | "user" => Ok(KeyKind::Users),
            other => Err(format!("unknown key kind '{}' (expected items or users)", other)),
        }
    }
}
