//! Read archives back into records.
//!
//! Bundle content is concatenated JSON objects with no separators, so it is
//! not a JSON array; records are recovered by streaming one value at a time.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::path::Path;

use super::BUNDLE_EXT;

/// Split concatenated JSON texts into records.
pub fn split_records(bytes: &[u8]) -> Result<Vec<Value>> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Value>()
        .enumerate()
        .map(|(i, v)| v.with_context(|| format!("record {}", i)))
        .collect()
}

/// Decode an archive (`.zst` bundle or single `.json`) into its records.
pub fn read_archive(path: &Path) -> Result<Vec<Value>> {
    let is_bundle = path.extension().and_then(|e| e.to_str()) == Some(BUNDLE_EXT);
    let bytes = if is_bundle {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        zstd::decode_all(file).with_context(|| format!("decompress {}", path.display()))?
    } else {
        std::fs::read(path).with_context(|| format!("read {}", path.display()))?
    };
    split_records(&bytes).with_context(|| format!("parse {}", path.display()))
}
