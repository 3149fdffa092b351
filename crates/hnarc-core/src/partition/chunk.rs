//! Worker chunks: disjoint sub-ranges of the master key space.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::key::FetchKey;

/// The master key space of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpace {
    /// Inclusive id range `[first, last]`.
    Range { first: u64, last: u64 },
    /// Externally supplied keys, in the order given.
    List(Vec<String>),
}

impl KeySpace {
    /// Number of keys in the space.
    pub fn len(&self) -> u64 {
        match self {
            KeySpace::Range { first, last } if first <= last => last - first + 1,
            KeySpace::Range { .. } => 0,
            KeySpace::List(keys) => keys.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the keys a chunk covers, in key order.
    pub fn keys_for(&self, chunk: &ChunkKeys) -> Result<Vec<FetchKey>> {
        match (self, chunk) {
            (KeySpace::Range { .. }, ChunkKeys::Range { first, last }) => {
                ensure!(first <= last, "empty id range {}-{}", first, last);
                Ok((*first..=*last).map(FetchKey::Id).collect())
            }
            (KeySpace::List(keys), ChunkKeys::ListSlice { from, to }) => {
                let slice = keys.get(*from..*to).ok_or_else(|| {
                    anyhow::anyhow!(
                        "list slice {}..{} out of bounds ({} keys)",
                        from,
                        to,
                        keys.len()
                    )
                })?;
                Ok(slice.iter().cloned().map(FetchKey::Name).collect())
            }
            _ => bail!("chunk {} does not match key space kind", chunk),
        }
    }
}

/// Compact description of a chunk's keys, cheap to hand to a child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkKeys {
    /// Inclusive id range.
    Range { first: u64, last: u64 },
    /// Half-open index range `[from, to)` into the key list.
    ListSlice { from: usize, to: usize },
}

impl ChunkKeys {
    pub fn len(&self) -> u64 {
        match self {
            ChunkKeys::Range { first, last } => last.saturating_sub(*first) + 1,
            ChunkKeys::ListSlice { from, to } => to.saturating_sub(*from) as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ChunkKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkKeys::Range { first, last } => write!(f, "ids {}-{}", first, last),
            ChunkKeys::ListSlice { from, to } => write!(f, "list[{}..{}]", from, to),
        }
    }
}

/// One process's share of the master key space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerChunk {
    /// Position of this chunk in the master space (0-based).
    pub index: usize,
    pub keys: ChunkKeys,
}

/// Split `space` into order-preserving, disjoint chunks of at most `chunk_size`
/// keys that cover every key exactly once. The final chunk may be shorter.
pub fn partition_chunks(space: &KeySpace, chunk_size: usize) -> Result<Vec<WorkerChunk>> {
    ensure!(chunk_size > 0, "chunk size must be > 0");
    let mut out = Vec::new();
    match space {
        KeySpace::Range { first, last } => {
            ensure!(first <= last, "empty id range {}-{}", first, last);
            let step = chunk_size as u64 - 1;
            let mut start = *first;
            loop {
                let end = start.saturating_add(step).min(*last);
                out.push(WorkerChunk {
                    index: out.len(),
                    keys: ChunkKeys::Range {
                        first: start,
                        last: end,
                    },
                });
                if end == *last {
                    break;
                }
                start = end + 1;
            }
        }
        KeySpace::List(keys) => {
            let mut from = 0usize;
            while from < keys.len() {
                let to = (from + chunk_size).min(keys.len());
                out.push(WorkerChunk {
                    index: out.len(),
                    keys: ChunkKeys::ListSlice { from, to },
                });
                from = to;
            }
        }
    }
    Ok(out)
}
