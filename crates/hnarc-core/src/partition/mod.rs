//! Id-space partitioning.
//!
//! Turns a master key space (an inclusive id range or a list of usernames)
//! into disjoint worker chunks, and a chunk's keys into fixed-size bundles and
//! bundle groups. Order is carried explicitly (`seq`, chunk `index`) so later
//! stages never rely on container iteration order.

mod bundle;
mod chunk;
mod key;

pub use bundle::{group_bundles, split_bundles, Bundle, BundleGroup};
pub use chunk::{partition_chunks, ChunkKeys, KeySpace, WorkerChunk};
pub use key::{load_usernames, validate_username, FetchKey, KeyKind};
