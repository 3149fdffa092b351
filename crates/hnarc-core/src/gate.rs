//! Resumability gate: an archive's presence at its canonical path marks its
//! bundle complete, so completed work is skipped before any request is made.

use std::path::Path;

use crate::archive::{archive_path, ArchiveMode};
use crate::partition::Bundle;

/// True when `bundle` already has an archive in `dir`. Content is not
/// inspected; a leftover `.part` file does not count.
pub fn is_complete(dir: &Path, bundle: &Bundle, mode: ArchiveMode) -> bool {
    match mode {
        ArchiveMode::Bundled => archive_path(dir, bundle, mode).is_file(),
        // Bundles hold one key in single mode.
        ArchiveMode::Single => bundle.keys.iter().all(|key| {
            dir.join(format!("{}.{}", key, crate::archive::SINGLE_EXT))
                .is_file()
        }),
    }
}

/// Bundles of `bundles` that still need fetching, order preserved.
pub fn pending_bundles<'a>(dir: &Path, bundles: &'a [Bundle], mode: ArchiveMode) -> Vec<&'a Bundle> {
    bundles
        .iter()
        .filter(|b| !is_complete(dir, b, mode))
        .collect()
}
