//! Working-directory layout marker.
//!
//! Archive names depend on the bundle size and archive mode, so a directory
//! records the settings that produced it. Running with different settings
//! against the same directory is refused instead of silently mixing naming
//! schemes (which would defeat the resumability gate).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::archive::ArchiveMode;
use crate::storage::AtomicFile;

/// Marker file name inside each working directory.
pub const LAYOUT_FILE: &str = ".hnarc-layout.toml";

/// Current marker format version.
pub const LAYOUT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub version: u32,
    pub bundle_size: usize,
    pub mode: ArchiveMode,
}

impl Layout {
    /// Single-mode names do not depend on bundle size; it is recorded as 1.
    pub fn new(bundle_size: usize, mode: ArchiveMode) -> Self {
        let bundle_size = match mode {
            ArchiveMode::Bundled => bundle_size,
            ArchiveMode::Single => 1,
        };
        Self {
            version: LAYOUT_VERSION,
            bundle_size,
            mode,
        }
    }

    /// Read the marker in `dir`, if any.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(LAYOUT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read layout marker {}", path.display()))?;
        let layout = toml::from_str(&text)
            .with_context(|| format!("parse layout marker {}", path.display()))?;
        Ok(Some(layout))
    }
}

/// Create `dir` and its marker if missing; otherwise require the existing
/// marker to match `layout`.
pub fn ensure_layout(dir: &Path, layout: &Layout) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    match Layout::load(dir)? {
        Some(existing) if existing == *layout => Ok(()),
        Some(existing) => bail!(
            "{} was written with bundle_size={} mode={:?} (layout v{}), \
             but this run uses bundle_size={} mode={:?}; use another output directory",
            dir.display(),
            existing.bundle_size,
            existing.mode,
            existing.version,
            layout.bundle_size,
            layout.mode
        ),
        None => {
            let text = toml::to_string_pretty(layout)?;
            let mut file = AtomicFile::create(&dir.join(LAYOUT_FILE))?;
            std::io::Write::write_all(&mut file, text.as_bytes())?;
            file.finalize()?;
            tracing::debug!(dir = %dir.display(), bundle_size = layout.bundle_size, "layout marker written");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items");
        let layout = Layout::new(100, ArchiveMode::Bundled);
        ensure_layout(&items, &layout).unwrap();
        assert_eq!(Layout::load(&items).unwrap(), Some(layout.clone()));
        // Same settings again is fine.
        ensure_layout(&items, &layout).unwrap();
    }

    #[test]
    fn bundle_size_change_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        ensure_layout(dir.path(), &Layout::new(100, ArchiveMode::Bundled)).unwrap();
        let err = ensure_layout(dir.path(), &Layout::new(50, ArchiveMode::Bundled)).unwrap_err();
        assert!(err.to_string().contains("bundle_size=100"));
    }

    #[test]
    fn marker_is_plain_toml() {
        let text = toml::to_string_pretty(&Layout::new(100, ArchiveMode::Bundled)).unwrap();
        assert!(text.contains("mode = \"bundled\""));
        assert!(text.contains("bundle_size = 100"));
    }

    #[test]
    fn single_mode_ignores_bundle_size() {
        let dir = tempfile::tempdir().unwrap();
        ensure_layout(dir.path(), &Layout::new(100, ArchiveMode::Single)).unwrap();
        ensure_layout(dir.path(), &Layout::new(50, ArchiveMode::Single)).unwrap();
        assert!(ensure_layout(dir.path(), &Layout::new(50, ArchiveMode::Bundled)).is_err());
    }
}
