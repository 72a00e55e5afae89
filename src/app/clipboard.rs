//! Clipboard state for copy/cut and paste.

use crate::core::FileSystem;
use crate::utils::get_unused_path;

use std::path::{Path, PathBuf};

/// Absolute source paths plus whether they were cut or copied.
///
/// Replaced wholesale by every copy or cut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardState {
    paths: Vec<PathBuf>,
    cut: bool,
}

impl ClipboardState {
    pub fn copy(&mut self, paths: Vec<PathBuf>) {
        self.paths = paths;
        self.cut = false;
    }

    pub fn cut(&mut self, paths: Vec<PathBuf>) {
        self.paths = paths;
        self.cut = true;
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.cut = false;
    }

    #[inline]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    #[inline]
    pub fn is_cut(&self) -> bool {
        self.cut
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Pairs every clipboard path with its destination inside `dest_dir`.
    ///
    /// Existing names get an unused `name_1.ext` style variant instead of being overwritten,
    /// except when a cut item is pasted back where it came from. Paths without a file name
    /// (the root) map to `None`.
    pub fn targets(&self, fs: &dyn FileSystem, dest_dir: &Path) -> Vec<Option<(PathBuf, PathBuf)>> {
        self.paths
            .iter()
            .map(|src| {
                let name = src.file_name()?;
                let dst = dest_dir.join(name);
                let dst = if self.cut && dst == *src {
                    dst
                } else {
                    get_unused_path(fs, &dst)
                };
                Some((src.clone(), dst))
            })
            .collect()
    }
}
