//! Scoped permission relaxation around a rename or copy.
//!
//! [relax_for] makes the destination's parent writable and, where the platform refuses to replace
//! read-only files, clears the read-only flag of an existing destination. The returned guard puts
//! every changed mode back when dropped, whether the operation succeeded or not.

use crate::core::fs::{FileSystem, OWNER_WRITE};

use tracing::{debug, warn};

use std::io;
use std::path::{Path, PathBuf};

pub(crate) struct Relaxed<'a> {
    fs: &'a dyn FileSystem,
    restore: Vec<(PathBuf, u32)>,
}

impl Relaxed<'_> {
    fn make_writable(&mut self, path: &Path) {
        let Ok(md) = self.fs.lstat(path) else {
            return;
        };
        if !md.is_readonly() {
            return;
        }
        match self.fs.chmod(path, md.mode | OWNER_WRITE) {
            Ok(()) => {
                debug!(path = %path.display(), mode = md.mode, "temporarily relaxed permissions");
                self.restore.push((path.to_path_buf(), md.mode));
            }
            Err(e) => debug!(path = %path.display(), error = %e, "could not relax permissions"),
        }
    }
}

impl Drop for Relaxed<'_> {
    fn drop(&mut self) {
        for (path, mode) in self.restore.drain(..).rev() {
            match self.fs.chmod(&path, mode) {
                Ok(()) => {}
                // a replaced destination may be gone by now
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not restore permissions"),
            }
        }
    }
}

/// Relaxes what stands in the way of writing `dst`. Keep the guard alive for the operation.
pub(crate) fn relax_for<'a>(fs: &'a dyn FileSystem, dst: &Path) -> Relaxed<'a> {
    let mut guard = Relaxed {
        fs,
        restore: Vec::new(),
    };
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        guard.make_writable(parent);
    }
    if platform::CLEARS_READONLY_TARGET {
        guard.make_writable(dst);
    }
    guard
}

#[cfg(windows)]
mod platform {
    /// Windows will not replace a file carrying the read-only attribute.
    pub(super) const CLEARS_READONLY_TARGET: bool = true;
}

#[cfg(not(windows))]
mod platform {
    /// POSIX rename and create only need a writable parent directory.
    pub(super) const CLEARS_READONLY_TARGET: bool = false;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::fileop::{copy, move_or_copy, rename};
    use crate::core::fs::OsFs;

    use std::fs;
    use tempfile::tempdir;

    fn locked_dir(root: &Path) -> io::Result<PathBuf> {
        let locked = root.join("locked");
        fs::create_dir(&locked)?;
        OsFs.chmod(&locked, 0o555)?;
        Ok(locked)
    }

    #[test]
    fn parent_mode_is_restored() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let locked = root.path().join("locked");
        std::fs::create_dir(&locked)?;
        OsFs.chmod(&locked, 0o555)?;

        {
            let _guard = relax_for(&OsFs, &locked.join("incoming"));
            assert_eq!(OsFs.stat(&locked)?.mode, 0o755);
            std::fs::write(locked.join("incoming"), b"x")?;
        }

        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);
        OsFs.chmod(&locked, 0o755)?;
        Ok(())
    }

    #[test]
    fn file_operations_into_read_only_dir() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        fs::write(root.path().join("a.txt"), b"a")?;
        fs::write(root.path().join("b.txt"), b"b")?;
        fs::create_dir_all(root.path().join("tree").join("inner"))?;
        fs::write(root.path().join("tree").join("inner").join("c.txt"), b"c")?;
        let locked = locked_dir(root.path())?;

        copy(&OsFs, &root.path().join("a.txt"), &locked.join("a.txt"))?;
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);

        rename(&OsFs, &root.path().join("b.txt"), &locked.join("b.txt"))?;
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);

        move_or_copy(&OsFs, &root.path().join("tree"), &locked.join("tree"))?;
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);

        assert_eq!(fs::read(locked.join("a.txt"))?, b"a");
        assert_eq!(fs::read(locked.join("b.txt"))?, b"b");
        assert_eq!(fs::read(locked.join("tree").join("inner").join("c.txt"))?, b"c");
        assert!(root.path().join("a.txt").exists());
        assert!(!root.path().join("b.txt").exists());
        assert!(!root.path().join("tree").exists());

        OsFs.chmod(&locked, 0o755)?;
        Ok(())
    }

    #[test]
    fn failed_operations_restore_mode() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let locked = locked_dir(root.path())?;
        let missing = root.path().join("missing");

        assert!(copy(&OsFs, &missing, &locked.join("x")).is_err());
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);

        assert!(rename(&OsFs, &missing, &locked.join("x")).is_err());
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);

        assert!(move_or_copy(&OsFs, &missing, &locked.join("x")).is_err());
        assert_eq!(OsFs.stat(&locked)?.mode, 0o555);
        assert!(OsFs.lstat(&locked.join("x")).is_err());

        OsFs.chmod(&locked, 0o755)?;
        Ok(())
    }

    #[test]
    fn writable_parent_is_left_alone() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let guard = relax_for(&OsFs, &root.path().join("x"));
        assert!(guard.restore.is_empty());
        Ok(())
    }
}
