//! Filesystem abstraction consumed by the core.
//!
//! Every directory listing, walk and file mutation goes through [FileSystem], so tests can swap
//! in a wrapper that injects failures (for example a rename that always crosses devices).
//! [OsFs] is the real implementation on top of `std::fs`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Owner write permission bit. On Windows this is the inverse of the read-only attribute.
pub const OWNER_WRITE: u32 = 0o200;

/// Metadata snapshot of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMetadata {
    pub is_dir: bool,
    pub is_symlink: bool,
    pub len: u64,
    /// Permission bits. On Windows only [OWNER_WRITE] carries meaning.
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    /// Inode change time where the platform has one, otherwise the modify time.
    pub changed: Option<SystemTime>,
}

impl FsMetadata {
    #[inline]
    pub fn is_readonly(&self) -> bool {
        self.mode & OWNER_WRITE == 0
    }

    fn from_std(md: &fs::Metadata) -> Self {
        let modified = md.modified().ok();
        #[cfg(unix)]
        let (mode, changed) = {
            use std::os::unix::fs::MetadataExt;
            use std::os::unix::fs::PermissionsExt;
            let changed = u64::try_from(md.ctime())
                .ok()
                .map(|secs| {
                    SystemTime::UNIX_EPOCH
                        + std::time::Duration::new(secs, md.ctime_nsec().clamp(0, 999_999_999) as u32)
                })
                .or(modified);
            (md.permissions().mode() & 0o7777, changed)
        };
        #[cfg(not(unix))]
        let (mode, changed) = {
            let mode = if md.permissions().readonly() {
                0o444
            } else {
                0o666
            };
            (mode, modified)
        };

        Self {
            is_dir: md.is_dir(),
            is_symlink: md.file_type().is_symlink(),
            len: md.len(),
            mode,
            modified,
            accessed: md.accessed().ok(),
            changed,
        }
    }
}

/// One child returned by [FileSystem::read_dir]. The metadata does not follow symlinks.
#[derive(Debug, Clone)]
pub struct FsEntry {
    pub name: std::ffi::OsString,
    pub path: PathBuf,
    pub metadata: FsMetadata,
}

/// The set of filesystem calls the core needs.
pub trait FileSystem: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    /// Creates or truncates a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
    /// Metadata following symlinks.
    fn stat(&self, path: &Path) -> io::Result<FsMetadata>;
    /// Metadata of the path itself.
    fn lstat(&self, path: &Path) -> io::Result<FsMetadata>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    /// Creates `link` pointing at `target`. The target is stored as given and may dangle.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    /// Removes a file, a symlink or an empty directory.
    fn remove(&self, path: &Path) -> io::Result<()>;
    /// Removes a path and everything below it.
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;
    /// Lists a directory. Children that vanish while listing are skipped.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<FsEntry>>;
}

/// The operating system filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(fs::File::create(path)?))
    }

    fn stat(&self, path: &Path) -> io::Result<FsMetadata> {
        fs::metadata(path).map(|md| FsMetadata::from_std(&md))
    }

    fn lstat(&self, path: &Path) -> io::Result<FsMetadata> {
        fs::symlink_metadata(path).map(|md| FsMetadata::from_std(&md))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link)
        }
        #[cfg(windows)]
        {
            // Windows needs to know the kind up front; dangling targets become file links.
            let resolved = link.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
            if fs::metadata(&resolved).is_ok_and(|md| md.is_dir()) {
                std::os::windows::fs::symlink_dir(target, link)
            } else {
                std::os::windows::fs::symlink_file(target, link)
            }
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (target, link);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "symlinks are not supported on this platform",
            ))
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let md = fs::symlink_metadata(path)?;
        if md.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let md = match fs::symlink_metadata(path) {
            Ok(md) => md,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if md.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
        }
        #[cfg(not(unix))]
        {
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_readonly(mode & OWNER_WRITE == 0);
            fs::set_permissions(path, perms)
        }
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new().recursive(true).mode(mode).create(path)
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            fs::create_dir_all(path)
        }
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<FsEntry>> {
        let mut out = Vec::with_capacity(64);
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            let metadata = match fs::symlink_metadata(&path) {
                Ok(md) => FsMetadata::from_std(&md),
                Err(_) => continue,
            };
            out.push(FsEntry {
                name: entry.file_name(),
                path,
                metadata,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_dir_reports_children_with_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("a.txt"), b"hello")?;
        std::fs::create_dir(dir.path().join("sub"))?;

        let mut entries = OsFs.read_dir(dir.path())?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].metadata.len, 5);
        assert!(!entries[0].metadata.is_dir);
        assert!(entries[1].metadata.is_dir);
        Ok(())
    }

    #[test]
    fn remove_all_missing_path_is_ok() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        OsFs.remove_all(&dir.path().join("nope"))?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn chmod_round_trips_mode_bits() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("f");
        std::fs::write(&file, b"x")?;

        OsFs.chmod(&file, 0o640)?;
        assert_eq!(OsFs.stat(&file)?.mode, 0o640);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlink_keeps_relative_target() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let link = dir.path().join("link");

        OsFs.symlink(Path::new("nowhere"), &link)?;
        assert!(OsFs.lstat(&link)?.is_symlink);
        assert_eq!(OsFs.read_link(&link)?, PathBuf::from("nowhere"));
        assert!(OsFs.stat(&link).is_err());
        Ok(())
    }
}
