//! Directory listing and the per-entry metadata snapshot.
//!
//! [Entry] is created by [browse_dir] for each child of a directory and is never mutated
//! afterwards. The next read of the directory replaces the whole list.

use crate::core::formatter::{format_file_size, format_file_time};
use crate::core::fs::{FileSystem, FsEntry};

use phf::phf_map;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension to type hint. Lookups use the lowercased extension.
static MIME_HINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "rs" => "text/x-rust",
    "go" => "text/x-go",
    "py" => "text/x-python",
    "js" => "text/javascript",
    "ts" => "text/typescript",
    "c" => "text/x-c",
    "h" => "text/x-c",
    "cpp" => "text/x-c++",
    "hpp" => "text/x-c++",
    "java" => "text/x-java",
    "sh" => "application/x-sh",
    "md" => "text/markdown",
    "txt" => "text/plain",
    "log" => "text/plain",
    "csv" => "text/csv",
    "toml" => "application/toml",
    "json" => "application/json",
    "yaml" => "application/yaml",
    "yml" => "application/yaml",
    "xml" => "application/xml",
    "html" => "text/html",
    "css" => "text/css",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "svg" => "image/svg+xml",
    "webp" => "image/webp",
    "mp3" => "audio/mpeg",
    "flac" => "audio/flac",
    "mp4" => "video/mp4",
    "mkv" => "video/x-matroska",
    "pdf" => "application/pdf",
    "zip" => "application/zip",
    "tar" => "application/x-tar",
    "gz" => "application/gzip",
    "xz" => "application/x-xz",
    "7z" => "application/x-7z-compressed",
};

const HINT_DIRECTORY: &str = "inode/directory";
const HINT_SYMLINK: &str = "inode/symlink";
const HINT_UNKNOWN: &str = "application/octet-stream";

/// One filesystem object as seen when its directory was listed.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    name: Box<str>,
    flags: u8,
    size: u64,
    size_str: String,
    modified: Option<SystemTime>,
    accessed: Option<SystemTime>,
    changed: Option<SystemTime>,
    modified_str: String,
    accessed_str: String,
    changed_str: String,
    type_hint: &'static str,
    link_name: String,
    link_path: PathBuf,
}

impl Entry {
    // Flag bit definitions
    pub(crate) const IS_DIR: u8 = 1 << 0;
    pub(crate) const IS_HIDDEN: u8 = 1 << 1;
    pub(crate) const IS_SYMLINK: u8 = 1 << 2;
    pub(crate) const IS_BROKEN_SYM: u8 = 1 << 3;

    /// Builds an entry from a listing item of `dir`, following a symlink once to
    /// learn whether it points at a directory.
    pub fn from_fs_entry(fs: &dyn FileSystem, dir: &Path, item: FsEntry) -> Self {
        let name = item.name.to_string_lossy().into_owned();
        let md = &item.metadata;

        let mut flags = 0u8;
        if md.is_dir {
            flags |= Self::IS_DIR;
        }
        if is_hidden_name(&name) {
            flags |= Self::IS_HIDDEN;
        }

        let mut link_name = String::new();
        let mut link_path = PathBuf::new();
        let mut size = md.len;
        if md.is_symlink {
            flags |= Self::IS_SYMLINK;
            if let Ok(target) = fs.read_link(&item.path) {
                link_name = target.to_string_lossy().into_owned();
                link_path = if target.is_absolute() {
                    target
                } else {
                    dir.join(target)
                };
            }
            match fs.stat(&item.path) {
                Ok(target_md) => {
                    if target_md.is_dir {
                        flags |= Self::IS_DIR;
                    }
                    size = target_md.len;
                }
                Err(_) => flags |= Self::IS_BROKEN_SYM,
            }
        }

        let is_dir = flags & Self::IS_DIR != 0;
        let type_hint = if is_dir {
            HINT_DIRECTORY
        } else if flags & Self::IS_BROKEN_SYM != 0 {
            HINT_SYMLINK
        } else {
            type_hint_for(&name)
        };

        Entry {
            size_str: format_file_size(Some(size), is_dir),
            modified_str: format_file_time(md.modified),
            accessed_str: format_file_time(md.accessed),
            changed_str: format_file_time(md.changed),
            name: name.into_boxed_str(),
            flags,
            size,
            modified: md.modified,
            accessed: md.accessed,
            changed: md.changed,
            type_hint,
            link_name,
            link_path,
        }
    }

    // Accessors

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags & Self::IS_DIR != 0
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags & Self::IS_HIDDEN != 0
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.flags & Self::IS_SYMLINK != 0
    }

    #[inline]
    pub fn is_broken_sym(&self) -> bool {
        self.flags & Self::IS_BROKEN_SYM != 0
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn size_str(&self) -> &str {
        &self.size_str
    }

    #[inline]
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    #[inline]
    pub fn accessed(&self) -> Option<SystemTime> {
        self.accessed
    }

    #[inline]
    pub fn changed(&self) -> Option<SystemTime> {
        self.changed
    }

    #[inline]
    pub fn modified_str(&self) -> &str {
        &self.modified_str
    }

    #[inline]
    pub fn accessed_str(&self) -> &str {
        &self.accessed_str
    }

    #[inline]
    pub fn changed_str(&self) -> &str {
        &self.changed_str
    }

    #[inline]
    pub fn type_hint(&self) -> &'static str {
        self.type_hint
    }

    /// Raw symlink target as stored in the link. Empty if not a symlink.
    #[inline]
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Symlink target resolved against the entry's directory. Empty if not a symlink.
    #[inline]
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    /// Lowercased extension used by extension sorting. Directories and dotfiles without a
    /// second dot have none.
    pub fn extension(&self) -> String {
        if self.is_dir() {
            return String::new();
        }
        match self.name.rfind('.') {
            Some(0) | None => String::new(),
            Some(idx) => self.name[idx + 1..].to_lowercase(),
        }
    }
}

#[inline]
fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

fn type_hint_for(name: &str) -> &'static str {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| MIME_HINTS.get(ext.to_lowercase().as_str()).copied())
        .unwrap_or(HINT_UNKNOWN)
}

/// Reads the contents of `path` through `fs` and returns one [Entry] per child.
///
/// The order is whatever the filesystem returns; sorting is the formatter's job.
pub fn browse_dir(fs: &dyn FileSystem, path: &Path) -> io::Result<Vec<Entry>> {
    let items = fs.read_dir(path)?;
    Ok(items
        .into_iter()
        .map(|item| Entry::from_fs_entry(fs, path, item))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::OsFs;

    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn find<'a>(entries: &'a [Entry], name: &str) -> Option<&'a Entry> {
        entries.iter().find(|e| e.name() == name)
    }

    #[test]
    fn entry_flags_and_strings() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let mut file = File::create(tmp.path().join("hello.rs"))?;
        writeln!(file, "fn main() {{}}")?;
        fs::create_dir(tmp.path().join(".hidden_folder"))?;

        let entries = browse_dir(&OsFs, tmp.path())?;
        assert_eq!(entries.len(), 2);

        let file = find(&entries, "hello.rs").ok_or("hello.rs missing")?;
        assert!(!file.is_dir());
        assert!(!file.is_hidden());
        assert_eq!(file.size(), 13);
        assert_eq!(file.size_str(), "13 B");
        assert_eq!(file.type_hint(), "text/x-rust");
        assert_eq!(file.extension(), "rs");
        assert_ne!(file.modified_str(), "-");
        assert!(file.link_name().is_empty());
        assert_eq!(file.link_path(), Path::new(""));

        let dir = find(&entries, ".hidden_folder").ok_or("dir missing")?;
        assert!(dir.is_dir());
        assert!(dir.is_hidden());
        assert_eq!(dir.size_str(), "-");
        assert_eq!(dir.type_hint(), "inode/directory");
        assert_eq!(dir.extension(), "");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_resolve_relative_targets() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        fs::create_dir(tmp.path().join("real"))?;
        std::os::unix::fs::symlink("real", tmp.path().join("link"))?;
        std::os::unix::fs::symlink("missing", tmp.path().join("dangling"))?;

        let entries = browse_dir(&OsFs, tmp.path())?;

        let link = find(&entries, "link").ok_or("link missing")?;
        assert!(link.is_symlink());
        assert!(link.is_dir());
        assert_eq!(link.link_name(), "real");
        assert_eq!(link.link_path(), tmp.path().join("real"));

        let dangling = find(&entries, "dangling").ok_or("dangling missing")?;
        assert!(dangling.is_broken_sym());
        assert!(!dangling.is_dir());
        Ok(())
    }

    #[test]
    fn dotfile_has_no_extension() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        File::create(tmp.path().join(".bashrc"))?;
        File::create(tmp.path().join("archive.TAR"))?;

        let entries = browse_dir(&OsFs, tmp.path())?;
        assert_eq!(find(&entries, ".bashrc").ok_or("missing")?.extension(), "");
        assert_eq!(find(&entries, "archive.TAR").ok_or("missing")?.extension(), "tar");
        assert_eq!(
            find(&entries, "archive.TAR").ok_or("missing")?.type_hint(),
            "application/x-tar"
        );
        Ok(())
    }

    #[test]
    fn browse_nonexistent() {
        let result = browse_dir(&OsFs, Path::new("/path/does/not/exist"));
        assert!(result.is_err());
    }
}
