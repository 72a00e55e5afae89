//! Cached file and directory previews.
//!
//! Rendered previews are kept per absolute path in a self-pruning [Cache]. A cached preview is
//! only reused while the path's modify time is unchanged; pruning evicts the least recently
//! read previews first.

use crate::core::{Cache, CacheBuilder, CancelToken, FileSystem, render_preview};

use tracing::trace;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Lines rendered per preview.
pub const PREVIEW_LINES: usize = 64;

#[derive(Debug, Clone)]
struct Rendered {
    lines: Arc<[String]>,
    modified: SystemTime,
    read_at: Instant,
}

pub struct PreviewCache {
    cache: Cache<PathBuf, Rendered>,
    max_lines: usize,
}

impl PreviewCache {
    /// A `size` of zero keeps every preview.
    pub fn new(
        size: usize,
        prune_interval: Duration,
        cancel: &CancelToken,
    ) -> crate::core::Result<Self> {
        let cache = CacheBuilder::new(size, prune_interval)
            .rank_by_value(|a: &Rendered, b: &Rendered| a.read_at.cmp(&b.read_at))
            .build(cancel)?;
        Ok(Self {
            cache,
            max_lines: PREVIEW_LINES,
        })
    }

    /// Returns the preview of `path`, rendering it on a miss or when the file changed.
    ///
    /// Paths without a readable modify time are rendered every time and never cached.
    pub fn get(&self, fs: &dyn FileSystem, path: &Path) -> Arc<[String]> {
        let modified = fs.stat(path).ok().and_then(|md| md.modified);
        let key = path.to_path_buf();

        if let Some(modified) = modified
            && let Some(mut hit) = self.cache.get(&key)
            && hit.modified == modified
        {
            trace!(path = %path.display(), "preview cache hit");
            hit.read_at = Instant::now();
            let lines = Arc::clone(&hit.lines);
            self.cache.set(key, hit);
            return lines;
        }

        let lines: Arc<[String]> = render_preview(fs, path, self.max_lines).into();
        match modified {
            Some(modified) => self.cache.set(
                key,
                Rendered {
                    lines: Arc::clone(&lines),
                    modified,
                    read_at: Instant::now(),
                },
            ),
            None => self.cache.delete(&key),
        }
        lines
    }

    /// Number of cached previews.
    pub fn len(&self) -> usize {
        self.cache.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate(&self, path: &Path) {
        self.cache.delete(&path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OsFs;

    use std::error;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn renders_and_caches_text() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("a.txt");
        fs::write(&file, "one\ntwo\tx\n")?;

        let cache = PreviewCache::new(8, Duration::from_secs(3600), &CancelToken::new())?;
        let first = cache.get(&OsFs, &file);
        assert_eq!(&*first, &["one".to_string(), "two x".to_string()]);
        assert_eq!(cache.len(), 1);

        let second = cache.get(&OsFs, &file);
        assert!(Arc::ptr_eq(&first, &second), "second read should hit the cache");
        Ok(())
    }

    #[test]
    fn changed_file_is_rerendered() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("a.txt");
        fs::write(&file, "old")?;

        let cache = PreviewCache::new(8, Duration::from_secs(3600), &CancelToken::new())?;
        assert_eq!(&*cache.get(&OsFs, &file), &["old".to_string()]);

        fs::write(&file, "new")?;
        let later = SystemTime::now() + Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&file)?
            .set_modified(later)?;

        assert_eq!(&*cache.get(&OsFs, &file), &["new".to_string()]);
        Ok(())
    }

    #[test]
    fn missing_path_is_not_cached() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let cache = PreviewCache::new(8, Duration::from_secs(3600), &CancelToken::new())?;

        let lines = cache.get(&OsFs, &dir.path().join("nope"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[Error"));
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn prune_drops_least_recently_read() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let cache = PreviewCache::new(2, Duration::from_secs(3600), &CancelToken::new())?;
        let paths: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("{i}.txt"))).collect();
        for p in &paths {
            fs::write(p, "x")?;
            cache.get(&OsFs, p);
            std::thread::sleep(Duration::from_millis(2));
        }
        // touch the oldest so the middle one becomes least recent
        cache.get(&OsFs, &paths[0]);

        assert_eq!(cache.cache.prune(), 1);
        assert!(cache.cache.get(&paths[0]).is_some());
        assert!(cache.cache.get(&paths[1]).is_none());
        assert!(cache.cache.get(&paths[2]).is_some());
        Ok(())
    }
}
