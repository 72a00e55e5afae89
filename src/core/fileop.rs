//! File mutation operations: move, copy and delete, singly or in bounded batches.
//!
//! [move_or_copy] tries an atomic rename and falls back to copy-then-delete (for example across
//! devices). The source is only removed after the copy fully succeeded.
//!
//! Batch variants run on a small worker pool and return one result per input, in input order.
//! Once the cancellation token is triggered, items that have not started yet record
//! [Error::Cancelled] without being attempted. Items already running finish.

pub(crate) mod perms;

use crate::core::cancel::CancelToken;
use crate::core::error::{Error, Result};
use crate::core::fs::{FileSystem, OWNER_WRITE};

use crossbeam_channel::unbounded;
use tracing::{debug, warn};

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

pub const DEFAULT_BATCH_WORKERS: usize = 8;
pub const MAX_BATCH_WORKERS: usize = 64;

/// Renames `src` to `dst` with the destination's permissions relaxed for the duration.
pub fn rename(fs: &dyn FileSystem, src: &Path, dst: &Path) -> io::Result<()> {
    let _relaxed = perms::relax_for(fs, dst);
    fs.rename(src, dst)
}

/// Copies `src` (file or directory tree) to `dst`, keeping permission bits, with the
/// destination's permissions relaxed for the duration. Symlinks are copied as symlinks with the
/// same target.
///
/// Copying a directory somewhere below itself is rejected with `InvalidInput`.
pub fn copy(fs: &dyn FileSystem, src: &Path, dst: &Path) -> io::Result<()> {
    if dst != src && dst.starts_with(src) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot copy {} into itself", src.display()),
        ));
    }
    let _relaxed = perms::relax_for(fs, dst);
    copy_tree(fs, src, dst)
}

/// Moves `src` to `dst`, by rename when possible and by copy plus delete otherwise.
///
/// If the copy fails, the partial destination is removed (when it did not exist before) and the
/// source is left untouched.
pub fn move_or_copy(fs: &dyn FileSystem, src: &Path, dst: &Path) -> io::Result<()> {
    let rename_err = match rename(fs, src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!(
        src = %src.display(),
        dst = %dst.display(),
        error = %rename_err,
        "rename failed, falling back to copy"
    );

    let dst_existed = fs.lstat(dst).is_ok();
    if let Err(e) = copy(fs, src, dst) {
        if !dst_existed {
            let _relaxed = perms::relax_for(fs, dst);
            if let Err(cleanup) = fs.remove_all(dst) {
                warn!(dst = %dst.display(), error = %cleanup, "could not clean up partial copy");
            }
        }
        return Err(e);
    }
    fs.remove_all(src)
}

fn copy_tree(fs: &dyn FileSystem, src: &Path, dst: &Path) -> io::Result<()> {
    let md = fs.lstat(src)?;
    if md.is_symlink {
        // Links are recreated as links, never followed.
        let target = fs.read_link(src)?;
        return fs.symlink(&target, dst);
    }
    if !md.is_dir {
        return copy_file(fs, src, dst, md.mode);
    }

    // Children need a writable directory; the real mode goes on last.
    fs.mkdir_all(dst, md.mode | OWNER_WRITE | 0o100)?;
    for child in fs.read_dir(src)? {
        copy_tree(fs, &child.path, &dst.join(&child.name))?;
    }
    fs.chmod(dst, md.mode)
}

fn copy_file(fs: &dyn FileSystem, src: &Path, dst: &Path, mode: u32) -> io::Result<()> {
    let mut reader = fs.open(src)?;
    {
        let mut writer = fs.create(dst)?;
        io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
    }
    fs.chmod(dst, mode)
}

/// Deletes `path`: recursively for directories, singly for anything else.
pub fn remove(cancel: &CancelToken, fs: &dyn FileSystem, path: &Path) -> Result<()> {
    cancel.check()?;
    let md = fs.lstat(path)?;
    if md.is_dir {
        fs.remove_all(path)?;
    } else {
        fs.remove(path)?;
    }
    Ok(())
}

/// Runs [move_or_copy] for every `(src, dst)` pair.
pub fn move_many(
    cancel: &CancelToken,
    fs: &dyn FileSystem,
    pairs: &[(PathBuf, PathBuf)],
    workers: usize,
) -> Vec<Result<()>> {
    run_batch(cancel, pairs, workers, |(src, dst)| {
        move_or_copy(fs, src, dst).map_err(Error::from)
    })
}

/// Runs [copy] for every `(src, dst)` pair.
pub fn copy_many(
    cancel: &CancelToken,
    fs: &dyn FileSystem,
    pairs: &[(PathBuf, PathBuf)],
    workers: usize,
) -> Vec<Result<()>> {
    run_batch(cancel, pairs, workers, |(src, dst)| {
        copy(fs, src, dst).map_err(Error::from)
    })
}

/// Runs [remove] for every path.
pub fn remove_many(
    cancel: &CancelToken,
    fs: &dyn FileSystem,
    paths: &[PathBuf],
    workers: usize,
) -> Vec<Result<()>> {
    run_batch(cancel, paths, workers, |path| remove(cancel, fs, path))
}

/// Feeds `items` to at most `workers` threads and puts each result back at its item's index.
pub(crate) fn run_batch<T, F>(
    cancel: &CancelToken,
    items: &[T],
    workers: usize,
    op: F,
) -> Vec<Result<()>>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync,
{
    let mut results: Vec<Option<Result<()>>> = (0..items.len()).map(|_| None).collect();
    if items.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, MAX_BATCH_WORKERS).min(items.len());
    let (job_tx, job_rx) = unbounded::<usize>();
    let (res_tx, res_rx) = unbounded::<(usize, Result<()>)>();
    for idx in 0..items.len() {
        let _ = job_tx.send(idx);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            let op = &op;
            scope.spawn(move || {
                while let Ok(idx) = job_rx.recv() {
                    let res = if cancel.is_cancelled() {
                        Err(Error::Cancelled)
                    } else {
                        op(&items[idx])
                    };
                    let _ = res_tx.send((idx, res));
                }
            });
        }
        drop(res_tx);

        for (idx, res) in res_rx.iter() {
            if let Err(e) = &res
                && !e.is_cancelled()
            {
                warn!(item = idx, error = %e, "batch item failed");
            }
            results[idx] = Some(res);
        }
    });

    results
        .into_iter()
        .map(|r| r.unwrap_or(Err(Error::Cancelled)))
        .collect()
}

/// Longest shared leading path of `paths`, cut at component boundaries.
///
/// `["/a/bc/d", "/a/bd"]` gives `"/a"`, not `"/a/b"`. Absolute paths that only share the root
/// give the separator itself. No input gives an empty string.
pub fn common_prefix(separator: char, paths: &[&str]) -> String {
    let Some((first, rest)) = paths.split_first() else {
        return String::new();
    };

    let mut common: Vec<&str> = first.split(separator).collect();
    for path in rest {
        let shared = common
            .iter()
            .zip(path.split(separator))
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }

    if common.len() == 1 && common[0].is_empty() && !first.is_empty() {
        return separator.to_string();
    }
    common.join(&separator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::{FsEntry, FsMetadata, OsFs};

    use std::fs;
    use std::io::{Read, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Real filesystem whose renames always fail as if crossing devices.
    struct CrossDeviceFs {
        fail_creates_named: Option<&'static str>,
    }

    impl FileSystem for CrossDeviceFs {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            OsFs.open(path)
        }
        fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
            if let Some(name) = self.fail_creates_named
                && path.file_name().is_some_and(|n| n == name)
            {
                return Err(io::Error::other("disk full"));
            }
            OsFs.create(path)
        }
        fn stat(&self, path: &Path) -> io::Result<FsMetadata> {
            OsFs.stat(path)
        }
        fn lstat(&self, path: &Path) -> io::Result<FsMetadata> {
            OsFs.lstat(path)
        }
        fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
            OsFs.read_link(path)
        }
        fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
            OsFs.symlink(target, link)
        }
        fn remove(&self, path: &Path) -> io::Result<()> {
            OsFs.remove(path)
        }
        fn remove_all(&self, path: &Path) -> io::Result<()> {
            OsFs.remove_all(path)
        }
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::new(
                io::ErrorKind::CrossesDevices,
                "invalid cross-device link",
            ))
        }
        fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
            OsFs.chmod(path, mode)
        }
        fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            OsFs.mkdir_all(path, mode)
        }
        fn read_dir(&self, dir: &Path) -> io::Result<Vec<FsEntry>> {
            OsFs.read_dir(dir)
        }
    }

    #[test]
    fn move_falls_back_to_copy_and_delete() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("src");
        fs::create_dir_all(src.join("nested"))?;
        fs::write(src.join("a.txt"), b"hello")?;
        fs::write(src.join("nested").join("b.txt"), b"world")?;
        #[cfg(unix)]
        OsFs.chmod(&src.join("a.txt"), 0o640)?;

        let dst = root.path().join("dst");
        move_or_copy(&CrossDeviceFs { fail_creates_named: None }, &src, &dst)?;

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("a.txt"))?, b"hello");
        assert_eq!(fs::read(dst.join("nested").join("b.txt"))?, b"world");
        #[cfg(unix)]
        assert_eq!(OsFs.stat(&dst.join("a.txt"))?.mode, 0o640);
        Ok(())
    }

    #[test]
    fn failed_fallback_leaves_source_intact() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("src");
        fs::create_dir_all(&src)?;
        fs::write(src.join("a.txt"), b"hello")?;
        fs::write(src.join("poison.bin"), b"never copied")?;

        let dst = root.path().join("dst");
        let fs_impl = CrossDeviceFs {
            fail_creates_named: Some("poison.bin"),
        };
        assert!(move_or_copy(&fs_impl, &src, &dst).is_err());

        assert_eq!(fs::read(src.join("a.txt"))?, b"hello");
        assert_eq!(fs::read(src.join("poison.bin"))?, b"never copied");
        assert!(!dst.exists(), "partial copy left behind");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn move_fallback_keeps_symlinks() -> Result<()> {
        let root = tempdir()?;
        let fs_impl = CrossDeviceFs {
            fail_creates_named: None,
        };
        fs::write(root.path().join("target.txt"), b"data")?;

        let link = root.path().join("link");
        OsFs.symlink(Path::new("target.txt"), &link)?;
        let moved = root.path().join("moved");
        move_or_copy(&fs_impl, &link, &moved)?;
        assert!(OsFs.lstat(&moved)?.is_symlink);
        assert_eq!(OsFs.read_link(&moved)?, PathBuf::from("target.txt"));
        assert!(OsFs.lstat(&link).is_err());
        assert!(root.path().join("target.txt").exists());

        let dangling = root.path().join("dangling");
        OsFs.symlink(Path::new("does-not-exist"), &dangling)?;
        let dangling_dst = root.path().join("dangling_moved");
        move_or_copy(&fs_impl, &dangling, &dangling_dst)?;
        assert_eq!(
            OsFs.read_link(&dangling_dst)?,
            PathBuf::from("does-not-exist")
        );
        assert!(OsFs.lstat(&dangling).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn move_fallback_does_not_follow_cyclic_links() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("tree");
        fs::create_dir(&src)?;
        fs::write(src.join("f.txt"), b"x")?;
        OsFs.symlink(Path::new(".."), &src.join("up"))?;

        let dst = root.path().join("out");
        move_or_copy(&CrossDeviceFs { fail_creates_named: None }, &src, &dst)?;

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("f.txt"))?, b"x");
        assert!(OsFs.lstat(&dst.join("up"))?.is_symlink);
        assert_eq!(OsFs.read_link(&dst.join("up"))?, PathBuf::from(".."));
        Ok(())
    }

    #[test]
    fn plain_rename_moves_file() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("a.txt");
        let dst = root.path().join("b.txt");
        fs::write(&src, b"hi")?;

        move_or_copy(&OsFs, &src, &dst)?;
        assert!(!src.exists());
        assert_eq!(fs::read(&dst)?, b"hi");
        Ok(())
    }

    #[test]
    fn copy_keeps_source() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("a.txt");
        fs::write(&src, b"hi")?;

        copy(&OsFs, &src, &root.path().join("b.txt"))?;
        assert!(src.exists());
        assert_eq!(fs::read(root.path().join("b.txt"))?, b"hi");
        Ok(())
    }

    #[test]
    fn copy_into_itself_is_rejected() -> Result<()> {
        let root = tempdir()?;
        let dir = root.path().join("d");
        fs::create_dir(&dir)?;
        fs::write(dir.join("f"), b"x")?;

        let err = copy(&OsFs, &dir, &dir.join("d")).err();
        assert_eq!(err.map(|e| e.kind()), Some(io::ErrorKind::InvalidInput));
        assert!(!dir.join("d").exists());
        Ok(())
    }

    #[test]
    fn remove_many_is_positional() -> Result<()> {
        let root = tempdir()?;
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::write(&a, b"x")?;
        fs::create_dir_all(b.join("inner"))?;
        fs::write(b.join("inner").join("f"), b"x")?;

        let paths = vec![a.clone(), root.path().join("missing"), b.clone()];
        let results = remove_many(&CancelToken::new(), &OsFs, &paths, 3);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().err().and_then(Error::io_kind),
            Some(io::ErrorKind::NotFound)
        );
        assert!(results[2].is_ok());
        assert!(!a.exists());
        assert!(!b.exists());
        Ok(())
    }

    #[test]
    fn cancelled_batch_attempts_nothing() -> Result<()> {
        let root = tempdir()?;
        let paths: Vec<PathBuf> = (0..10).map(|i| root.path().join(format!("f{i}"))).collect();
        for p in &paths {
            fs::write(p, b"x")?;
        }
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = remove_many(&cancel, &OsFs, &paths, 4);
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| matches!(r, Err(Error::Cancelled))));
        assert!(paths.iter().all(|p| p.exists()));
        Ok(())
    }

    #[test]
    fn cancel_during_batch_skips_pending_items() {
        let cancel = CancelToken::new();
        let attempted = AtomicUsize::new(0);
        let items: Vec<usize> = (0..20).collect();

        let results = run_batch(&cancel, &items, 1, |&i| {
            attempted.fetch_add(1, Ordering::SeqCst);
            if i == 4 {
                cancel.cancel();
            }
            Ok(())
        });

        assert_eq!(attempted.load(Ordering::SeqCst), 5);
        assert!(results[..5].iter().all(|r| r.is_ok()));
        assert!(results[5..].iter().all(|r| matches!(r, Err(Error::Cancelled))));
    }

    #[test]
    fn move_many_reports_per_item() -> Result<()> {
        let root = tempdir()?;
        let src = root.path().join("one");
        fs::write(&src, b"1")?;
        fs::create_dir(root.path().join("out"))?;

        let pairs = vec![
            (src.clone(), root.path().join("out").join("one")),
            (root.path().join("ghost"), root.path().join("out").join("ghost")),
        ];
        let results = move_many(&CancelToken::new(), &OsFs, &pairs, 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(root.path().join("out").join("one").exists());
        Ok(())
    }

    #[test]
    fn empty_batch() {
        let results = remove_many(&CancelToken::new(), &OsFs, &[], 4);
        assert!(results.is_empty());
    }

    #[test]
    fn common_prefix_respects_components() {
        assert_eq!(common_prefix('/', &[]), "");
        assert_eq!(common_prefix('/', &["/a/b/c"]), "/a/b/c");
        assert_eq!(common_prefix('/', &["/a/bc/d", "/a/bd"]), "/a");
        assert_eq!(common_prefix('/', &["/a/b/c", "/a/b/d", "/a/b"]), "/a/b");
        assert_eq!(common_prefix('/', &["/x", "/y"]), "/");
        assert_eq!(common_prefix('/', &["a/b", "c/d"]), "");
        assert_eq!(common_prefix('\\', &[r"C:\a\b", r"C:\a\c"]), r"C:\a");
    }
}
