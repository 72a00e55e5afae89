//! The navigator: the stateful "current directory" controller the UI drives.
//!
//! Every navigation reads the target directory first and only adopts it once the read
//! succeeded. A failed read leaves the current directory and the history untouched and reports
//! the error in the returned [DirState].
//!
//! The `cursor` and `selected` arguments taken by the navigation methods describe the UI's
//! position in the directory that is current when the call is made. They are stored in the
//! history so going back restores them.

use crate::app::clipboard::ClipboardState;
use crate::app::listing::ListingCache;
use crate::app::preview::PreviewCache;
use crate::config::Config;
use crate::core::fileop::{copy_many, move_many, remove_many};
use crate::core::{
    CancelToken, Entry, Error, FileSystem, Formatter, History, MatchOptions, Matcher, Result,
    SortBy,
};

use tracing::{debug, info, warn};

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Where the UI stands: a directory, the entry under the cursor and the selected entry names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
    pub path: PathBuf,
    pub cursor: String,
    pub selected: Vec<String>,
}

/// The result of a navigation, handed to the UI.
///
/// On failure `error` is set, `nav` is the unchanged current state and `entries` is empty; the
/// UI keeps showing what it had.
#[derive(Debug)]
pub struct DirState {
    pub nav: NavState,
    pub entries: Vec<Entry>,
    pub can_back: bool,
    pub can_forward: bool,
    pub can_up: bool,
    pub error: Option<Error>,
}

impl DirState {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn cursor_entry(&self) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == self.nav.cursor)
    }
}

/// Reads and arranges one directory according to the display settings.
struct Lister {
    fs: Arc<dyn FileSystem>,
    listings: ListingCache,
    show_hidden: bool,
    dirs_first: bool,
    sort_by: SortBy,
    sort_reverse: bool,
    matching: MatchOptions,
    search: Option<String>,
}

impl Lister {
    fn formatter(&self) -> Result<Formatter> {
        let search = self
            .search
            .as_deref()
            .map(|pattern| Matcher::new(pattern, self.matching))
            .transpose()?;
        Ok(
            Formatter::new(self.sort_by, self.sort_reverse, self.dirs_first, self.show_hidden)
                .with_folding(self.matching.ignore_case, self.matching.ignore_diacritics)
                .with_search(search),
        )
    }

    /// With `fresh` the directory is read from disk even when a cached listing is still valid.
    fn read(
        &self,
        path: &Path,
        cursor: &str,
        selected: &[String],
        fresh: bool,
    ) -> Result<(NavState, Vec<Entry>)> {
        let formatter = self.formatter()?;
        let mut entries = if fresh {
            self.listings.refresh(self.fs.as_ref(), path)?
        } else {
            self.listings.read(self.fs.as_ref(), path)?
        };
        formatter.filter_entries(&mut entries);

        let cursor = if entries.iter().any(|e| e.name() == cursor) {
            cursor.to_string()
        } else {
            entries
                .first()
                .map(|e| e.name().to_string())
                .unwrap_or_default()
        };
        let selected = entries
            .iter()
            .filter(|e| selected.iter().any(|s| s == e.name()))
            .map(|e| e.name().to_string())
            .collect();

        Ok((
            NavState {
                path: path.to_path_buf(),
                cursor,
                selected,
            },
            entries,
        ))
    }
}

struct Prewarm {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

pub struct Navigator {
    lister: Lister,
    current: NavState,
    history: History<NavState>,
    preview: PreviewCache,
    clipboard: ClipboardState,
    cancel: CancelToken,
    prewarm: Option<Prewarm>,
    walker_concurrency: usize,
    batch_workers: usize,
    prewarm_depth: usize,
    move_to_trash: bool,
}

impl Navigator {
    /// Creates a navigator positioned at `start` without reading it; call [Navigator::reload]
    /// for the first listing.
    ///
    /// `cancel` stops background work (cache pruning, batch operations) for the lifetime of
    /// the navigator.
    pub fn new(
        config: &Config,
        fs: Arc<dyn FileSystem>,
        cancel: &CancelToken,
        start: &Path,
    ) -> Result<Self> {
        let general = config.general();
        let perf = config.performance();
        let preview = PreviewCache::new(
            perf.preview_cache_size(),
            perf.preview_prune_interval(),
            cancel,
        )?;
        let listings = ListingCache::new(
            perf.listing_cache_size(),
            perf.preview_prune_interval(),
            cancel,
        )?;

        Ok(Self {
            lister: Lister {
                fs,
                listings,
                show_hidden: general.show_hidden(),
                dirs_first: general.dirs_first(),
                sort_by: general.sort_by(),
                sort_reverse: general.sort_reverse(),
                matching: general.matching(),
                search: None,
            },
            current: NavState {
                path: normalize(&std::path::absolute(start)?),
                ..NavState::default()
            },
            history: History::new(perf.history_depth()),
            preview,
            clipboard: ClipboardState::default(),
            cancel: cancel.clone(),
            prewarm: None,
            walker_concurrency: perf.walker_concurrency(),
            batch_workers: perf.batch_workers(),
            prewarm_depth: perf.prewarm_depth(),
            move_to_trash: general.move_to_trash(),
        })
    }

    // Getters / accessors

    #[inline]
    pub fn current(&self) -> &NavState {
        &self.current
    }

    #[inline]
    pub fn clipboard(&self) -> &ClipboardState {
        &self.clipboard
    }

    #[inline]
    pub fn show_hidden(&self) -> bool {
        self.lister.show_hidden
    }

    #[inline]
    pub fn dirs_first(&self) -> bool {
        self.lister.dirs_first
    }

    pub fn search(&self) -> Option<&str> {
        self.lister.search.as_deref()
    }

    // Navigation

    /// Opens `path` (relative paths resolve against the current directory) and records the
    /// current state in the history. The forward history is dropped.
    pub fn go(&mut self, path: &Path, cursor: &str, selected: &[String]) -> DirState {
        self.remember(cursor, selected);
        let target = normalize(&self.current.path.join(path));
        self.go_to(&target, "")
    }

    /// Goes to the parent directory with the cursor on the directory we came from.
    pub fn up(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.remember(cursor, selected);
        let Some(parent) = self.current.path.parent().map(Path::to_path_buf) else {
            return self.failed(
                io::Error::new(io::ErrorKind::NotFound, "already at the filesystem root").into(),
            );
        };
        let came_from = self
            .current
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.go_to(&parent, &came_from)
    }

    pub fn back(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.step(true, cursor, selected)
    }

    pub fn forward(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.step(false, cursor, selected)
    }

    /// Re-reads the current directory from disk. History is not touched.
    pub fn reload(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.remember(cursor, selected);
        let path = self.current.path.clone();
        match self.lister.read(&path, cursor, selected, true) {
            Ok((nav, entries)) => self.adopt(nav, entries),
            Err(e) => self.failed(e),
        }
    }

    // Display settings

    /// Filters listings by `pattern`; an empty pattern clears the filter.
    ///
    /// An invalid glob is reported in the returned state and the previous filter stays active.
    pub fn set_search(&mut self, pattern: &str, cursor: &str, selected: &[String]) -> DirState {
        self.remember(cursor, selected);
        let pattern = (!pattern.is_empty()).then(|| pattern.to_string());
        if let Some(p) = &pattern
            && let Err(e) = Matcher::new(p, self.lister.matching)
        {
            return self.failed(e);
        }
        self.lister.search = pattern;
        self.reload(cursor, selected)
    }

    pub fn toggle_hidden(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.lister.show_hidden = !self.lister.show_hidden;
        self.reload(cursor, selected)
    }

    pub fn toggle_dirs_first(&mut self, cursor: &str, selected: &[String]) -> DirState {
        self.lister.dirs_first = !self.lister.dirs_first;
        self.reload(cursor, selected)
    }

    // Preview

    /// Preview lines for the entry `name` of the current directory.
    pub fn preview(&self, name: &str) -> Arc<[String]> {
        self.preview
            .get(self.lister.fs.as_ref(), &self.current.path.join(name))
    }

    // Clipboard and file operations

    pub fn copy(&mut self, names: &[String]) {
        let paths = self.paths_of(names);
        self.clipboard.copy(paths);
    }

    pub fn cut(&mut self, names: &[String]) {
        let paths = self.paths_of(names);
        self.clipboard.cut(paths);
    }

    /// Pastes the clipboard into the current directory, one result per clipboard path.
    ///
    /// Cut items are moved and the clipboard is cleared; copied items stay on the clipboard.
    pub fn paste(&mut self) -> Vec<Result<()>> {
        let fs = self.lister.fs.as_ref();
        let targets = self.clipboard.targets(fs, &self.current.path);
        let (indices, pairs): (Vec<usize>, Vec<(PathBuf, PathBuf)>) = targets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.clone().map(|pair| (i, pair)))
            .unzip();

        let cut = self.clipboard.is_cut();
        info!(items = pairs.len(), cut, dest = %self.current.path.display(), "paste");
        let batch = if cut {
            move_many(&self.cancel, fs, &pairs, self.batch_workers)
        } else {
            copy_many(&self.cancel, fs, &pairs, self.batch_workers)
        };

        let mut results: Vec<Result<()>> = targets
            .iter()
            .map(|_| {
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "nothing to paste at this path",
                )
                .into())
            })
            .collect();
        for (idx, res) in indices.into_iter().zip(batch) {
            results[idx] = res;
        }

        self.lister.listings.invalidate(&self.current.path);
        for (src, dst) in &pairs {
            self.preview.invalidate(dst);
            if cut {
                self.preview.invalidate(src);
                if let Some(parent) = src.parent() {
                    self.lister.listings.invalidate(parent);
                }
            }
        }
        if cut {
            self.clipboard.clear();
        }
        results
    }

    /// Deletes the named entries of the current directory, one result per name.
    ///
    /// With `move_to_trash` the entries go to the system trash instead.
    pub fn delete(&mut self, names: &[String]) -> Vec<Result<()>> {
        let paths = self.paths_of(names);
        info!(items = paths.len(), trash = self.move_to_trash, "delete");
        let results = if self.move_to_trash {
            paths
                .iter()
                .map(|path| {
                    self.cancel.check()?;
                    trash::delete(path).map_err(|e| Error::Io(io::Error::other(e.to_string())))
                })
                .collect()
        } else {
            remove_many(
                &self.cancel,
                self.lister.fs.as_ref(),
                &paths,
                self.batch_workers,
            )
        };

        self.lister.listings.invalidate(&self.current.path);
        for path in &paths {
            self.preview.invalidate(path);
        }
        results
    }

    /// Blocks until the background listing of the parent directories has finished.
    pub fn wait_prewarm(&mut self) {
        if let Some(prewarm) = self.prewarm.take()
            && prewarm.handle.join().is_err()
        {
            warn!("prewarm thread panicked");
        }
    }

    // Internals

    fn go_to(&mut self, target: &Path, cursor: &str) -> DirState {
        match self.lister.read(target, cursor, &[], false) {
            Ok((nav, entries)) => {
                debug!(from = %self.current.path.display(), to = %target.display(), "go");
                self.history.go(self.current.clone());
                self.adopt(nav, entries)
            }
            Err(e) => {
                debug!(to = %target.display(), error = %e, "go failed");
                self.failed(e)
            }
        }
    }

    fn step(&mut self, back: bool, cursor: &str, selected: &[String]) -> DirState {
        self.remember(cursor, selected);
        let leaving = self.current.clone();
        let pending = if back {
            self.history.back(leaving)
        } else {
            self.history.forward(leaving)
        };
        let mut transition = match pending {
            Ok(t) => t,
            Err(e) => return self.failed(e),
        };

        let target = transition.target().clone();
        match self
            .lister
            .read(&target.path, &target.cursor, &target.selected, false)
        {
            Ok((nav, entries)) => {
                transition.commit();
                debug!(to = %nav.path.display(), back, "history step");
                self.adopt(nav, entries)
            }
            Err(e) => {
                transition.discard();
                debug!(to = %target.path.display(), error = %e, back, "history step failed");
                self.failed(e)
            }
        }
    }

    fn remember(&mut self, cursor: &str, selected: &[String]) {
        self.current.cursor = cursor.to_string();
        self.current.selected = selected.to_vec();
    }

    fn adopt(&mut self, nav: NavState, entries: Vec<Entry>) -> DirState {
        self.current = nav;
        self.start_prewarm();
        DirState {
            nav: self.current.clone(),
            entries,
            can_back: !self.history.back_empty(),
            can_forward: !self.history.forward_empty(),
            can_up: self.current.path.parent().is_some(),
            error: None,
        }
    }

    fn failed(&self, error: Error) -> DirState {
        DirState {
            nav: self.current.clone(),
            entries: Vec::new(),
            can_back: !self.history.back_empty(),
            can_forward: !self.history.forward_empty(),
            can_up: self.current.path.parent().is_some(),
            error: Some(error),
        }
    }

    /// Caches the listings of the new directory's parents in the background so going up is
    /// served from memory.
    fn start_prewarm(&mut self) {
        if let Some(previous) = self.prewarm.take() {
            previous.cancel.cancel();
        }
        if self.prewarm_depth == 0 || self.cancel.is_cancelled() {
            return;
        }
        let cancel = CancelToken::new();
        match self.lister.listings.prewarm(
            Arc::clone(&self.lister.fs),
            &cancel,
            &self.current.path,
            self.prewarm_depth,
            self.walker_concurrency,
        ) {
            Ok(handle) => self.prewarm = Some(Prewarm { cancel, handle }),
            Err(e) => warn!(error = %e, "could not start prewarm thread"),
        }
    }

    fn paths_of(&self, names: &[String]) -> Vec<PathBuf> {
        names.iter().map(|n| self.current.path.join(n)).collect()
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        if let Some(prewarm) = self.prewarm.take() {
            prewarm.cancel.cancel();
        }
    }
}

/// Resolves `.` and `..` lexically. `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
