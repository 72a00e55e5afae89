//! Parallel, depth bounded directory traversal.
//!
//! [walk_down] lists a subtree and [walk_up] lists a directory and its ancestors. Both return a
//! [Walk] right away and do the work on background threads.
//!
//! Results stream through two rendezvous channels (capacity zero), one for entries and one for
//! errors, so a slow consumer throttles the traversal. Every walk thread holds a share of the
//! senders. The channels disconnect exactly once, when the last thread has finished.
//!
//! Fan-out is bounded by a pool of slots. A thread that meets a subdirectory tries to take a slot
//! without blocking. If it gets one, a new thread walks the subdirectory and frees the slot when
//! done. Otherwise the current thread walks it in place.
//!
//! No order is guaranteed between entries of different directories.

use crate::core::cancel::CancelToken;
use crate::core::error::Error;
use crate::core::fm::{Entry, browse_dir};
use crate::core::fs::FileSystem;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded, never, select};
use tracing::{trace, warn};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 16;
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 100;

/// How often a blocked send or slot wait wakes up to look at the cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Clamps a requested pool size. Zero selects [DEFAULT_CONCURRENCY].
pub fn clamp_concurrency(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_CONCURRENCY
    } else {
        requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }
}

/// One entry found by a walk, with the directory it was listed from.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub dir: PathBuf,
    pub entry: Entry,
}

impl WalkEntry {
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.entry.name())
    }
}

/// Handle to a running walk.
pub struct Walk {
    entries: Option<Receiver<WalkEntry>>,
    errors: Option<Receiver<Error>>,
    done: Receiver<()>,
}

impl Walk {
    /// Entry stream, `None` for a walk started without emission.
    pub fn entries(&self) -> Option<&Receiver<WalkEntry>> {
        self.entries.as_ref()
    }

    /// Error stream, `None` for a walk started without emission.
    pub fn errors(&self) -> Option<&Receiver<Error>> {
        self.errors.as_ref()
    }

    /// Blocks until every walk thread has finished.
    ///
    /// For an emitting walk both streams must be drained (or dropped) concurrently, otherwise the
    /// walk threads stay parked on their sends.
    pub fn wait(&self) {
        let _ = self.done.recv();
    }

    /// Drains both streams until the walk finishes.
    pub fn collect(self) -> (Vec<WalkEntry>, Vec<Error>) {
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        let mut entries_open = self.entries.is_some();
        let mut errors_open = self.errors.is_some();
        let mut entries_rx = self.entries.clone().unwrap_or_else(never);
        let mut errors_rx = self.errors.clone().unwrap_or_else(never);

        while entries_open || errors_open {
            select! {
                recv(entries_rx) -> msg => match msg {
                    Ok(entry) => entries.push(entry),
                    Err(_) => {
                        entries_open = false;
                        entries_rx = never();
                    }
                },
                recv(errors_rx) -> msg => match msg {
                    Ok(err) => errors.push(err),
                    Err(_) => {
                        errors_open = false;
                        errors_rx = never();
                    }
                },
            }
        }
        self.wait();
        (entries, errors)
    }
}

/// State shared by all threads of one walk. The channels close when the last clone drops.
struct WalkCtx {
    fs: Arc<dyn FileSystem>,
    cancel: CancelToken,
    max_depth: Option<usize>,
    parallel: bool,
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    entries_tx: Option<Sender<WalkEntry>>,
    errors_tx: Option<Sender<Error>>,
    _done: Sender<()>,
}

/// Frees a pool slot when the owning thread ends.
struct Slot(Receiver<()>);

impl Drop for Slot {
    fn drop(&mut self) {
        let _ = self.0.try_recv();
    }
}

impl WalkCtx {
    fn try_acquire(&self) -> Option<Slot> {
        self.slots_tx
            .try_send(())
            .ok()
            .map(|_| Slot(self.slots_rx.clone()))
    }

    /// Waits for a free slot unless the walk gets cancelled first.
    fn acquire(&self) -> Option<Slot> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.slots_tx.send_timeout((), CANCEL_POLL) {
                Ok(()) => return Some(Slot(self.slots_rx.clone())),
                Err(SendTimeoutError::Timeout(())) => continue,
                Err(SendTimeoutError::Disconnected(())) => return None,
            }
        }
    }

    /// Returns false when the walk should stop (cancelled or nobody listening).
    fn emit(&self, item: WalkEntry) -> bool {
        match &self.entries_tx {
            Some(tx) => send_cancellable(tx, item, &self.cancel),
            None => !self.cancel.is_cancelled(),
        }
    }

    fn report(&self, err: Error) -> bool {
        match &self.errors_tx {
            Some(tx) => send_cancellable(tx, err, &self.cancel),
            None => !self.cancel.is_cancelled(),
        }
    }
}

fn send_cancellable<T>(tx: &Sender<T>, mut item: T, cancel: &CancelToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        match tx.send_timeout(item, CANCEL_POLL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

fn new_walk(
    fs: Arc<dyn FileSystem>,
    cancel: &CancelToken,
    max_depth: Option<usize>,
    max_concurrency: usize,
    emit: bool,
) -> (Arc<WalkCtx>, Walk) {
    let (slots_tx, slots_rx) = bounded(clamp_concurrency(max_concurrency));
    let (done_tx, done_rx) = bounded(0);
    let (entries_tx, entries_rx) = if emit {
        let (tx, rx) = bounded(0);
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let (errors_tx, errors_rx) = if emit {
        let (tx, rx) = bounded(0);
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let ctx = Arc::new(WalkCtx {
        fs,
        cancel: cancel.clone(),
        parallel: max_depth.is_none_or(|d| d >= 2),
        max_depth,
        slots_tx,
        slots_rx,
        entries_tx,
        errors_tx,
        _done: done_tx,
    });
    let walk = Walk {
        entries: entries_rx,
        errors: errors_rx,
        done: done_rx,
    };
    (ctx, walk)
}

/// Runs `job` on a new named thread. On failure the job, and anything it owns, is dropped.
fn spawn_walker<F>(name: &str, job: F) -> Result<(), io::Error>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(job)
        .map(|_| ())
}

/// Walks the subtree rooted at `start`.
///
/// - `Some(0)` emits only the listing of `start`
/// - `Some(1)` adds the listing of each direct subdirectory
/// - `None` walks the whole tree
///
/// Symlinked directories are emitted but not descended into. With `emit` false nothing is sent
/// and both streams are `None`; [Walk::wait] still reports completion.
pub fn walk_down(
    cancel: &CancelToken,
    fs: Arc<dyn FileSystem>,
    start: &Path,
    max_depth: Option<usize>,
    max_concurrency: usize,
    emit: bool,
) -> Walk {
    let (ctx, walk) = new_walk(fs, cancel, max_depth, max_concurrency, emit);
    let start = start.to_path_buf();

    let root_ctx = Arc::clone(&ctx);
    let spawned = spawn_walker("rove-walk", move || {
        let Some(_slot) = root_ctx.acquire() else {
            return;
        };
        walk_dir(&root_ctx, &start, 0);
    });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start walk thread");
    }
    walk
}

fn walk_dir(ctx: &Arc<WalkCtx>, dir: &Path, level: usize) {
    if ctx.cancel.is_cancelled() {
        return;
    }

    let entries = match browse_dir(ctx.fs.as_ref(), dir) {
        Ok(entries) => entries,
        Err(e) => {
            let err = io::Error::new(e.kind(), format!("{}: {}", dir.display(), e));
            ctx.report(Error::Io(err));
            return;
        }
    };

    for entry in entries {
        if ctx.cancel.is_cancelled() {
            return;
        }

        let descend = entry.is_dir()
            && !entry.is_symlink()
            && ctx.max_depth.is_none_or(|max| level < max);
        let child = dir.join(entry.name());

        if !ctx.emit(WalkEntry {
            dir: dir.to_path_buf(),
            entry,
        }) {
            return;
        }

        if !descend {
            continue;
        }

        if ctx.parallel
            && let Some(slot) = ctx.try_acquire()
        {
            let task_ctx = Arc::clone(ctx);
            let task_dir = child.clone();
            trace!(dir = %child.display(), "spawning walk task");
            let spawned = spawn_walker("rove-walk", move || {
                let _slot = slot;
                walk_dir(&task_ctx, &task_dir, level + 1);
            });
            if spawned.is_ok() {
                continue;
            }
            // the closure (and its slot) was dropped with the failed spawn
        }
        walk_dir(ctx, &child, level + 1);
    }
}

/// Lists `start` and each ancestor, up to `max_depth` steps up or the root, whichever comes
/// first. `None` goes all the way to the root. Each directory is listed by its own thread;
/// siblings are never expanded.
pub fn walk_up(
    cancel: &CancelToken,
    fs: Arc<dyn FileSystem>,
    start: &Path,
    max_depth: Option<usize>,
    max_concurrency: usize,
    emit: bool,
) -> Walk {
    let (ctx, walk) = new_walk(fs, cancel, Some(0), max_concurrency, emit);
    let dirs: Vec<PathBuf> = start
        .ancestors()
        .take(max_depth.map_or(usize::MAX, |d| d.saturating_add(1)))
        .map(Path::to_path_buf)
        .collect();

    let root_ctx = Arc::clone(&ctx);
    let spawned = spawn_walker("rove-walk-up", move || {
        for dir in dirs {
            let Some(slot) = root_ctx.acquire() else {
                return;
            };
            let task_ctx = Arc::clone(&root_ctx);
            let task_dir = dir.clone();
            let spawned = spawn_walker("rove-walk-up", move || {
                let _slot = slot;
                walk_dir(&task_ctx, &task_dir, 0);
            });
            if spawned.is_err() {
                walk_dir(&root_ctx, &dir, 0);
            }
        }
    });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start walk thread");
    }
    walk
}
