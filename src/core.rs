//! Core engine of rove.
//!
//! Everything here is UI agnostic:
//! - [fs]: the filesystem abstraction ([FileSystem], [OsFs]).
//! - [fm]: directory listing and per-entry metadata (see [browse_dir], [Entry]).
//! - [collate]: diacritic folding, natural ordering and search matching.
//! - [formatter]: the sort/filter pipeline and text previews.
//! - [cache]: a bounded cache that prunes itself in the background.
//! - [history]: back/forward stacks with commit-on-success transitions.
//! - [walker]: concurrent directory walks.
//! - [fileop]: move, copy and delete, singly or in batches.
//!
//! Long running work takes a [CancelToken]; failures are reported through [Error].

pub mod cache;
pub mod cancel;
pub mod collate;
pub mod error;
pub mod fileop;
pub mod fm;
pub mod formatter;
pub mod fs;
pub mod history;
pub mod walker;

pub use cache::{Cache, CacheBuilder};
pub use cancel::CancelToken;
pub use collate::{MatchOptions, Matcher, natural_cmp, strip_diacritics};
pub use error::{Error, Result};
pub use fm::{Entry, browse_dir};
pub use formatter::{Formatter, SortBy, render_preview};
pub use fs::{FileSystem, FsEntry, FsMetadata, OsFs};
pub use history::{History, Transition};
pub use walker::{Walk, WalkEntry, walk_down, walk_up};
