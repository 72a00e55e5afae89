//! Application layer of rove.
//!
//! - [nav]: the [Navigator] and the [NavState]/[DirState] values it hands to the UI.
//! - [clipboard]: copy/cut state consumed by paste.
//! - [listing]: directory listings cached for revisits and pre-warmed for the parent chain.
//! - [preview]: cached file and directory previews.

pub mod clipboard;
pub mod listing;
pub mod nav;
pub mod preview;

pub use clipboard::ClipboardState;
pub use listing::ListingCache;
pub use nav::{DirState, NavState, Navigator};
pub use preview::{PREVIEW_LINES, PreviewCache};
