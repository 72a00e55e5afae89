//! Internal library crate for rove.
//!
//! The shipped application is the `rove` binary (`src/main.rs`).
//!
//! This library exists to share code between targets (binary, tests) and to keep modules organized.
//! This API is only used to build the `rove` binary and is not considered a library for external use.

pub mod app;
pub mod config;
pub mod core;
pub mod utils;
