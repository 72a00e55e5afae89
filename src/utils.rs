//! Miscellaneous utility functions for rove.
//!
//! [helpers] provides unused-path generation, home path expansion and setting clamps.
//! [cli] parses the command line of the `rove` binary.

pub mod cli;
pub mod helpers;

pub use helpers::{
    clamp_setting, expand_home_path, get_unused_path, readable_path, shorten_home_path,
};
