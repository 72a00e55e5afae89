//! Configuration module for rove.
//!
//! Holds the [Config] loaded from rove.toml, split into the `[general]` and `[performance]`
//! tables. Missing keys fall back to internal defaults.

pub mod general;
pub mod load;
pub mod performance;

pub use general::InternalGeneral;
pub use load::Config;
pub use performance::InternalPerformance;

pub(crate) use general::General;
pub(crate) use performance::Performance;
