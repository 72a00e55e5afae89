//! Helpers for rove.
//!
//! - Generating unused filenames so pastes never overwrite
//! - Expanding and shortening the home directory in paths
//! - Clamping numeric settings to a safe range

use crate::core::FileSystem;

use tracing::warn;

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Finds the next available filename by appending _1, _2, etc. if the target exists
///
/// Example: "notes.txt" -> "notes_1.txt"
pub fn get_unused_path(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    if fs.lstat(path).is_err() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let name = path.file_name().unwrap_or_default();

    let stem = Path::new(name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let ext = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let target = parent.join(format!("{}_{}{}", stem, counter, ext));
        if fs.lstat(&target).is_err() {
            return target;
        }
        counter += 1;
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home_path(raw: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        if raw == "~" {
            return home;
        }
        if let Some(rest) = raw
            .strip_prefix("~/")
            .or_else(|| raw.strip_prefix(&format!("~{}", MAIN_SEPARATOR)))
        {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Shortens the home directory to ~ for display.
pub fn shorten_home_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if let Some(home_dir) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home_dir)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~{}{}", MAIN_SEPARATOR, stripped.display());
    }
    readable_path(path)
}

pub fn readable_path(path: &Path) -> String {
    #[cfg(windows)]
    {
        let display = path.display().to_string();
        display
            .strip_prefix(r"\\?\")
            .unwrap_or(&display)
            .to_string()
    }
    #[cfg(not(windows))]
    {
        path.display().to_string()
    }
}

/// Clamps a numeric setting, warning when the configured value was out of range.
pub fn clamp_setting(name: &str, value: usize, min: usize, max: usize) -> usize {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(
            setting = name,
            value, min, max, clamped, "setting out of range, clamped"
        );
    }
    clamped
}
