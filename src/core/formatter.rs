//! Sorting, filtering, and display formatting for directory entries.
//!
//! The [Formatter] holds the display rules (sort key, reverse, directories first, hidden files,
//! search pattern) and turns a raw listing into the list handed to the UI.
//!
//! The pipeline always runs in the same order so repeated sorts are deterministic:
//! 1. drop hidden entries and entries rejected by the search [Matcher]
//! 2. stable sort by the primary [SortBy] key
//! 3. reverse, if requested
//! 4. stable partition with directories first, if requested
//!
//! Also renders file previews as plain text lines.

use crate::core::collate::{Matcher, natural_cmp, strip_diacritics};
use crate::core::fm::Entry;
use crate::core::fs::FileSystem;

use chrono::{DateTime, Local};
use humansize::{DECIMAL, format_size};
use serde::Deserialize;
use unicode_width::UnicodeWidthChar;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::time::SystemTime;

// Maximum file size allowed for preview (10mb)
const MAX_PREVIEW_SIZE: u64 = 10 * 1024 * 1024;
// Bytes to peek for null bytes in binary detections
const BINARY_PEEK_BYTES: usize = 1024;
const TAB_WIDTH: usize = 4;

/// Primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Natural,
    Name,
    Size,
    Modified,
    Accessed,
    Changed,
    Extension,
}

/// Formatter struct to handle sorting, filtering, and formatting of entries
/// based on user preferences.
#[derive(Debug, Clone)]
pub struct Formatter {
    sort_by: SortBy,
    reverse: bool,
    dirs_first: bool,
    show_hidden: bool,
    ignore_case: bool,
    ignore_diacritics: bool,
    search: Option<Matcher>,
}

impl Formatter {
    pub fn new(sort_by: SortBy, reverse: bool, dirs_first: bool, show_hidden: bool) -> Self {
        Self {
            sort_by,
            reverse,
            dirs_first,
            show_hidden,
            ignore_case: false,
            ignore_diacritics: false,
            search: None,
        }
    }

    /// Name keys are compared after case and/or diacritic folding.
    pub fn with_folding(mut self, ignore_case: bool, ignore_diacritics: bool) -> Self {
        self.ignore_case = ignore_case;
        self.ignore_diacritics = ignore_diacritics;
        self
    }

    /// Keeps only entries accepted by `search`.
    pub fn with_search(mut self, search: Option<Matcher>) -> Self {
        self.search = search;
        self
    }

    /// Sorts the given entries in place according to the formatter's settings.
    pub fn sort_entries(&self, entries: &mut [Entry]) {
        match self.sort_by {
            SortBy::Natural => {
                entries.sort_by(|a, b| natural_cmp(&self.sort_name(a), &self.sort_name(b)))
            }
            SortBy::Name => entries.sort_by(|a, b| self.sort_name(a).cmp(&self.sort_name(b))),
            SortBy::Size => entries.sort_by_key(|e| e.size()),
            SortBy::Modified => entries.sort_by_key(|e| e.modified()),
            SortBy::Accessed => entries.sort_by_key(|e| e.accessed()),
            SortBy::Changed => entries.sort_by_key(|e| e.changed()),
            SortBy::Extension => entries.sort_by(|a, b| self.cmp_extension(a, b)),
        }

        if self.reverse {
            entries.reverse();
        }

        if self.dirs_first {
            // sort_by_key is stable, so each group keeps the order established above.
            entries.sort_by_key(|e| !e.is_dir());
        }
    }

    /// Filters the given entries in place according to the formatter's settings, then sorts them.
    pub fn filter_entries(&self, entries: &mut Vec<Entry>) {
        entries.retain(|e| {
            let hidden_ok = self.show_hidden || !e.is_hidden();
            let search_ok = self.search.as_ref().is_none_or(|m| m.is_match(e.name()));
            hidden_ok && search_ok
        });
        self.sort_entries(entries);
    }

    fn sort_name<'a>(&self, entry: &'a Entry) -> Cow<'a, str> {
        let mut name = Cow::Borrowed(entry.name());
        if self.ignore_case {
            name = Cow::Owned(name.to_lowercase());
        }
        if self.ignore_diacritics {
            name = Cow::Owned(strip_diacritics(&name).into_owned());
        }
        name
    }

    /// Extension first (an empty extension sorts before any other), then natural name order.
    fn cmp_extension(&self, a: &Entry, b: &Entry) -> Ordering {
        let (ext_a, ext_b) = (a.extension(), b.extension());
        match (ext_a.is_empty(), ext_b.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => ext_a.cmp(&ext_b),
        }
        .then_with(|| natural_cmp(&self.sort_name(a), &self.sort_name(b)))
    }
}

/// Formats the file size into a human-readable string.
/// # Returns
/// A string representing the formatted file size or "-" for directories/unknown sizes.
pub fn format_file_size(size: Option<u64>, is_dir: bool) -> String {
    if is_dir {
        "-".into()
    } else if let Some(sz) = size {
        format_size(sz, DECIMAL)
    } else {
        "-".to_string()
    }
}

/// Formats a timestamp into a human-readable local time string.
/// # Returns
/// A string like "2024-01-31 13:37:00" or "-" if unknown.
pub fn format_file_time(time: Option<SystemTime>) -> String {
    time.map(|t| {
        let dt: DateTime<Local> = DateTime::from(t);
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    })
    .unwrap_or_else(|| "-".to_string())
}

/// Cleans a line for display by removing control characters and expanding tabs to the next
/// multiple of four columns.
pub fn sanitize_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut current_w = 0;

    for char in line.chars() {
        if char == '\t' {
            let space_count = TAB_WIDTH - (current_w % TAB_WIDTH);
            out.push_str(&" ".repeat(space_count));
            current_w += space_count;
            continue;
        }

        if char.is_control() {
            continue;
        }

        current_w += char.width().unwrap_or(0);
        out.push(char);
    }
    out
}

/// Renders a preview for any path (directory or file) as plain lines.
///
/// Large, binary, unreadable and unsupported files are replaced with a one line notice, so this
/// never fails. Directories list their children, with a trailing `/` on subdirectories.
pub fn render_preview(fs: &dyn FileSystem, path: &Path, max_lines: usize) -> Vec<String> {
    let meta = match fs.stat(path) {
        Ok(meta) => meta,
        Err(e) => return vec![io_notice(&e)],
    };

    if meta.is_dir {
        return preview_directory(fs, path, max_lines);
    }

    if meta.len > MAX_PREVIEW_SIZE {
        return vec!["[File too large for preview]".to_string()];
    }

    let mut file = match fs.open(path) {
        Ok(file) => file,
        Err(e) => return vec![io_notice(&e)],
    };

    let mut head = Vec::with_capacity(BINARY_PEEK_BYTES);
    if let Err(e) = (&mut file)
        .take(BINARY_PEEK_BYTES as u64)
        .read_to_end(&mut head)
    {
        return vec![io_notice(&e)];
    }
    if head.starts_with(b"%PDF-") || head.contains(&0) {
        return vec!["[Binary file - preview hidden]".to_string()];
    }

    let reader = BufReader::new(std::io::Cursor::new(head).chain(file));
    let mut lines = Vec::with_capacity(max_lines);
    for line in reader.lines().take(max_lines) {
        match line {
            Ok(line) => lines.push(sanitize_line(&line)),
            Err(_) => break,
        }
    }

    if lines.is_empty() {
        lines.push("[Empty file]".to_string());
    }
    lines
}

fn preview_directory(fs: &dyn FileSystem, path: &Path, max_lines: usize) -> Vec<String> {
    match crate::core::browse_dir(fs, path) {
        Ok(mut entries) => {
            Formatter::new(SortBy::Natural, false, true, true).sort_entries(&mut entries);
            let total = entries.len();
            let mut lines: Vec<String> = entries
                .iter()
                .take(max_lines)
                .map(|e| {
                    if e.is_dir() {
                        format!("{}/", sanitize_line(e.name()))
                    } else {
                        sanitize_line(e.name())
                    }
                })
                .collect();

            if lines.is_empty() {
                lines.push("[empty directory]".to_string());
            } else if total > max_lines
                && let Some(last) = lines.last_mut()
            {
                *last = "...".to_string();
            }
            lines
        }
        Err(e) => vec![io_notice(&e)],
    }
}

fn io_notice(e: &std::io::Error) -> String {
    match e.kind() {
        ErrorKind::PermissionDenied => "[Error: Permission Denied]".to_string(),
        ErrorKind::NotFound => "[Error: File Not Found]".to_string(),
        _ => format!("[Error reading file: {}]", e),
    }
}
