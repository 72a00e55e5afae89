//! The general configuration settings for rove.
//!
//! This module defines the [General] struct for deserializing the `[general]` table of
//! rove.toml and the [InternalGeneral] struct used by the navigator.
//!
//! It covers display flags, sort order, search folding and delete behavior.

use crate::core::{MatchOptions, SortBy};

use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct General {
    show_hidden: bool,
    dirs_first: bool,
    sort_by: SortBy,
    sort_reverse: bool,
    ignore_case: bool,
    ignore_diacritics: bool,
    smart_case: bool,
    smart_diacritics: bool,
    glob_search: bool,
    move_to_trash: bool,
}

impl Default for General {
    fn default() -> Self {
        General {
            show_hidden: false,
            dirs_first: true,
            sort_by: SortBy::Natural,
            sort_reverse: false,
            ignore_case: true,
            ignore_diacritics: true,
            smart_case: true,
            smart_diacritics: true,
            glob_search: false,
            move_to_trash: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InternalGeneral {
    show_hidden: bool,
    dirs_first: bool,
    sort_by: SortBy,
    sort_reverse: bool,
    matching: MatchOptions,
    move_to_trash: bool,
}

impl From<General> for InternalGeneral {
    fn from(g: General) -> Self {
        Self {
            show_hidden: g.show_hidden,
            dirs_first: g.dirs_first,
            sort_by: g.sort_by,
            sort_reverse: g.sort_reverse,
            matching: MatchOptions {
                ignore_case: g.ignore_case,
                ignore_diacritics: g.ignore_diacritics,
                smart_case: g.smart_case,
                smart_diacritics: g.smart_diacritics,
                glob: g.glob_search,
            },
            move_to_trash: g.move_to_trash,
        }
    }
}

impl InternalGeneral {
    #[inline]
    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    #[inline]
    pub fn dirs_first(&self) -> bool {
        self.dirs_first
    }

    #[inline]
    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    #[inline]
    pub fn sort_reverse(&self) -> bool {
        self.sort_reverse
    }

    /// Folding and glob flags for search, also used to fold names when sorting.
    #[inline]
    pub fn matching(&self) -> MatchOptions {
        self.matching
    }

    #[inline]
    pub fn move_to_trash(&self) -> bool {
        self.move_to_trash
    }
}
