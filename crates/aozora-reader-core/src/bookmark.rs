//! Bookmarked rows and sequential bookmark navigation.
//!
//! The set is held explicitly and rendering projects it onto the rows; it is
//! never rebuilt from rendered markup.

use std::collections::BTreeSet;

/// Ascending set of bookmarked main-body rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkSet {
    rows: BTreeSet<u32>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted comma-separated form.
    ///
    /// Empty segments are skipped; anything that is not a row number is
    /// dropped with a warning.
    pub fn decode(encoded: &str) -> Self {
        let rows = encoded
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .filter_map(|segment| match segment.parse::<u32>() {
                Ok(row) if row > 0 => Some(row),
                _ => {
                    tracing::warn!(
                        target: "aozora::bookmark",
                        segment,
                        "dropping invalid bookmark entry"
                    );
                    None
                }
            })
            .collect();
        Self { rows }
    }

    /// Comma-separated ascending row numbers.
    pub fn encode(&self) -> String {
        self.rows
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn contains(&self, row: u32) -> bool {
        self.rows.contains(&row)
    }

    pub fn insert(&mut self, row: u32) -> bool {
        self.rows.insert(row)
    }

    /// Flip a row's bookmark. Returns whether the row is now bookmarked.
    pub fn toggle(&mut self, row: u32) -> bool {
        if self.rows.remove(&row) {
            false
        } else {
            self.rows.insert(row);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().copied()
    }

    pub fn retain(&mut self, f: impl FnMut(&u32) -> bool) {
        self.rows.retain(f);
    }
}

impl FromIterator<u32> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Which way to step through the bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Reference point for a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    /// Bookmark list hidden: step relative to the row under the cursor.
    Cursor { row_under_cursor: Option<u32> },
    /// Bookmark list open: step relative to the last visited bookmark.
    List,
}

/// Navigation state: the index of the last visited bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkNavigator {
    last_index: Option<usize>,
}

impl BookmarkNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index into the bookmark set of the last bookmark jumped to.
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    pub fn reset(&mut self) {
        self.last_index = None;
    }

    /// Pick the bookmark to jump to, updating the last visited index.
    ///
    /// Returns `None` when there is nowhere to go: no bookmarks, or cursor
    /// mode with the cursor below every bookmark.
    pub fn step(&mut self, set: &BookmarkSet, mode: NavMode, direction: Direction) -> Option<u32> {
        let rows: Vec<u32> = set.iter().collect();
        match rows.len() {
            0 => None,
            1 => Some(rows[0]),
            len => match mode {
                NavMode::Cursor {
                    row_under_cursor: Some(current),
                } => self.step_from_row(&rows, current, direction),
                NavMode::Cursor {
                    row_under_cursor: None,
                } => {
                    let index = match direction {
                        Direction::Next => 0,
                        Direction::Previous => len - 1,
                    };
                    self.last_index = Some(index);
                    Some(rows[index])
                }
                NavMode::List => {
                    let current = self.last_index.unwrap_or(0) as isize;
                    let delta = match direction {
                        Direction::Next => 1,
                        Direction::Previous => -1,
                    };
                    let index = (current + delta).rem_euclid(len as isize) as usize;
                    self.last_index = Some(index);
                    Some(rows[index])
                }
            },
        }
    }

    fn step_from_row(&mut self, rows: &[u32], current: u32, direction: Direction) -> Option<u32> {
        let index = rows.iter().position(|&row| current <= row)?;
        if rows[index] == current {
            self.last_index = Some(index);
            return Some(current);
        }

        let index = match direction {
            Direction::Next => index,
            Direction::Previous => (index + rows.len() - 1) % rows.len(),
        };
        self.last_index = Some(index);
        Some(rows[index])
    }
}
