//! Parallel original/translated line sequences.
//!
//! Each container of the page (main body, footer) carries two preformatted
//! blocks with one line per row. Row numbers are 1-based and shared between
//! the two sides.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

/// Which container of the page a line sequence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Main,
    Footer,
}

impl ContainerKind {
    /// Tag name of the container element.
    pub fn tag(&self) -> &'static str {
        match self {
            ContainerKind::Main => "main",
            ContainerKind::Footer => "footer",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One row of a container: both sides of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePair<'a> {
    pub row: u32,
    pub original: &'a str,
    pub translated: &'a str,
}

impl LinePair<'_> {
    /// Both sides are empty.
    pub fn is_blank(&self) -> bool {
        self.original.is_empty() && self.translated.is_empty()
    }

    /// Original and translated text are identical.
    pub fn is_unchanged(&self) -> bool {
        self.original == self.translated
    }
}

/// Normalize line endings, trim the block and split it into lines.
///
/// An empty block yields a single empty line, the same as splitting an
/// empty string.
pub fn split_lines(source: &str) -> Vec<String> {
    let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
    normalized.trim().split('\n').map(str::to_string).collect()
}

/// Line sequences of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineModel {
    kind: ContainerKind,
    original: Vec<String>,
    translated: Vec<String>,
}

impl LineModel {
    /// Build a model from already split lines.
    ///
    /// Fails with [`ReaderError::LineCountMismatch`] when the sides disagree.
    pub fn new(kind: ContainerKind, original: Vec<String>, translated: Vec<String>) -> Result<Self> {
        if original.len() != translated.len() {
            return Err(ReaderError::LineCountMismatch {
                container: kind,
                original: original.len(),
                translated: translated.len(),
            });
        }
        Ok(Self {
            kind,
            original,
            translated,
        })
    }

    /// Build a model from the raw contents of the two preformatted blocks.
    pub fn from_sources(kind: ContainerKind, original: &str, translated: &str) -> Result<Self> {
        Self::new(kind, split_lines(original), split_lines(translated))
    }

    /// A container with no rows.
    pub fn empty(kind: ContainerKind) -> Self {
        Self {
            kind,
            original: Vec::new(),
            translated: Vec::new(),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Stored original text of a row.
    pub fn original(&self, row: u32) -> Option<&str> {
        index_of(row).and_then(|i| self.original.get(i)).map(String::as_str)
    }

    /// Stored translated text of a row.
    pub fn translated(&self, row: u32) -> Option<&str> {
        index_of(row)
            .and_then(|i| self.translated.get(i))
            .map(String::as_str)
    }

    /// Both sides of a row.
    pub fn pair(&self, row: u32) -> Option<LinePair<'_>> {
        Some(LinePair {
            row,
            original: self.original(row)?,
            translated: self.translated(row)?,
        })
    }

    /// All rows in order.
    pub fn pairs(&self) -> impl Iterator<Item = LinePair<'_>> {
        self.original
            .iter()
            .zip(self.translated.iter())
            .enumerate()
            .map(|(i, (original, translated))| LinePair {
                row: i as u32 + 1,
                original,
                translated,
            })
    }
}

fn index_of(row: u32) -> Option<usize> {
    (row as usize).checked_sub(1)
}

/// Last successfully loaded main-body lines.
///
/// When the main container's embedded blocks come back empty (an edit-driven
/// rebuild after the `pre` blocks were consumed), the cached side is used
/// instead of rendering nothing.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
    original: Option<Vec<String>>,
    translated: Option<Vec<String>>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a container's lines, falling back to the cache for the main body.
    ///
    /// `None` or whitespace-only sources count as empty; an empty side with
    /// nothing cached yields no rows.
    pub fn resolve(
        &mut self,
        kind: ContainerKind,
        original: Option<&str>,
        translated: Option<&str>,
    ) -> Result<LineModel> {
        let original = self.side(kind, original, Side::Original);
        let translated = self.side(kind, translated, Side::Translated);
        LineModel::new(kind, original, translated)
    }

    fn side(&mut self, kind: ContainerKind, source: Option<&str>, side: Side) -> Vec<String> {
        let present = source.filter(|s| !s.trim().is_empty());
        if kind != ContainerKind::Main {
            return present.map(split_lines).unwrap_or_default();
        }

        let slot = match side {
            Side::Original => &mut self.original,
            Side::Translated => &mut self.translated,
        };
        if let Some(source) = present {
            let lines = split_lines(source);
            *slot = Some(lines.clone());
            return lines;
        }
        match slot {
            Some(cached) => {
                tracing::debug!(
                    target: "aozora::line_model",
                    ?side,
                    "main body block empty, using cached lines"
                );
                cached.clone()
            }
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Original,
    Translated,
}
