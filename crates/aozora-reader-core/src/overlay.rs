//! Sparse overlay of user-edited translated lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

/// File name offered when exporting the overlay.
pub const EXPORT_FILE_NAME: &str = "editData.json";

/// Row number -> replacement translated text.
///
/// Serialized as a JSON object with decimal row-number keys. An entry only
/// exists while the replacement differs from the stored translated line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditOverlay {
    rows: BTreeMap<u32, String>,
}

/// What a commit did to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayChange {
    /// An entry was created or replaced.
    Set,
    /// The text matched the stored line, so the entry was dropped.
    Removed,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse imported or persisted edit data.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ReaderError::MalformedImport)
    }

    /// Compact JSON, as kept in the store.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON with one-space indentation, as written to the export file.
    pub fn to_export_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf)
            .map_err(|err| ReaderError::Storage(format!("export produced invalid UTF-8: {err}")))
    }

    pub fn get(&self, row: u32) -> Option<&str> {
        self.rows.get(&row).map(String::as_str)
    }

    pub fn contains(&self, row: u32) -> bool {
        self.rows.contains_key(&row)
    }

    pub fn insert(&mut self, row: u32, text: impl Into<String>) {
        self.rows.insert(row, text.into());
    }

    /// Record committed text for a row against its stored translated line.
    pub fn record(&mut self, row: u32, text: &str, stored_translated: &str) -> OverlayChange {
        if text == stored_translated {
            self.rows.remove(&row);
            OverlayChange::Removed
        } else {
            self.rows.insert(row, text.to_string());
            OverlayChange::Set
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.rows.iter().map(|(row, text)| (*row, text.as_str()))
    }
}
