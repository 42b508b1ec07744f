//! Persistence bridge: a key-value store contract plus the reader's key layout.
//!
//! The session never touches storage directly. It emits
//! [`Effect::Persist`](crate::session::Effect::Persist) and
//! [`Effect::RemoveKey`](crate::session::Effect::RemoveKey), and the host
//! applies them with [`apply_persistence`].

use std::collections::HashMap;
use std::path::Path;

use crate::bookmark::BookmarkSet;
use crate::error::Result;
use crate::overlay::EditOverlay;
use crate::session::Effect;

/// Prefix shared by every key the reader writes.
pub const KEY_PREFIX: &str = "aozoraModernJapaneseTranslation";

/// Minimal string key-value storage, shaped after browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory store, for tests and hosts without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keys for one document, namespaced by the document's file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    /// Namespace keys after a document path (`/books/rashomon.html` -> `_rashomon`).
    pub fn for_document(path: impl AsRef<Path>) -> Self {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            namespace: format!("_{stem}"),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn font_size(&self) -> String {
        format!("{KEY_PREFIX}_FontSize_{}", self.namespace)
    }

    pub fn bookmark_rows(&self) -> String {
        format!("{KEY_PREFIX}_BookmarkRows_{}", self.namespace)
    }

    pub fn mod_rows(&self) -> String {
        format!("{KEY_PREFIX}_ModRows_{}", self.namespace)
    }

    /// `(legacy key, namespaced key)` pairs from before keys were namespaced.
    fn legacy_pairs(&self) -> [(String, String); 3] {
        [
            (format!("{KEY_PREFIX}_fontsize"), self.font_size()),
            (format!("{KEY_PREFIX}_BookmarkRows"), self.bookmark_rows()),
            (format!("{KEY_PREFIX}_modRows"), self.mod_rows()),
        ]
    }
}

/// Move un-namespaced legacy entries onto this document's keys.
///
/// Returns how many entries were moved.
pub fn migrate_legacy_keys(store: &mut impl KeyValueStore, keys: &StorageKeys) -> Result<usize> {
    let mut moved = 0;
    for (legacy, current) in keys.legacy_pairs() {
        let Some(value) = store.get(&legacy).filter(|v| !v.is_empty()) else {
            continue;
        };
        store.set(&current, &value)?;
        store.remove(&legacy)?;
        tracing::info!(target: "aozora::persist", %legacy, %current, "migrated legacy key");
        moved += 1;
    }
    Ok(moved)
}

/// Font-size level, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontSize(u8);

impl FontSize {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Out-of-range levels fall back to the default.
    pub fn new(level: u8) -> Self {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Self(level)
        } else {
            Self::default()
        }
    }

    /// Parse the stored form; missing or invalid values give the default.
    pub fn parse(stored: Option<&str>) -> Self {
        stored
            .and_then(|s| s.trim().parse::<u8>().ok())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Next level, wrapping from the largest back to the smallest.
    pub fn cycle(self) -> Self {
        if self.0 >= Self::MAX {
            Self(Self::MIN)
        } else {
            Self(self.0 + 1)
        }
    }

    /// Body class selecting this size in the stylesheet.
    pub fn class_name(&self) -> String {
        format!("size{}", self.0)
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self(3)
    }
}

/// Everything the reader keeps between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub font_size: FontSize,
    pub bookmarks: BookmarkSet,
    pub overlay: EditOverlay,
}

impl PersistedState {
    /// Read state for a document, migrating legacy keys first.
    ///
    /// A corrupt overlay entry is logged and replaced with an empty overlay.
    pub fn load(store: &mut impl KeyValueStore, keys: &StorageKeys) -> Result<Self> {
        migrate_legacy_keys(store, keys)?;

        let font_size = FontSize::parse(store.get(&keys.font_size()).as_deref());
        let bookmarks = store
            .get(&keys.bookmark_rows())
            .map(|s| BookmarkSet::decode(&s))
            .unwrap_or_default();
        let overlay = match store.get(&keys.mod_rows()) {
            Some(json) => EditOverlay::from_json(&json).unwrap_or_else(|err| {
                tracing::error!(target: "aozora::persist", %err, "stored edit data is corrupt");
                EditOverlay::default()
            }),
            None => EditOverlay::default(),
        };

        Ok(Self {
            font_size,
            bookmarks,
            overlay,
        })
    }
}

/// Apply the storage effects from a dispatch to a store, ignoring the rest.
pub fn apply_persistence<'a>(
    store: &mut impl KeyValueStore,
    effects: impl IntoIterator<Item = &'a Effect>,
) -> Result<()> {
    for effect in effects {
        match effect {
            Effect::Persist { key, value } => store.set(key, value)?,
            Effect::RemoveKey { key } => store.remove(key)?,
            _ => {}
        }
    }
    Ok(())
}
