//! JSON-file key-value store standing in for browser local storage.

use std::collections::BTreeMap;
use std::path::PathBuf;

use aozora_reader_core::{KeyValueStore, ReaderError};

/// Every key in one JSON object, rewritten on each change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open a store, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> aozora_reader_core::Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened store");
        Ok(Self { path, entries })
    }

    fn flush(&self) -> aozora_reader_core::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, contents).map_err(|err| {
            ReaderError::Storage(format!("writing {}: {err}", self.path.display()))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> aozora_reader_core::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> aozora_reader_core::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// `<config dir>/aozora-reader/store.json`, or `store.json` in the working directory.
pub fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("aozora-reader").join("store.json"))
        .unwrap_or_else(|| PathBuf::from("store.json"))
}
