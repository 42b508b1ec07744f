//! Optional KDL configuration.
//!
//! ```kdl
//! store "~/reader/store.json"
//! fragment "feature-content.html"
//! log-level "debug"
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlError};
use miette::Diagnostic;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "aozora-reader.kdl";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    #[diagnostic(code(aozora::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    #[diagnostic(code(aozora::config::parse))]
    Parse(#[from] KdlError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderConfig {
    pub store: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl ReaderConfig {
    /// Parse config text, resolving relative paths against `base`.
    pub fn parse(source: &str, base: &Path) -> Result<Self, ConfigError> {
        let doc: KdlDocument = source.parse()?;
        let string_arg = |name: &str| -> Option<String> {
            let node = doc.get(name)?;
            node.entries().first()?.value().as_string().map(str::to_string)
        };
        let path_arg = |name: &str| string_arg(name).map(|p| base.join(p));

        Ok(Self {
            store: path_arg("store"),
            fragment: path_arg("fragment"),
            log_level: string_arg("log-level"),
        })
    }

    /// Load the first config found: the explicit path, next to the
    /// document, then the user config directory. No file means defaults.
    pub fn discover(document: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => {
                let mut candidates = Vec::new();
                if let Some(dir) = document.parent() {
                    candidates.push(dir.join(CONFIG_FILE_NAME));
                }
                if let Some(dir) = dirs::config_dir() {
                    candidates.push(dir.join("aozora-reader").join(CONFIG_FILE_NAME));
                }
                candidates
            }
        };

        for path in candidates {
            if explicit.is_none() && !path.exists() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            tracing::debug!(path = %path.display(), "loaded config");
            return Self::parse(&source, base);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = ReaderConfig::parse(
            "store \"state/store.json\"\nlog-level \"debug\"\n",
            Path::new("/home/reader"),
        )
        .unwrap();
        assert_eq!(
            config.store,
            Some(PathBuf::from("/home/reader/state/store.json"))
        );
        assert_eq!(config.fragment, None);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_absolute_paths_kept() {
        let config =
            ReaderConfig::parse("fragment \"/srv/feature-content.html\"", Path::new("/etc")).unwrap();
        assert_eq!(
            config.fragment,
            Some(PathBuf::from("/srv/feature-content.html"))
        );
    }

    #[test]
    fn test_invalid_config() {
        let err = ReaderConfig::parse("store \"unterminated", Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(
            err.code().map(|code| code.to_string()).as_deref(),
            Some("aozora::config::parse")
        );
        assert!(err.to_string().starts_with("invalid config: "));
    }

    #[test]
    fn test_discover_next_to_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "log-level \"trace\"").unwrap();
        let config = ReaderConfig::discover(&dir.path().join("book.html"), None).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("trace"));
    }
}
