//! Persistence port for remembered view preferences.
//!
//! Controllers receive a [`PreferenceStore`] instead of reaching for a
//! process-wide store, so each table owns the scope its preferences live in.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

/// Key-value persistence for small UI preferences.
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Option<Value>;
    fn save(&self, key: &str, value: Value);
}

/// In-memory store, used by tests and by views that should forget on exit.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn save(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
    }
}

/// Store backed by a single JSON document on disk.
///
/// The document is read once at open and rewritten on every save. Write
/// failures are logged and otherwise ignored: losing a remembered tab is not
/// worth interrupting the user.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Default location under the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "procure")
            .map(|dirs| dirs.data_dir().join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn save(&self, key: &str, value: Value) {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        if let Err(e) = self.flush(&values) {
            tracing::warn!("Failed to persist preferences to {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_roundtrip() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.load("contracts.tab").is_none());
        prefs.save("contracts.tab", json!("archived"));
        assert_eq!(prefs.load("contracts.tab"), Some(json!("archived")));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("preferences.json");

        let prefs = FilePreferences::open(&path).unwrap();
        prefs.save("purchases.page_size", json!(50));
        drop(prefs);

        let reopened = FilePreferences::open(&path).unwrap();
        assert_eq!(reopened.load("purchases.page_size"), Some(json!(50)));
    }

    #[test]
    fn test_empty_file_is_treated_as_empty_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("preferences.json");
        fs::write(&path, "").unwrap();

        let prefs = FilePreferences::open(&path).unwrap();
        assert!(prefs.load("anything").is_none());
    }
}
