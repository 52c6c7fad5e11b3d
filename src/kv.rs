use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// JSON blobs keyed by name, one file per key under `<store>/kv/`.
#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn open(store: &Path) -> Self {
        Self {
            dir: store.join("kv"),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Unreadable JSON counts as absent and the key is cleared.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let path = self.path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "discarding corrupted stored value");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path(key);
        let raw = serde_json::to_string(value)?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.path(key).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        count: u32,
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        assert_eq!(kv.get::<Entry>("nothing").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        let entry = Entry {
            name: "a".to_string(),
            count: 2,
        };
        kv.set("entry", &entry).unwrap();

        let reopened = KvStore::open(dir.path());
        assert_eq!(reopened.get::<Entry>("entry").unwrap(), Some(entry));
    }

    #[test]
    fn test_corrupted_value_is_cleared() {
        let dir = TempDir::new().unwrap();
        let kv_dir = dir.path().join("kv");
        fs::create_dir_all(&kv_dir).unwrap();
        fs::write(kv_dir.join("entry.json"), "{not json").unwrap();

        let kv = KvStore::open(dir.path());
        assert_eq!(kv.get::<Entry>("entry").unwrap(), None);
        assert!(!kv.contains("entry"));
    }

    #[test]
    fn test_wrong_shape_is_cleared() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        kv.set("entry", &vec![1, 2, 3]).unwrap();

        assert_eq!(kv.get::<Entry>("entry").unwrap(), None);
        assert!(!kv.contains("entry"));
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        kv.remove("nothing").unwrap();
    }
}
