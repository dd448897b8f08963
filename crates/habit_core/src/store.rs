use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Key under which the habit collection is persisted.
pub const HABITS_KEY: &str = "habits";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access collection `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("collection `{key}` holds malformed data: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection `{key}` is not an array of records")]
    NotAnArray { key: String },
}

/// Durable key-value storage: each key addresses one serialized array of
/// records. Reads of a key that was never written return an empty array.
pub trait CollectionStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Vec<Value>, StorageError>;
    fn write(&self, key: &str, records: &[Value]) -> Result<(), StorageError>;
}

/// `CollectionStore` keeping one pretty-printed JSON file per key inside a
/// data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CollectionStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Vec<Value>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(key, "collection not yet written, reading empty");
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })?;
        match value {
            Value::Array(records) => Ok(records),
            _ => Err(StorageError::NotAnArray {
                key: key.to_string(),
            }),
        }
    }

    fn write(&self, key: &str, records: &[Value]) -> Result<(), StorageError> {
        let payload =
            serde_json::to_vec_pretty(records).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })?;
        fs::write(self.path_for(key), payload).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })?;
        debug!(key, count = records.len(), "collection written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_keys_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.read("habits").unwrap().is_empty());
    }

    #[test]
    fn write_then_read_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let records = vec![
            serde_json::json!({"id": "a"}),
            serde_json::json!({"id": "b"}),
        ];
        store.write("habits", &records).unwrap();
        assert_eq!(store.read("habits").unwrap(), records);
    }

    #[test]
    fn non_array_contents_are_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("habits.json"), b"{\"id\": \"a\"}").unwrap();
        assert!(matches!(
            store.read("habits"),
            Err(StorageError::NotAnArray { .. })
        ));
    }

    #[test]
    fn unparseable_contents_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("habits.json"), b"not json").unwrap();
        assert!(matches!(
            store.read("habits"),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
