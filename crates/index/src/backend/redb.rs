//! Single-file persistent backend on redb.
//!
//! Selected from the engine config with:
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: /data/akin.redb
//! ```

use crate::{IndexError, StorageBackend};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

/// Table holding every Akin blob, keyed by namespaced string keys.
const AKIN_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("akin_blobs");

/// Blobs in one redb table. Every write is its own committed transaction.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open the database at `path`, creating the file and table if needed.
    ///
    /// # Example
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/akin.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(IndexError::backend)?;

        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        {
            let _table = write_txn
                .open_table(AKIN_TABLE)
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        log::debug!("opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    fn write(
        &self,
        apply: impl FnOnce(
            &mut redb::Table<'_, &'static str, &'static [u8]>,
        ) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut table = write_txn
                .open_table(AKIN_TABLE)
                .map_err(IndexError::backend)?;
            apply(&mut table)?;
        }
        write_txn.commit().map_err(IndexError::backend)
    }
}

impl StorageBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.write(|table| {
            table.insert(key, value).map_err(IndexError::backend)?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(AKIN_TABLE)
            .map_err(IndexError::backend)?;

        match table.get(key).map_err(IndexError::backend)? {
            Some(value) => Ok(Some(value.value().to_vec())),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.write(|table| {
            table.remove(key).map_err(IndexError::backend)?;
            Ok(())
        })
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        self.write(|table| {
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(IndexError::backend)?;
            }
            Ok(())
        })
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let table = read_txn
            .open_table(AKIN_TABLE)
            .map_err(IndexError::backend)?;

        for item in table.range(prefix..).map_err(IndexError::backend)? {
            let (key, value) = item.map_err(IndexError::backend)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value.value())?;
        }

        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<(), IndexError> {
        let mut keys = Vec::new();
        self.scan_prefix(prefix, &mut |key, _| {
            keys.push(key.to_string());
            Ok(())
        })?;
        self.write(|table| {
            for key in &keys {
                table.remove(key.as_str()).map_err(IndexError::backend)?;
            }
            Ok(())
        })
    }

    fn flush(&self) -> Result<(), IndexError> {
        // Redb commits are synchronous, so flush is a no-op
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_redb_backend_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("key1", b"value1").unwrap();
        assert_eq!(backend.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(backend.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_redb_backend_batch_and_delete() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend
            .batch_put(vec![
                ("key1".to_string(), b"value1".to_vec()),
                ("key2".to_string(), b"value2".to_vec()),
            ])
            .unwrap();
        assert_eq!(backend.get("key2").unwrap(), Some(b"value2".to_vec()));

        backend.delete("key1").unwrap();
        assert_eq!(backend.get("key1").unwrap(), None);
    }

    #[test]
    fn test_redb_backend_scan_prefix() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("ds/b", b"2").unwrap();
        backend.put("ds/a", b"1").unwrap();
        backend.put("template/x", b"3").unwrap();

        let mut keys = Vec::new();
        backend
            .scan_prefix("ds/", &mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["ds/a", "ds/b"]);

        backend.delete_prefix("ds/").unwrap();
        assert_eq!(backend.get("ds/a").unwrap(), None);
        assert_eq!(backend.get("template/x").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_redb_backend_reopen_keeps_data() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let backend = RedbBackend::open(temp_file.path()).unwrap();
            backend.put("persisted", b"yes").unwrap();
        }
        let backend = RedbBackend::open(temp_file.path()).unwrap();
        assert_eq!(backend.get("persisted").unwrap(), Some(b"yes".to_vec()));
    }
}
