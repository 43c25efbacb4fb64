use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use redb::{Database, TableDefinition};

use crate::shared::error::{AppError, AppResult};

/// Single table holding every persisted key
const LOCAL_STORAGE: TableDefinition<&str, &str> = TableDefinition::new("local_storage");

/// Local persistent key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Redb-backed storage in the user's data directory
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("Failed to create data directory: {}", e)))?;
        }
        let db = Database::create(path)
            .map_err(|e| AppError::Storage(format!("Failed to open database: {}", e)))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| AppError::Storage(format!("Failed to begin write transaction: {}", e)))?;
        {
            let _table = write_txn
                .open_table(LOCAL_STORAGE)
                .map_err(|e| AppError::Storage(format!("Failed to open table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit transaction: {}", e)))?;

        Ok(Self { db })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| AppError::Storage(format!("Failed to begin read: {}", e)))?;
        let table = read_txn
            .open_table(LOCAL_STORAGE)
            .map_err(|e| AppError::Storage(format!("Failed to open table: {}", e)))?;
        let value = table
            .get(key)
            .map_err(|e| AppError::Storage(format!("Failed to read key: {}", e)))?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| AppError::Storage(format!("Failed to begin write: {}", e)))?;
        {
            let mut table = write_txn
                .open_table(LOCAL_STORAGE)
                .map_err(|e| AppError::Storage(format!("Failed to open table: {}", e)))?;
            table
                .insert(key, value)
                .map_err(|e| AppError::Storage(format!("Failed to insert: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit: {}", e)))
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| AppError::Storage(format!("Failed to begin write: {}", e)))?;
        {
            let mut table = write_txn
                .open_table(LOCAL_STORAGE)
                .map_err(|e| AppError::Storage(format!("Failed to open table: {}", e)))?;
            table
                .remove(key)
                .map_err(|e| AppError::Storage(format!("Failed to remove key: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit: {}", e)))
    }
}

/// In-memory fallback storage (used if the database cannot be opened)
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}
