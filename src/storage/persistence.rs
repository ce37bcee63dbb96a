//! Snapshot persistence.
//!
//! State is written as a single MessagePack file. Each save goes to a temp
//! file in the same directory, is synced, then renamed over the previous
//! snapshot, so a crash leaves either the old or the new file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::engine::TableStore;
use super::memory::InMemoryTableStore;
use super::table::{Table, TableSummary};
use crate::core::{OwnerId, Result, TableError, TableId};

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope<T> {
    version: u32,
    saved_at: chrono::DateTime<chrono::Utc>,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save<T: Serialize>(&self, payload: &T) -> Result<()> {
        let envelope = SnapshotEnvelope {
            version: SNAPSHOT_FORMAT_VERSION,
            saved_at: chrono::Utc::now(),
            payload,
        };
        let bytes = rmp_serde::to_vec_named(&envelope)
            .map_err(|e| TableError::storage(format!("Failed to serialize snapshot: {}", e)))?;
        self.write_bytes(&bytes)
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)
            .map_err(|e| TableError::storage(format!("Failed to read snapshot: {}", e)))?;
        let envelope: SnapshotEnvelope<T> = rmp_serde::from_slice(&bytes)
            .map_err(|e| TableError::storage(format!("Failed to deserialize snapshot: {}", e)))?;
        if envelope.version != SNAPSHOT_FORMAT_VERSION {
            return Err(TableError::storage(format!(
                "Unsupported snapshot version {} in {}",
                envelope.version,
                self.path.display()
            )));
        }
        Ok(Some(envelope.payload))
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| {
            TableError::storage(format!("Failed to create snapshot directory: {}", e))
        })?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| TableError::storage(format!("Failed to create temp snapshot: {}", e)))?;
        temp.write_all(bytes)
            .map_err(|e| TableError::storage(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| TableError::storage(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.path)
            .map_err(|e| TableError::storage(format!("Failed to rename snapshot: {}", e)))?;
        Ok(())
    }
}

/// A [`TableStore`] that keeps tables in memory and mirrors every change to
/// a snapshot file.
///
/// Writers are serialised by `write_gate`. The new state is written to disk
/// before it becomes visible in memory, so a failed save leaves the previous
/// state in place on both sides.
pub struct SnapshotTableStore {
    inner: InMemoryTableStore,
    file: SnapshotFile,
    write_gate: Mutex<()>,
}

impl SnapshotTableStore {
    pub const FILE_NAME: &'static str = "tables.snapshot";

    /// Opens the snapshot under `data_dir`, loading existing tables.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let file = SnapshotFile::new(data_dir.as_ref().join(Self::FILE_NAME));
        let tables: Vec<Table> = file
            .load::<Vec<Table>>()?
            .unwrap_or_default()
            .into_iter()
            .map(Table::with_cell_types_restored)
            .collect();
        info!(
            path = %file.path().display(),
            tables = tables.len(),
            "opened table snapshot"
        );
        Ok(Self {
            inner: InMemoryTableStore::from_tables(tables),
            file,
            write_gate: Mutex::new(()),
        })
    }

    async fn persist(&self, tables: &HashMap<TableId, Arc<Table>>) -> Result<()> {
        let mut ordered: Vec<&Table> = tables.values().map(|table| table.as_ref()).collect();
        ordered.sort_by_key(|table| (table.created_at(), table.id()));
        let bytes = rmp_serde::to_vec_named(&SnapshotEnvelope {
            version: SNAPSHOT_FORMAT_VERSION,
            saved_at: chrono::Utc::now(),
            payload: ordered,
        })
        .map_err(|e| TableError::storage(format!("Failed to serialize snapshot: {}", e)))?;

        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.write_bytes(&bytes))
            .await
            .map_err(|e| TableError::storage(format!("Snapshot writer failed: {}", e)))??;
        debug!(tables = tables.len(), "table snapshot saved");
        Ok(())
    }
}

#[async_trait]
impl TableStore for SnapshotTableStore {
    async fn insert(&self, table: Table) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let mut tables = self.inner.snapshot_map().await;
        if tables.contains_key(&table.id()) {
            return Err(TableError::storage(format!(
                "table {} already exists",
                table.id()
            )));
        }
        tables.insert(table.id(), Arc::new(table.clone()));
        self.persist(&tables).await?;
        self.inner.insert(table).await
    }

    async fn get(&self, owner: &OwnerId, id: TableId) -> Result<Option<Arc<Table>>> {
        self.inner.get(owner, id).await
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<TableSummary>> {
        self.inner.list(owner).await
    }

    async fn replace(&self, next: Table, expected_version: u64) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let mut tables = self.inner.snapshot_map().await;
        InMemoryTableStore::check_replace(&tables, &next, expected_version)?;
        tables.insert(next.id(), Arc::new(next.clone()));
        self.persist(&tables).await?;
        self.inner.replace(next, expected_version).await
    }

    async fn remove(&self, owner: &OwnerId, id: TableId) -> Result<bool> {
        let _gate = self.write_gate.lock().await;
        let mut tables = self.inner.snapshot_map().await;
        let owned = tables.get(&id).is_some_and(|table| table.is_owned_by(owner));
        if !owned {
            return Ok(false);
        }
        tables.remove(&id);
        self.persist(&tables).await?;
        self.inner.remove(owner, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellValue, FieldDefinition, FieldType, RowValues, TableSchema};
    use tempfile::TempDir;

    fn sample_table() -> Table {
        let schema = TableSchema::new(vec![FieldDefinition::new("title", FieldType::Text)]);
        let table = Table::new(OwnerId::new("alice"), "Tasks".into(), schema);
        let mut values = RowValues::new();
        values.insert("title".into(), CellValue::from("write tests"));
        table.with_row_added(values).0
    }

    #[test]
    fn snapshot_file_round_trips_payload() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("data.snapshot"));
        assert!(file.load::<Vec<Table>>().unwrap().is_none());

        let tables = vec![sample_table()];
        file.save(&tables).unwrap();
        assert!(file.exists());
        assert_eq!(file.load::<Vec<Table>>().unwrap(), Some(tables));
    }

    #[test]
    fn corrupt_snapshot_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.snapshot");
        fs::write(&path, b"not msgpack").unwrap();
        let err = SnapshotFile::new(&path).load::<Vec<Table>>().unwrap_err();
        assert!(matches!(err, TableError::Storage(_)));
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let owner = OwnerId::new("alice");
        let table = sample_table();
        let id = table.id();

        {
            let store = SnapshotTableStore::open(dir.path()).unwrap();
            store.insert(table.clone()).await.unwrap();
            let (next, _) = table.with_row_added(RowValues::new());
            store.replace(next, table.version()).await.unwrap();
        }

        let reopened = SnapshotTableStore::open(dir.path()).unwrap();
        let loaded = reopened.get(&owner, id).await.unwrap().unwrap();
        assert_eq!(loaded.row_count(), 2);
        assert_eq!(loaded.version(), table.version() + 1);

        assert!(reopened.remove(&owner, id).await.unwrap());
        let reopened = SnapshotTableStore::open(dir.path()).unwrap();
        assert!(reopened.list(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_keeps_dates_and_text_apart() {
        let dir = TempDir::new().unwrap();
        let owner = OwnerId::new("alice");
        let schema = TableSchema::new(vec![
            FieldDefinition::new("due", FieldType::Date),
            FieldDefinition::new("code", FieldType::Text),
        ]);
        let due = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut values = RowValues::new();
        values.insert("due".into(), CellValue::Date(due));
        values.insert("code".into(), CellValue::from("2024-03-01"));
        values.insert("legacy".into(), CellValue::from("2024-03-01"));
        let (table, _) =
            Table::new(owner.clone(), "Dates".into(), schema).with_row_added(values);

        let store = SnapshotTableStore::open(dir.path()).unwrap();
        store.insert(table.clone()).await.unwrap();

        let reopened = SnapshotTableStore::open(dir.path()).unwrap();
        let loaded = reopened.get(&owner, table.id()).await.unwrap().unwrap();
        assert_eq!(*loaded, table);
        let row = &loaded.rows()[0];
        assert_eq!(row.get("due"), Some(&CellValue::Date(due)));
        assert_eq!(row.get("code"), Some(&CellValue::from("2024-03-01")));
        assert_eq!(row.get("legacy"), Some(&CellValue::from("2024-03-01")));
    }

    #[tokio::test]
    async fn rejected_replace_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotTableStore::open(dir.path()).unwrap();
        let table = sample_table();
        store.insert(table.clone()).await.unwrap();

        let (next, _) = table.with_row_added(RowValues::new());
        let err = store.replace(next, table.version() + 5).await.unwrap_err();
        assert!(matches!(err, TableError::Conflict { .. }));

        let reopened = SnapshotTableStore::open(dir.path()).unwrap();
        let loaded = reopened
            .get(&OwnerId::new("alice"), table.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*loaded, table);
    }
}
