use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::engine::TableStore;
use super::table::{Table, TableSummary};
use crate::core::{OwnerId, Result, TableError, TableId};

#[derive(Default)]
pub struct InMemoryTableStore {
    /// Each aggregate sits behind an `Arc`; readers keep the version they
    /// fetched even if a writer swaps in a newer one.
    tables: RwLock<HashMap<TableId, Arc<Table>>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let tables = tables
            .into_iter()
            .map(|table| (table.id(), Arc::new(table)))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Checks that `next` may replace the stored aggregate.
    pub(crate) fn check_replace(
        tables: &HashMap<TableId, Arc<Table>>,
        next: &Table,
        expected_version: u64,
    ) -> Result<()> {
        let current = tables
            .get(&next.id())
            .filter(|current| current.is_owned_by(next.owner()))
            .ok_or_else(|| TableError::not_found(format!("table {}", next.id())))?;

        if current.version() != expected_version {
            return Err(TableError::Conflict {
                expected: expected_version,
                actual: current.version(),
            });
        }
        Ok(())
    }

    pub(crate) async fn snapshot_map(&self) -> HashMap<TableId, Arc<Table>> {
        self.tables.read().await.clone()
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn insert(&self, table: Table) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&table.id()) {
            return Err(TableError::storage(format!(
                "table {} already exists",
                table.id()
            )));
        }
        tables.insert(table.id(), Arc::new(table));
        Ok(())
    }

    async fn get(&self, owner: &OwnerId, id: TableId) -> Result<Option<Arc<Table>>> {
        let table = self
            .tables
            .read()
            .await
            .get(&id)
            .filter(|table| table.is_owned_by(owner))
            .cloned();
        Ok(table)
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<TableSummary>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<&Arc<Table>> = tables
            .values()
            .filter(|table| table.is_owned_by(owner))
            .collect();
        owned.sort_by_key(|table| (table.created_at(), table.id()));
        Ok(owned.into_iter().map(|table| table.summary()).collect())
    }

    async fn replace(&self, next: Table, expected_version: u64) -> Result<()> {
        let mut tables = self.tables.write().await;
        Self::check_replace(&tables, &next, expected_version)?;
        tables.insert(next.id(), Arc::new(next));
        Ok(())
    }

    async fn remove(&self, owner: &OwnerId, id: TableId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables.get(&id).is_some_and(|table| table.is_owned_by(owner));
        if owned {
            tables.remove(&id);
        }
        Ok(owned)
    }
}
