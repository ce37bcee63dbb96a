//! Table operations scoped to an owner.
//!
//! Mutations on one table run one at a time under that table's lock and
//! commit through a compare-and-swap on the table version. Reads take the
//! stored snapshot without locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::core::{
    FieldSpec, OwnerId, Result, Row, RowAddress, RowValues, TableError, TableId, TableSchema,
};
use crate::schema::{
    MigrationPlan, check_required, normalize_row, validate_fields, validate_table_name,
};
use crate::storage::{Table, TableStore, TableSummary};

#[derive(Default)]
struct TableLocks {
    locks: StdMutex<HashMap<TableId, Arc<Mutex<()>>>>,
}

/// Entries live only while some request holds or waits on them.
impl TableLocks {
    async fn acquire(&self, id: TableId) -> Result<TableLease<'_>> {
        let lock = {
            let mut locks = self.locks.lock()?;
            Arc::clone(locks.entry(id).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(TableLease {
            locks: self,
            id,
            guard: Some(guard),
        })
    }

    /// Drops the entry for `id` when `lock` is its only handle outside the map.
    fn release(&self, id: TableId, lock: &Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.locks.lock()?;
        let idle = locks
            .get(&id)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2);
        if idle {
            locks.remove(&id);
        }
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

/// Exclusive hold on one table; also released when the request is cancelled.
struct TableLease<'a> {
    locks: &'a TableLocks,
    id: TableId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TableLease<'_> {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let lock = Arc::clone(OwnedMutexGuard::mutex(&guard));
        drop(guard);
        if let Err(err) = self.locks.release(self.id, &lock) {
            warn!(table_id = %self.id, error = %err, "failed to release table lock");
        }
    }
}

pub struct TableService {
    store: Arc<dyn TableStore>,
    locks: TableLocks,
}

impl TableService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            locks: TableLocks::default(),
        }
    }

    pub async fn create_table(
        &self,
        owner: &OwnerId,
        name: &str,
        fields: &[FieldSpec],
    ) -> Result<Arc<Table>> {
        let name = validate_table_name(name)?;
        let fields = validate_fields(fields)?;
        let table = Table::new(owner.clone(), name, TableSchema::new(fields));
        let id = table.id();

        self.store.insert(table).await?;
        info!(owner = %owner, table_id = %id, "table created");
        self.get_table(owner, id).await
    }

    pub async fn list_tables(&self, owner: &OwnerId) -> Result<Vec<TableSummary>> {
        self.store.list(owner).await
    }

    pub async fn get_table(&self, owner: &OwnerId, id: TableId) -> Result<Arc<Table>> {
        self.store
            .get(owner, id)
            .await?
            .ok_or_else(|| table_not_found(id))
    }

    /// Deleting a table that is already gone is not an error.
    pub async fn delete_table(&self, owner: &OwnerId, id: TableId) -> Result<()> {
        let lease = self.locks.acquire(id).await?;
        let removed = self.store.remove(owner, id).await;
        drop(lease);
        if removed? {
            info!(owner = %owner, table_id = %id, "table deleted");
        }
        Ok(())
    }

    /// Replaces the field list and migrates every row in one commit.
    pub async fn update_fields(
        &self,
        owner: &OwnerId,
        id: TableId,
        fields: &[FieldSpec],
        expected_version: Option<u64>,
    ) -> Result<Arc<Table>> {
        self.mutate(owner, id, expected_version, |table| {
            let plan = MigrationPlan::new(table.schema(), fields)?;
            let rows = plan.apply(table.rows());
            info!(
                table_id = %id,
                removed = plan.removed().len(),
                added = plan.added().len(),
                renamed = plan.renamed().len(),
                rows = rows.len(),
                "fields updated"
            );
            Ok((table.with_schema(plan.into_schema(), rows), ()))
        })
        .await?;
        self.get_table(owner, id).await
    }

    pub async fn add_row(
        &self,
        owner: &OwnerId,
        id: TableId,
        values: RowValues,
        expected_version: Option<u64>,
    ) -> Result<Row> {
        self.mutate(owner, id, expected_version, |table| {
            let values = prepare_row(table, values)?;
            let (next, row) = table.with_row_added(values);
            debug!(table_id = %id, row_id = %row.id, "row added");
            Ok((next, row))
        })
        .await
    }

    pub async fn update_row(
        &self,
        owner: &OwnerId,
        id: TableId,
        address: RowAddress,
        values: RowValues,
        expected_version: Option<u64>,
    ) -> Result<Row> {
        self.mutate(owner, id, expected_version, |table| {
            table.resolve(address)?;
            let values = prepare_row(table, values)?;
            let (next, row) = table.with_row_replaced(address, values)?;
            debug!(table_id = %id, row_id = %row.id, "row updated");
            Ok((next, row))
        })
        .await
    }

    /// Returns the removed row.
    pub async fn delete_row(
        &self,
        owner: &OwnerId,
        id: TableId,
        address: RowAddress,
        expected_version: Option<u64>,
    ) -> Result<Row> {
        self.mutate(owner, id, expected_version, |table| {
            let (next, row) = table.with_row_removed(address)?;
            debug!(table_id = %id, row_id = %row.id, "row deleted");
            Ok((next, row))
        })
        .await
    }

    async fn mutate<T, F>(
        &self,
        owner: &OwnerId,
        id: TableId,
        expected_version: Option<u64>,
        change: F,
    ) -> Result<T>
    where
        F: FnOnce(&Table) -> Result<(Table, T)>,
    {
        let _lease = self.locks.acquire(id).await?;

        let current = self.get_table(owner, id).await?;
        if let Some(expected) = expected_version
            && expected != current.version()
        {
            return Err(TableError::Conflict {
                expected,
                actual: current.version(),
            });
        }

        let (next, output) = change(current.as_ref()).inspect_err(|err| {
            warn!(table_id = %id, error = %err, "table change rejected");
        })?;
        self.store.replace(next, current.version()).await?;
        Ok(output)
    }
}

fn prepare_row(table: &Table, values: RowValues) -> Result<RowValues> {
    let values = normalize_row(table.schema(), values);
    check_required(table.schema(), &values)?;
    Ok(values)
}

fn table_not_found(id: TableId) -> TableError {
    TableError::not_found(format!("table {}", id))
}
