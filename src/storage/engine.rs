use std::sync::Arc;

use async_trait::async_trait;

use super::table::{Table, TableSummary};
use crate::core::{OwnerId, Result, TableId};

/// Persistence contract for table aggregates.
///
/// Aggregates are keyed by `(owner, table id)`: a table owned by someone
/// else reads as absent. Writes replace the whole aggregate at once.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn insert(&self, table: Table) -> Result<()>;

    /// Snapshot read of schema and rows together.
    async fn get(&self, owner: &OwnerId, id: TableId) -> Result<Option<Arc<Table>>>;

    async fn list(&self, owner: &OwnerId) -> Result<Vec<TableSummary>>;

    /// Swaps in `next` if the stored aggregate is still at `expected_version`.
    ///
    /// Fails with `Conflict` on a version mismatch and `NotFound` when the
    /// table is gone or owned by someone else.
    async fn replace(&self, next: Table, expected_version: u64) -> Result<()>;

    /// Returns whether a table was removed.
    async fn remove(&self, owner: &OwnerId, id: TableId) -> Result<bool>;
}
