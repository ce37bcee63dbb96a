use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    OwnerId, Result, Row, RowAddress, RowId, RowValues, TableError, TableId, TableSchema,
};
use crate::schema::normalize_row;

/// One user table: schema and rows travel together as a single value.
///
/// A `Table` is never edited in place once stored. Every `with_*` method
/// returns the next version of the aggregate, which the store swaps in
/// atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    id: TableId,
    owner: OwnerId,
    name: String,
    schema: TableSchema,
    rows: Vec<Row>,
    next_row_id: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Schema-free listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: TableId,
    pub table_name: String,
    pub field_count: usize,
    pub row_count: usize,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(owner: OwnerId, name: String, schema: TableSchema) -> Self {
        let now = Utc::now();
        Self {
            id: TableId::generate(),
            owner,
            name,
            schema,
            rows: Vec::new(),
            next_row_id: 1,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id,
            table_name: self.name.clone(),
            field_count: self.schema.field_count(),
            row_count: self.rows.len(),
            version: self.version,
            updated_at: self.updated_at,
        }
    }

    /// Resolves an address to a position in the current row sequence.
    pub fn resolve(&self, address: RowAddress) -> Result<usize> {
        let found = match address {
            RowAddress::Position(idx) => (idx < self.rows.len()).then_some(idx),
            RowAddress::Id(id) => self.rows.iter().position(|row| row.id == id),
        };
        found.ok_or_else(|| TableError::not_found(address.to_string()))
    }

    pub fn row(&self, address: RowAddress) -> Result<&Row> {
        self.resolve(address).map(|idx| &self.rows[idx])
    }

    pub fn with_schema(&self, schema: TableSchema, rows: Vec<Row>) -> Self {
        let mut next = self.next_version();
        next.schema = schema;
        next.rows = rows;
        next
    }

    pub fn with_row_added(&self, values: RowValues) -> (Self, Row) {
        let mut next = self.next_version();
        let row = Row::new(RowId::new(next.next_row_id), values);
        next.next_row_id += 1;
        next.rows.push(row.clone());
        (next, row)
    }

    /// Replaces the values of an existing row, keeping its id and position.
    pub fn with_row_replaced(
        &self,
        address: RowAddress,
        values: RowValues,
    ) -> Result<(Self, Row)> {
        let idx = self.resolve(address)?;
        let mut next = self.next_version();
        let row = Row::new(next.rows[idx].id, values);
        next.rows[idx] = row.clone();
        Ok((next, row))
    }

    pub fn with_row_removed(&self, address: RowAddress) -> Result<(Self, Row)> {
        let idx = self.resolve(address)?;
        let mut next = self.next_version();
        let removed = next.rows.remove(idx);
        Ok((next, removed))
    }

    /// Re-reads every cell against its field type.
    ///
    /// Snapshots carry dates as plain strings, which decode as text; this
    /// restores them on load. Cells outside the schema are left as stored.
    pub(crate) fn with_cell_types_restored(mut self) -> Self {
        for row in &mut self.rows {
            row.values = normalize_row(&self.schema, std::mem::take(&mut row.values));
        }
        self
    }

    fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = Utc::now();
        next
    }
}
