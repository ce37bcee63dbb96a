//! Gridstore: owner-scoped tables whose columns are declared at runtime.
//!
//! A table carries a user-defined schema; rows are validated against it on
//! write, and schema edits migrate existing rows in place.

pub mod auth;
pub mod config;
pub mod core;
pub mod schema;
pub mod service;
pub mod storage;
pub mod web;

pub use crate::core::{
    CellValue, FieldDefinition, FieldSpec, FieldType, OwnerId, Result, Row, RowAddress, RowId,
    TableError, TableId, TableSchema,
};
pub use schema::MigrationPlan;
pub use service::TableService;
pub use storage::{InMemoryTableStore, SnapshotTableStore, Table, TableStore, TableSummary};
pub use web::{AppState, build_router};
