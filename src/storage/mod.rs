pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::TableStore;
pub use memory::InMemoryTableStore;
pub use persistence::{SnapshotFile, SnapshotTableStore};
pub use table::{Table, TableSummary};
