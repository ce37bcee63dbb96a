pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, TableError};
pub use types::{
    FieldDefinition, FieldSpec, FieldType, OwnerId, Row, RowAddress, RowId, RowValues, TableId,
    TableSchema,
};
pub use value::CellValue;
