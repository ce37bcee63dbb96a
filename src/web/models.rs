use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CellValue, FieldDefinition, FieldSpec, Row, RowValues, TableId};
use crate::storage::Table;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldsRequest {
    pub fields: Vec<FieldSpec>,
}

/// Row body as sent by clients; `null` cells count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct RowPayload(pub BTreeMap<String, Option<CellValue>>);

impl RowPayload {
    pub fn into_values(self) -> RowValues {
        self.0
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect()
    }
}

/// Optional precondition on the table version for mutating requests.
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    pub version: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub id: TableId,
    pub table_name: String,
    pub fields: Vec<FieldDefinition>,
    pub rows: Vec<Row>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Table> for TableView {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id(),
            table_name: table.name().to_string(),
            fields: table.schema().fields().to_vec(),
            rows: table.rows().to_vec(),
            version: table.version(),
            created_at: table.created_at(),
            updated_at: table.updated_at(),
        }
    }
}
