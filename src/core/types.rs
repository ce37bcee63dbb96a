use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CellValue, TableError};

/// Opaque identifier of the user owning a table, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(Uuid);

impl TableId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for TableId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable row identifier, assigned at insertion and never reused within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Checkbox,
}

impl FieldType {
    pub const ALL: [FieldType; 4] = [Self::Text, Self::Number, Self::Date, Self::Checkbox];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
        }
    }
}

impl FromStr for FieldType {
    type Err = TableError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == raw)
            .ok_or_else(|| {
                TableError::validation(format!(
                    "unknown field type '{}' (expected one of: text, number, date, checkbox)",
                    raw
                ))
            })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A field as submitted by a client, before validation.
///
/// `field_type` stays a raw string so an unknown type surfaces as a
/// validation error rather than a decoding failure. `renamed_from` is only
/// meaningful on schema updates and is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn renamed_from(mut self, old_name: impl Into<String>) -> Self {
        self.renamed_from = Some(old_name.into());
        self
    }
}

impl From<&FieldDefinition> for FieldSpec {
    fn from(def: &FieldDefinition) -> Self {
        Self {
            name: def.name.clone(),
            field_type: def.field_type.as_str().to_string(),
            required: def.required,
            renamed_from: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    fields: Vec<FieldDefinition>,
}

impl TableSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn find_field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.find_field_index(name).map(|idx| &self.fields[idx])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find_field_index(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

pub type RowValues = BTreeMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub values: RowValues,
}

impl Row {
    pub fn new(id: RowId, values: RowValues) -> Self {
        Self { id, values }
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.values.get(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }
}

/// How a mutation names its target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAddress {
    /// Position within the current row sequence; shifts when earlier rows are deleted.
    Position(usize),
    Id(RowId),
}

impl fmt::Display for RowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(idx) => write!(f, "row at index {}", idx),
            Self::Id(id) => write!(f, "row {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_type_parses_closed_set() {
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>().unwrap(), ty);
        }
        assert!(matches!(
            "email".parse::<FieldType>(),
            Err(TableError::Validation(_))
        ));
        assert!("Text".parse::<FieldType>().is_err());
    }

    #[test]
    fn field_definition_uses_type_key() {
        let def = FieldDefinition::new("title", FieldType::Text).required();
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({ "name": "title", "type": "text", "required": true })
        );
    }

    #[test]
    fn field_spec_defaults_missing_keys() {
        let spec: FieldSpec = serde_json::from_value(json!({ "name": "done" })).unwrap();
        assert_eq!(spec.field_type, "");
        assert!(!spec.required);
        assert!(spec.renamed_from.is_none());

        let spec: FieldSpec =
            serde_json::from_value(json!({ "name": "b", "type": "text", "renamedFrom": "a" }))
                .unwrap();
        assert_eq!(spec.renamed_from.as_deref(), Some("a"));
    }

    #[test]
    fn schema_lookup_by_name() {
        let schema = TableSchema::new(vec![
            FieldDefinition::new("a", FieldType::Text),
            FieldDefinition::new("b", FieldType::Number),
        ]);
        assert_eq!(schema.find_field_index("b"), Some(1));
        assert!(schema.get_field("c").is_none());
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
