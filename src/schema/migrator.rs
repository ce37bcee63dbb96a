//! Column migration.
//!
//! A [`MigrationPlan`] is computed from the current schema and a proposed
//! field list, then applied to every row of the table. Planning validates
//! the whole proposal first, so a rejected update never touches rows.
//!
//! Fields are matched by name only. A field that disappears from the list
//! loses its data unless the replacing field declares `renamedFrom`, in
//! which case each row's value moves to the new name.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::validator::validate_fields;
use crate::core::{FieldDefinition, FieldSpec, Result, Row, TableError, TableSchema};

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    fields: Vec<FieldDefinition>,
    removed: Vec<String>,
    added: Vec<String>,
    /// `(old name, new name)` pairs.
    renamed: Vec<(String, String)>,
}

impl MigrationPlan {
    pub fn new(current: &TableSchema, specs: &[FieldSpec]) -> Result<Self> {
        let fields = validate_fields(specs)?;
        let new_names: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();

        let mut renamed = Vec::new();
        let mut sources = HashSet::new();
        for (spec, field) in specs.iter().zip(&fields) {
            let Some(source) = spec.renamed_from.as_deref().map(str::trim) else {
                continue;
            };
            if source == field.name {
                continue;
            }
            if !current.has_field(source) {
                return Err(TableError::validation(format!(
                    "field '{}' is renamed from '{}', which does not exist",
                    field.name, source
                )));
            }
            if new_names.contains(source) {
                return Err(TableError::validation(format!(
                    "field '{}' is renamed from '{}', which is still present",
                    field.name, source
                )));
            }
            if current.has_field(&field.name) {
                return Err(TableError::validation(format!(
                    "field '{}' already exists and cannot be a rename target",
                    field.name
                )));
            }
            if !sources.insert(source) {
                return Err(TableError::validation(format!(
                    "field '{}' is renamed more than once",
                    source
                )));
            }
            renamed.push((source.to_string(), field.name.clone()));
        }

        let removed = current
            .field_names()
            .filter(|name| !new_names.contains(name) && !sources.contains(name))
            .map(str::to_string)
            .collect();

        let targets: HashSet<&str> = renamed.iter().map(|(_, to)| to.as_str()).collect();
        let added = fields
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !current.has_field(name) && !targets.contains(name))
            .map(str::to_string)
            .collect();

        Ok(Self {
            fields,
            removed,
            added,
            renamed,
        })
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn added(&self) -> &[String] {
        &self.added
    }

    pub fn renamed(&self) -> &[(String, String)] {
        &self.renamed
    }

    /// Rewrites rows against the new field list.
    ///
    /// Renamed values move to their new key and are normalised toward the
    /// new field's type. Every key that is not a field of the new list is
    /// dropped; values of fields kept under the same name are untouched.
    /// Added fields stay absent until a row sets them.
    pub fn apply(&self, rows: &[Row]) -> Vec<Row> {
        let renames: HashMap<&str, &str> = self
            .renamed
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        let schema = TableSchema::new(self.fields.clone());

        let migrated: Vec<Row> = rows
            .iter()
            .map(|row| {
                let mut values = row.values.clone();
                for (from, to) in &renames {
                    if let Some(value) = values.remove(*from) {
                        let field_type = schema
                            .get_field(to)
                            .map(|field| field.field_type);
                        let value = match field_type {
                            Some(ty) => value.coerce_to(ty),
                            None => value,
                        };
                        values.insert(to.to_string(), value);
                    }
                }
                values.retain(|key, _| schema.has_field(key));
                Row::new(row.id, values)
            })
            .collect();

        debug!(
            rows = migrated.len(),
            removed = ?self.removed,
            added = ?self.added,
            renamed = ?self.renamed,
            "migrated rows to new field list"
        );

        migrated
    }

    pub fn into_schema(self) -> TableSchema {
        TableSchema::new(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellValue, FieldType, RowId, RowValues};

    fn current() -> TableSchema {
        TableSchema::new(vec![
            FieldDefinition::new("title", FieldType::Text).required(),
            FieldDefinition::new("qty", FieldType::Number),
            FieldDefinition::new("due", FieldType::Date),
        ])
    }

    fn specs_of(schema: &TableSchema) -> Vec<FieldSpec> {
        schema.fields().iter().map(FieldSpec::from).collect()
    }

    fn rows() -> Vec<Row> {
        let mut first = RowValues::new();
        first.insert("title".into(), "a".into());
        first.insert("qty".into(), 3.0.into());
        let mut second = RowValues::new();
        second.insert("title".into(), "b".into());
        second.insert("due".into(), "soon".into());
        vec![Row::new(RowId::new(1), first), Row::new(RowId::new(2), second)]
    }

    #[test]
    fn identical_list_keeps_rows() {
        let schema = current();
        let plan = MigrationPlan::new(&schema, &specs_of(&schema)).unwrap();
        assert!(plan.removed().is_empty());
        assert!(plan.added().is_empty());
        assert_eq!(plan.apply(&rows()), rows());
    }

    #[test]
    fn removed_field_is_dropped_from_every_row() {
        let plan = MigrationPlan::new(
            &current(),
            &[FieldSpec::new("title", "text").required(), FieldSpec::new("due", "date")],
        )
        .unwrap();
        assert_eq!(plan.removed(), ["qty".to_string()]);

        let before = rows();
        let after = plan.apply(&before);
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.id, new.id);
            assert!(new.get("qty").is_none());
            for (key, value) in &new.values {
                assert_eq!(old.get(key), Some(value));
            }
        }
        assert_eq!(after[1].get("due"), Some(&CellValue::Text("soon".into())));
    }

    #[test]
    fn plain_rename_loses_data() {
        let plan = MigrationPlan::new(
            &current(),
            &[FieldSpec::new("name", "text"), FieldSpec::new("qty", "number")],
        )
        .unwrap();
        assert_eq!(plan.removed(), ["title".to_string(), "due".to_string()]);
        assert_eq!(plan.added(), ["name".to_string()]);

        let after = plan.apply(&rows());
        assert!(after.iter().all(|row| row.get("name").is_none()));
        assert!(after.iter().all(|row| row.get("title").is_none()));
    }

    #[test]
    fn declared_rename_carries_values() {
        let plan = MigrationPlan::new(
            &current(),
            &[
                FieldSpec::new("name", "text").renamed_from("title"),
                FieldSpec::new("count", "text").renamed_from("qty"),
            ],
        )
        .unwrap();
        assert_eq!(plan.removed(), ["due".to_string()]);
        assert!(plan.added().is_empty());

        let after = plan.apply(&rows());
        assert_eq!(after[0].get("name"), Some(&CellValue::Text("a".into())));
        assert_eq!(after[0].get("count"), Some(&CellValue::Number(3.0)));
        assert_eq!(after[1].get("name"), Some(&CellValue::Text("b".into())));
        assert!(after[1].get("count").is_none());
        assert!(after[1].get("due").is_none());
    }

    #[test]
    fn stray_keys_are_dropped() {
        let schema = current();
        let mut values = RowValues::new();
        values.insert("title".into(), "x".into());
        values.insert("legacy".into(), true.into());
        let plan = MigrationPlan::new(&schema, &[FieldSpec::new("title", "text")]).unwrap();
        let after = plan.apply(&[Row::new(RowId::new(9), values)]);
        assert_eq!(after[0].keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn invalid_renames_are_rejected() {
        let schema = current();
        let unknown =
            MigrationPlan::new(&schema, &[FieldSpec::new("x", "text").renamed_from("nope")]);
        assert!(matches!(unknown, Err(TableError::Validation(_))));

        let still_present = MigrationPlan::new(
            &schema,
            &[
                FieldSpec::new("title", "text"),
                FieldSpec::new("x", "text").renamed_from("title"),
            ],
        );
        assert!(still_present.is_err());

        let twice = MigrationPlan::new(
            &schema,
            &[
                FieldSpec::new("x", "text").renamed_from("title"),
                FieldSpec::new("y", "text").renamed_from("title"),
            ],
        );
        assert!(twice.is_err());

        let onto_existing = MigrationPlan::new(
            &schema,
            &[FieldSpec::new("qty", "number").renamed_from("title")],
        );
        assert!(onto_existing.is_err());
    }

    #[test]
    fn invalid_list_is_rejected_before_planning() {
        let err = MigrationPlan::new(
            &current(),
            &[FieldSpec::new("a", "text"), FieldSpec::new("a", "text")],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::Validation(_)));
    }

    #[test]
    fn new_order_is_taken_verbatim() {
        let plan = MigrationPlan::new(
            &current(),
            &[
                FieldSpec::new("due", "date"),
                FieldSpec::new("title", "text").required(),
                FieldSpec::new("qty", "number"),
            ],
        )
        .unwrap();
        let schema = plan.into_schema();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["due", "title", "qty"]);
    }
}
