//! Field-list and row validation.
//!
//! Field lists are checked as a whole before anything is applied: a
//! rejected list leaves the table untouched.

use std::collections::HashSet;

use crate::core::{
    FieldDefinition, FieldSpec, FieldType, Result, RowValues, TableError, TableSchema,
};

pub fn validate_table_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TableError::validation("table name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Validates a proposed field list and returns the definitions to store.
///
/// Names are trimmed; uniqueness is case-sensitive on the trimmed names.
/// Input order is preserved.
pub fn validate_fields(specs: &[FieldSpec]) -> Result<Vec<FieldDefinition>> {
    let mut seen = HashSet::with_capacity(specs.len());
    let mut fields = Vec::with_capacity(specs.len());

    for (position, spec) in specs.iter().enumerate() {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TableError::validation(format!(
                "field names must not be empty (field #{})",
                position + 1
            )));
        }
        if !seen.insert(name) {
            return Err(TableError::validation(format!(
                "field names must be unique: '{}' appears more than once",
                name
            )));
        }
        let field_type = spec.field_type.trim().parse::<FieldType>().map_err(|err| match err {
            TableError::Validation(msg) => {
                TableError::validation(format!("field '{}': {}", name, msg))
            }
            other => other,
        })?;

        fields.push(FieldDefinition {
            name: name.to_string(),
            field_type,
            required: spec.required,
        });
    }

    Ok(fields)
}

/// Fails on the first required field, in schema order, that is absent or
/// holds the empty string.
pub fn check_required(schema: &TableSchema, values: &RowValues) -> Result<()> {
    for field in schema.fields().iter().filter(|field| field.required) {
        match values.get(&field.name) {
            Some(value) if !value.is_blank() => {}
            _ => return Err(TableError::MissingRequiredField(field.name.clone())),
        }
    }
    Ok(())
}

/// Normalises values of known fields toward their declared type.
/// Keys outside the schema pass through untouched.
pub fn normalize_row(schema: &TableSchema, values: RowValues) -> RowValues {
    values
        .into_iter()
        .map(|(key, value)| match schema.get_field(&key) {
            Some(field) => {
                let value = value.coerce_to(field.field_type);
                (key, value)
            }
            None => (key, value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CellValue;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            FieldDefinition::new("title", FieldType::Text).required(),
            FieldDefinition::new("done", FieldType::Checkbox).required(),
            FieldDefinition::new("notes", FieldType::Text),
        ])
    }

    fn row(pairs: &[(&str, CellValue)]) -> RowValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn accepts_valid_list_in_order() {
        let specs = vec![
            FieldSpec::new(" b ", "number"),
            FieldSpec::new("a", "text").required(),
            FieldSpec::new("c", "date"),
        ];
        let fields = validate_fields(&specs).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(fields[0].field_type, FieldType::Number);
        assert!(fields[1].required);
    }

    #[test]
    fn accepts_empty_list() {
        assert!(validate_fields(&[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_blank_name() {
        let err = validate_fields(&[FieldSpec::new("ok", "text"), FieldSpec::new("   ", "text")])
            .unwrap_err();
        assert!(matches!(err, TableError::Validation(msg) if msg.contains("#2")));
    }

    #[test]
    fn rejects_duplicates_after_trimming() {
        let err = validate_fields(&[
            FieldSpec::new("name", "text"),
            FieldSpec::new("name ", "number"),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::Validation(msg) if msg.contains("unique")));
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let specs = [FieldSpec::new("Name", "text"), FieldSpec::new("name", "text")];
        assert!(validate_fields(&specs).is_ok());
    }

    #[test]
    fn rejects_unknown_type() {
        let err = validate_fields(&[FieldSpec::new("email", "email")]).unwrap_err();
        assert!(matches!(err, TableError::Validation(msg) if msg.contains("email")));
        assert!(validate_fields(&[FieldSpec::new("x", "")]).is_err());
    }

    #[test]
    fn table_name_is_trimmed_and_required() {
        assert_eq!(validate_table_name("  Tasks ").unwrap(), "Tasks");
        assert!(validate_table_name(" ").is_err());
    }

    #[test]
    fn required_fields_must_be_present_and_non_empty() {
        let schema = schema();
        let complete = row(&[("title", "x".into()), ("done", false.into())]);
        assert!(check_required(&schema, &complete).is_ok());

        let err = check_required(&schema, &row(&[("done", true.into())])).unwrap_err();
        assert_eq!(err, TableError::MissingRequiredField("title".into()));

        let err = check_required(&schema, &row(&[("title", "".into()), ("done", true.into())]))
            .unwrap_err();
        assert_eq!(err, TableError::MissingRequiredField("title".into()));

        let err = check_required(&schema, &row(&[("title", "x".into())])).unwrap_err();
        assert_eq!(err, TableError::MissingRequiredField("done".into()));
    }

    #[test]
    fn normalize_leaves_unknown_keys() {
        let schema = TableSchema::new(vec![FieldDefinition::new("qty", FieldType::Number)]);
        let values = normalize_row(&schema, row(&[("qty", "7".into()), ("extra", "7".into())]));
        assert_eq!(values["qty"], CellValue::Number(7.0));
        assert_eq!(values["extra"], CellValue::Text("7".into()));
    }
}
