use std::fmt;

use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use super::FieldType;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single cell of a row.
///
/// Encoded in its natural JSON form: string, number, `YYYY-MM-DD` string or
/// boolean. Decoding never guesses a date: every string decodes as
/// [`CellValue::Text`], and only [`CellValue::coerce_to`] on a date field
/// produces [`CellValue::Date`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Checkbox(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, number or boolean")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<CellValue, E> {
                Ok(CellValue::Checkbox(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<CellValue, E> {
                Ok(CellValue::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<CellValue, E> {
                Ok(CellValue::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<CellValue, E> {
                Ok(CellValue::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<CellValue, E> {
                Ok(CellValue::Text(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<CellValue, E> {
                Ok(CellValue::Text(value))
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

impl CellValue {
    /// The empty string is the only blank value; `false` and `0` are present.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Normalises the value toward `target` when a lossless reading exists.
    ///
    /// Browser forms submit every input as a string, so `"42"` in a number
    /// column and `"true"` in a checkbox column are read as their typed
    /// counterparts. Values with no such reading are returned unchanged:
    /// mismatches are stored, never rejected.
    pub fn coerce_to(self, target: FieldType) -> Self {
        match (target, self) {
            (FieldType::Text, Self::Date(d)) => Self::Text(d.format(DATE_FORMAT).to_string()),
            (FieldType::Number, Self::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Self::Number(n),
                _ => Self::Text(s),
            },
            (FieldType::Date, Self::Text(s)) => {
                match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT) {
                    Ok(d) => Self::Date(d),
                    Err(_) => Self::Text(s),
                }
            }
            (FieldType::Checkbox, Self::Text(s)) => match s.trim() {
                "true" => Self::Checkbox(true),
                "false" => Self::Checkbox(false),
                _ => Self::Text(s),
            },
            (_, value) => value,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Checkbox(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_json_payloads_by_shape() {
        let values: Vec<CellValue> =
            serde_json::from_value(json!(["hello", 3, 2.5, true, "2024-03-01"])).unwrap();
        assert_eq!(values[0], CellValue::Text("hello".into()));
        assert_eq!(values[1], CellValue::Number(3.0));
        assert_eq!(values[2], CellValue::Number(2.5));
        assert_eq!(values[3], CellValue::Checkbox(true));
        assert_eq!(values[4], CellValue::Text("2024-03-01".into()));
    }

    #[test]
    fn date_like_text_is_kept_verbatim() {
        let values: Vec<CellValue> =
            serde_json::from_value(json!(["2024-3-1", "  2024-03-01"])).unwrap();
        for (value, raw) in values.into_iter().zip(["2024-3-1", "  2024-03-01"]) {
            assert_eq!(value.coerce_to(FieldType::Text), CellValue::from(raw));
        }
    }

    #[test]
    fn rejects_non_scalar_cells() {
        assert!(serde_json::from_value::<CellValue>(json!({ "a": 1 })).is_err());
        assert!(serde_json::from_value::<CellValue>(json!([1])).is_err());
    }

    #[test]
    fn date_encodes_as_iso_string() {
        let value = CellValue::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("2023-12-31"));
    }

    #[test]
    fn coerces_form_strings_toward_field_type() {
        assert_eq!(
            CellValue::from("42").coerce_to(FieldType::Number),
            CellValue::Number(42.0)
        );
        assert_eq!(
            CellValue::from("true").coerce_to(FieldType::Checkbox),
            CellValue::Checkbox(true)
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            CellValue::Date(date).coerce_to(FieldType::Text),
            CellValue::Text("2024-01-02".into())
        );
    }

    #[test]
    fn mismatches_are_kept_as_given() {
        assert_eq!(
            CellValue::from("abc").coerce_to(FieldType::Number),
            CellValue::Text("abc".into())
        );
        assert_eq!(
            CellValue::Checkbox(true).coerce_to(FieldType::Date),
            CellValue::Checkbox(true)
        );
        assert_eq!(
            CellValue::from("NaN").coerce_to(FieldType::Number),
            CellValue::Text("NaN".into())
        );
    }

    #[test]
    fn only_empty_text_is_blank() {
        assert!(CellValue::from("").is_blank());
        assert!(!CellValue::from(" ").is_blank());
        assert!(!CellValue::Checkbox(false).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
