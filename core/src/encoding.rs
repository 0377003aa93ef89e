//! Conversion of arbitrary `Serialize` records into a `ValueSet`.
//!
//! The record goes through its own serde contract (field names, renames,
//! skips) into a JSON object. Each top-level field is then classified as a
//! `FieldShape`: sequences become repeated values, everything else a single
//! scalar rendered as text.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::values::{Arity, ValueSet};

/// Shape of one top-level field of a serialized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Scalar(String),
    Repeated(Vec<String>),
}

impl From<&Value> for FieldShape {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => FieldShape::Repeated(items.iter().map(scalar_text).collect()),
            other => FieldShape::Scalar(scalar_text(other)),
        }
    }
}

/// Text form of a JSON value as sent in a form field. Strings are verbatim,
/// `null` is empty, nested containers are compact JSON.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn record_fields<T: Serialize + ?Sized>(record: &T) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ApiError::SerializationError(format!(
            "expected a record with named fields, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ApiError::SerializationError(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn fill(values: &mut ValueSet, fields: &Map<String, Value>, declare_sequences: bool) {
    for (key, value) in fields {
        match FieldShape::from(value) {
            FieldShape::Scalar(s) => values.add(key, s),
            FieldShape::Repeated(items) => {
                if declare_sequences {
                    values.declare(key, Arity::Repeated);
                }
                for item in items {
                    values.add(key, item);
                }
            }
        }
    }
}

/// Convert a record into form values.
///
/// Sequence fields use the migrating layout: a one-element sequence is sent
/// bare, longer ones as `key.0 … key.(n-1)`.
pub fn to_values<T: Serialize + ?Sized>(record: &T) -> Result<ValueSet, ApiError> {
    let fields = record_fields(record)?;
    let mut values = ValueSet::new();
    fill(&mut values, &fields, false);
    Ok(values)
}

/// Like `to_values`, but every sequence field is declared `Arity::Repeated`
/// so that even one-element sequences are sent as `key.0`.
pub fn to_values_indexed<T: Serialize + ?Sized>(record: &T) -> Result<ValueSet, ApiError> {
    let fields = record_fields(record)?;
    let mut values = ValueSet::new();
    fill(&mut values, &fields, true);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Example {
        name: String,
        id: i64,
        tags: Vec<String>,
    }

    fn example() -> Example {
        Example {
            name: "Test case name".to_string(),
            id: 1,
            tags: vec!["first".into(), "second".into(), "third".into()],
        }
    }

    #[test]
    fn scalars_and_sequences_are_encoded() {
        let data = to_values(&example()).unwrap();

        assert_eq!(data.get("name"), "Test case name");
        assert_eq!(data.get("id"), "1");
        assert_eq!(data.get("tags"), vec!["first", "second", "third"]);
        assert_eq!(data.get("tags.0"), "first");
        assert_eq!(data.get("tags.1"), "second");
        assert_eq!(data.get("tags.2"), "third");
    }

    #[test]
    fn single_element_sequence_is_bare_by_default() {
        let mut ex = example();
        ex.tags = vec!["solo".into()];

        let data = to_values(&ex).unwrap();
        assert_eq!(data.get("tags"), "solo");

        let indexed = to_values_indexed(&ex).unwrap();
        assert_eq!(indexed.get("tags"), vec!["solo"]);
        assert_eq!(indexed.get("tags.0"), "solo");
    }

    #[test]
    fn empty_sequence_adds_nothing() {
        let mut ex = example();
        ex.tags.clear();
        let data = to_values(&ex).unwrap();
        assert_eq!(data.count("tags"), 0);
    }

    #[test]
    fn scalar_rendering() {
        let record = serde_json::json!({
            "flag": true,
            "ratio": 1.5,
            "nothing": null,
            "nested": {"a": 1},
            "matrix": [[1, 2], "x"],
        });
        let data = to_values(&record).unwrap();

        assert_eq!(data.get("flag"), "true");
        assert_eq!(data.get("ratio"), "1.5");
        assert_eq!(data.get("nothing"), "");
        assert_eq!(data.get("nested"), r#"{"a":1}"#);
        assert_eq!(data.get("matrix.0"), "[1,2]");
        assert_eq!(data.get("matrix.1"), "x");
    }

    #[test]
    fn serde_renames_are_honoured() {
        #[derive(Serialize)]
        struct Renamed {
            #[serde(rename = "display_name")]
            name: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            hidden: Option<u8>,
        }
        let data = to_values(&Renamed {
            name: "x",
            hidden: None,
        })
        .unwrap();
        assert_eq!(data.get("display_name"), "x");
        assert_eq!(data.count("hidden"), 0);
    }

    #[test]
    fn non_record_is_a_serialization_error() {
        let err = to_values(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }

    #[test]
    fn unserializable_map_key_is_a_serialization_error() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "v");
        let err = to_values(&map).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }
}
