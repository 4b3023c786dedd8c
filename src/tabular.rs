//! Tabular projection
//!
//! Flattens record sequences into rows keyed by dotted field names. Nested
//! objects are flattened (`relation.referenceId`); arrays stay intact as
//! cell values since their element count varies per record.

use crate::types::{Record, Table};
use serde_json::{Map, Value};

/// Project a record sequence into rows keyed by flattened field name
pub fn to_table(records: &[Record]) -> Table {
    records.iter().map(flatten_record).collect()
}

fn flatten_record(record: &Record) -> Map<String, Value> {
    let mut row = Map::new();
    match record {
        Value::Object(fields) => flatten_into(&mut row, "", fields),
        other => {
            // Scalar records happen on a few list routes
            row.insert("value".to_string(), other.clone());
        }
    }
    row
}

fn flatten_into(row: &mut Map<String, Value>, prefix: &str, fields: &Map<String, Value>) {
    for (key, value) in fields {
        let column = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(row, &column, nested),
            other => {
                row.insert(column, other.clone());
            }
        }
    }
}
