//! Raw extract types

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// An untyped scalar exactly as a source emitted it
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl RawValue {
    /// Whether the value is null or an all-whitespace string
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Integer(_) => false,
            RawValue::Float(f) => f.is_nan(),
        }
    }

    /// Borrow the text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as a float, trimming text first
    ///
    /// Returns `Ok(None)` for blank values and `Err` with the offending text
    /// when a non-blank string does not parse.
    pub fn to_f64(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            RawValue::Null => Ok(None),
            RawValue::Integer(i) => Ok(Some(*i as f64)),
            RawValue::Float(f) if f.is_nan() => Ok(None),
            RawValue::Float(f) => Ok(Some(*f)),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed.parse::<f64>().map(Some).map_err(|_| s.clone())
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RawValue::Null => serializer.serialize_none(),
            RawValue::Text(s) => serializer.serialize_str(s),
            RawValue::Integer(i) => serializer.serialize_i64(*i),
            RawValue::Float(f) => serializer.serialize_f64(*f),
        }
    }
}

/// A single source row keyed by column name
pub type RawRecord = BTreeMap<String, RawValue>;

/// An ordered sequence of rows sharing one set of column names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    /// Create an empty table with the given header
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from keyed records
    ///
    /// The first record fixes the column set; any later record with a
    /// different key set is a `MalformedRow`.
    pub fn from_records(records: Vec<RawRecord>) -> Result<Self> {
        let mut iter = records.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Self::default());
        };

        let columns: Vec<String> = first.keys().cloned().collect();
        let mut table = Self::new(columns);
        table.rows.push(first.into_values().collect());

        for (index, record) in iter.enumerate() {
            let row = index + 1;
            if record.len() != table.columns.len()
                || !record.keys().zip(&table.columns).all(|(a, b)| a == b)
            {
                let differing = record
                    .keys()
                    .find(|k| !table.columns.contains(k))
                    .or_else(|| table.columns.iter().find(|c| !record.contains_key(*c)))
                    .cloned()
                    .unwrap_or_default();
                return Err(Error::malformed_row(
                    row,
                    differing,
                    "record keys differ from the first record",
                ));
            }
            table.rows.push(record.into_values().collect());
        }

        Ok(table)
    }

    /// Append a positional row
    ///
    /// The row must have exactly one value per column.
    pub fn push_row(&mut self, values: Vec<RawValue>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::malformed_row(
                self.rows.len(),
                "*",
                format!(
                    "expected {} columns, found {}",
                    self.columns.len(),
                    values.len()
                ),
            ));
        }
        self.rows.push(values);
        Ok(())
    }

    /// Column names in source order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow a row
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|values| RowView {
            index,
            columns: &self.columns,
            values,
        })
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, values)| RowView {
                index,
                columns: &self.columns,
                values,
            })
    }

    /// Convert back into keyed records
    pub fn into_records(self) -> Vec<RawRecord> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect())
            .collect()
    }
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    index: usize,
    columns: &'a [String],
    values: &'a [RawValue],
}

impl<'a> RowView<'a> {
    /// Zero-based row position in the table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value by column name
    pub fn get(&self, column: &str) -> Option<&'a RawValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value by column position
    pub fn at(&self, position: usize) -> Option<&'a RawValue> {
        self.values.get(position)
    }

    /// Column/value pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a RawValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}
