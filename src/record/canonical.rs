//! Canonical record types

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Rendering used for every canonical timestamp: local, seconds precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A geographic point rendered as WKT
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WktPoint {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

impl WktPoint {
    /// Create a point from longitude/latitude degrees
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl fmt::Display for WktPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Catalogs parse this literally: keyword, one space, parenthesised pair.
        write!(f, "POINT ({} {})", self.longitude, self.latitude)
    }
}

/// A canonicalized destination value
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Point(WktPoint),
}

impl CanonicalValue {
    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    /// Text rendering used by delimited output; `None` for null
    pub fn render(&self) -> Option<String> {
        match self {
            CanonicalValue::Null => None,
            CanonicalValue::Text(s) => Some(s.clone()),
            CanonicalValue::Integer(i) => Some(i.to_string()),
            CanonicalValue::Float(f) => Some(f.to_string()),
            CanonicalValue::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
            CanonicalValue::Point(p) => Some(p.to_string()),
        }
    }

    /// Borrow the text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CanonicalValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Option<i64>> for CanonicalValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(CanonicalValue::Null, CanonicalValue::Integer)
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Null => serializer.serialize_none(),
            CanonicalValue::Text(s) => serializer.serialize_str(s),
            CanonicalValue::Integer(i) => serializer.serialize_i64(*i),
            CanonicalValue::Float(f) => serializer.serialize_f64(*f),
            CanonicalValue::Timestamp(ts) => {
                serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
            }
            CanonicalValue::Point(p) => serializer.collect_str(p),
        }
    }
}

/// One output record: destination fields in mapping order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
    fields: Vec<(String, CanonicalValue)>,
}

impl CanonicalRecord {
    /// Create an empty record with room for `capacity` fields
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a field, replacing any previous value under the same name
    pub fn insert(&mut self, field: impl Into<String>, value: CanonicalValue) {
        let field = field.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Value by destination field name
    pub fn get(&self, field: &str) -> Option<&CanonicalValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Destination field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Field/value pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
