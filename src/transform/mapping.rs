//! Field mapping: the source → destination allow-list

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// A closed set of fields for one source type
///
/// Implemented by per-source enums so every column name the transform
/// touches is known at compile time.
pub trait FieldSet: Copy + Sized + 'static {
    /// Every field, in destination order
    const ALL: &'static [Self];

    /// Column name exactly as the source emits it
    fn source_column(self) -> &'static str;

    /// Destination field name
    fn destination(self) -> &'static str;

    /// Whether empty strings in this field become null
    fn is_numeric(self) -> bool {
        false
    }
}

/// Ordered source → destination mapping plus the numeric field set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
    numeric: BTreeSet<String>,
}

impl FieldMapping {
    /// Build a mapping from ordered pairs
    ///
    /// Both sides must be unique: a source column maps once and no two
    /// source columns share a destination.
    pub fn new<I, S, D>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut mapping = Self::default();
        for (source, destination) in entries {
            mapping.push(source, destination)?;
        }
        Ok(mapping)
    }

    /// Build the mapping for a typed field set
    pub fn for_fields<F: FieldSet>() -> Result<Self> {
        let mapping = Self::new(F::ALL.iter().map(|f| (f.source_column(), f.destination())))?;
        mapping.with_numeric(
            F::ALL
                .iter()
                .filter(|f| f.is_numeric())
                .map(|f| f.destination()),
        )
    }

    /// Mapping that keeps every column under its own name
    pub fn identity(columns: &[String]) -> Result<Self> {
        Self::new(columns.iter().map(|c| (c.clone(), c.clone())))
    }

    /// Append one entry
    pub fn push(&mut self, source: impl Into<String>, destination: impl Into<String>) -> Result<()> {
        let source = source.into();
        let destination = destination.into();

        if self.entries.iter().any(|(s, _)| *s == source) {
            return Err(Error::InvalidConfigValue {
                field: source,
                message: "source column is mapped more than once".to_string(),
            });
        }
        if self.entries.iter().any(|(_, d)| *d == destination) {
            return Err(Error::InvalidConfigValue {
                field: destination,
                message: "destination field is the target of more than one source column"
                    .to_string(),
            });
        }

        self.entries.push((source, destination));
        Ok(())
    }

    /// Mark destination fields as numeric
    pub fn with_numeric<I, S>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.entries.iter().any(|(_, d)| *d == field) {
                return Err(Error::InvalidConfigValue {
                    field,
                    message: "numeric field is not a mapped destination".to_string(),
                });
            }
            self.numeric.insert(field);
        }
        Ok(self)
    }

    /// (source, destination) pairs in order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, d)| (s.as_str(), d.as_str()))
    }

    /// Destination field names in order
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, d)| d.as_str())
    }

    /// Destination for a source column
    pub fn destination_of(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, d)| d.as_str())
    }

    /// Whether a destination field is numeric
    pub fn is_numeric(&self, destination: &str) -> bool {
        self.numeric.contains(destination)
    }

    /// Numeric destination fields
    pub fn numeric_fields(&self) -> impl Iterator<Item = &str> {
        self.numeric.iter().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
