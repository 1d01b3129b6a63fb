//! Transform module
//!
//! Turns a raw extract into canonical records in four ordered stages:
//!
//! 1. **Spatial** - reproject a state-plane (x, y) pair into a WKT `location`
//! 2. **Timestamps** - normalize datetime columns to `YYYY-MM-DDTHH:MM:SS`
//! 3. **Fiscal** - derive `fiscal_year` / `fiscal_month` (October start)
//! 4. **Mapping** - project onto the allow-list, rename, null empty numerics
//!
//! Stages 1-3 read raw column names; the mapping runs last and drops every
//! column (raw or derived) it does not name.
//!
//! Column names are resolved once per table into positional slots, so the
//! per-row work never looks anything up by string.

mod fiscal;
mod mapping;
mod profile;
mod profiles;
mod spatial;
mod timestamp;

pub use fiscal::{fiscal_month, fiscal_year, CalendarPeriod, FiscalPeriod, FISCAL_YEAR_START_MONTH};
pub use mapping::{FieldMapping, FieldSet};
pub use profile::{DerivedField, FiscalSource, SpatialColumns, TransformContext, TransformProfile};
pub use profiles::{CsrField, ExpenseField, ProfileKind, RevenueField};
pub use spatial::{
    Ellipsoid, LambertConformalConic, LccParameters, Reprojector, StatePlaneZone, GRS80,
    US_SURVEY_FOOT,
};
pub use timestamp::{normalize as normalize_timestamp, parse_datetime};

use crate::error::{Error, Result};
use crate::record::{CanonicalRecord, CanonicalValue, RawTable, RawValue, RowView, WktPoint};
use chrono::NaiveDateTime;
use tracing::debug;

static NULL: RawValue = RawValue::Null;

/// Transform a table with a mapping and nothing else
pub fn transform(raw: &RawTable, mapping: &FieldMapping) -> Result<Vec<CanonicalRecord>> {
    Transformer::new(TransformProfile::mapping_only("mapping", mapping.clone()))
        .transform(raw, &TransformContext::default())
}

/// Applies one profile to extracts
#[derive(Debug, Clone)]
pub struct Transformer {
    profile: TransformProfile,
    reprojector: Option<Reprojector>,
}

/// Where a destination field's value comes from
#[derive(Debug, Clone, Copy)]
enum Slot {
    Raw(usize),
    Timestamp(usize),
    Derived(DerivedField),
}

/// Column positions resolved for one table
#[derive(Debug)]
struct Plan<'p> {
    coordinates: Option<(usize, usize)>,
    timestamps: Vec<usize>,
    fiscal_column: Option<usize>,
    slots: Vec<(&'p str, Slot)>,
}

/// Values computed for one row before projection
struct Derived<'c> {
    location: Option<WktPoint>,
    fiscal: Option<FiscalPeriod>,
    period: Option<CalendarPeriod>,
    context: &'c TransformContext,
}

impl Transformer {
    /// Create a transformer for a profile
    pub fn new(profile: TransformProfile) -> Self {
        let reprojector = profile.spatial.as_ref().map(|s| Reprojector::new(s.zone));
        Self {
            profile,
            reprojector,
        }
    }

    /// The profile in use
    pub fn profile(&self) -> &TransformProfile {
        &self.profile
    }

    /// Transform every row of an extract
    ///
    /// Fails before producing any record when a mapped, coordinate or
    /// timestamp column is absent, and on the first row that cannot be
    /// canonicalized. No row is ever skipped.
    pub fn transform(
        &self,
        raw: &RawTable,
        context: &TransformContext,
    ) -> Result<Vec<CanonicalRecord>> {
        if raw.is_empty() && raw.columns().is_empty() {
            return Ok(Vec::new());
        }

        let plan = self.bind(raw, context)?;
        let records = raw
            .rows()
            .map(|row| self.transform_row(&plan, row, raw, context))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Transformed {} records with profile '{}'",
            records.len(),
            self.profile.name
        );
        Ok(records)
    }

    fn bind<'p>(&'p self, raw: &RawTable, context: &TransformContext) -> Result<Plan<'p>> {
        let require = |name: &str| {
            raw.column_index(name)
                .ok_or_else(|| Error::missing_mapped_field(name))
        };

        let coordinates = self
            .profile
            .spatial
            .as_ref()
            .map(|s| Ok::<_, Error>((require(&s.x_column)?, require(&s.y_column)?)))
            .transpose()?;

        let timestamps = self
            .profile
            .timestamp_columns
            .iter()
            .map(|c| require(c))
            .collect::<Result<Vec<_>>>()?;

        let fiscal_column = match &self.profile.fiscal {
            FiscalSource::Column(column) => Some(require(column)?),
            FiscalSource::Context if context.period.is_none() => {
                return Err(Error::config(format!(
                    "profile '{}' derives fiscal fields from the extract period, but {} has none",
                    self.profile.name,
                    context.origin.as_deref().unwrap_or("the extract")
                )));
            }
            _ => None,
        };

        let mut slots = Vec::with_capacity(self.profile.mapping.len());
        for (source, destination) in self.profile.mapping.entries() {
            let slot = if let Some(derived) = DerivedField::from_column(source)
                .filter(|d| self.profile.derives(*d, context))
            {
                Slot::Derived(derived)
            } else if let Some(index) = raw.column_index(source) {
                match timestamps.iter().position(|&t| t == index) {
                    Some(k) => Slot::Timestamp(k),
                    None => Slot::Raw(index),
                }
            } else {
                return Err(Error::missing_mapped_field(source));
            };
            slots.push((destination, slot));
        }

        Ok(Plan {
            coordinates,
            timestamps,
            fiscal_column,
            slots,
        })
    }

    fn transform_row(
        &self,
        plan: &Plan<'_>,
        row: RowView<'_>,
        raw: &RawTable,
        context: &TransformContext,
    ) -> Result<CanonicalRecord> {
        let cell = |index: usize| row.at(index).unwrap_or(&NULL);
        let column = |index: usize| raw.columns()[index].clone();

        // 1. spatial
        let location = match (plan.coordinates, &self.reprojector) {
            (Some((x, y)), Some(reprojector)) => reprojector
                .reproject(cell(x), cell(y))
                .map_err(|message| Error::malformed_row(row.index(), column(x), message))?,
            _ => None,
        };

        // 2. timestamps
        let normalized = plan
            .timestamps
            .iter()
            .map(|&index| {
                timestamp::normalize(cell(index))
                    .map_err(|message| Error::malformed_row(row.index(), column(index), message))
            })
            .collect::<Result<Vec<Option<NaiveDateTime>>>>()?;

        // 3. fiscal, after the dates it depends on
        let period = match (&self.profile.fiscal, plan.fiscal_column) {
            (FiscalSource::Column(_), Some(index)) => {
                let ts = match plan.timestamps.iter().position(|&t| t == index) {
                    Some(k) => normalized[k],
                    None => timestamp::normalize(cell(index)).map_err(|message| {
                        Error::malformed_row(row.index(), column(index), message)
                    })?,
                };
                ts.map(|ts| CalendarPeriod::from_date(ts.date()))
            }
            (FiscalSource::Context, _) => context.period,
            _ => None,
        };

        let derived = Derived {
            location,
            fiscal: period.map(|p| p.fiscal()),
            period,
            context,
        };

        // 4. projection
        let mut record = CanonicalRecord::with_capacity(plan.slots.len());
        for &(destination, slot) in &plan.slots {
            let value = match slot {
                Slot::Raw(index) => canonical_from_raw(cell(index)),
                Slot::Timestamp(k) => normalized[k].map_or(CanonicalValue::Null, CanonicalValue::Timestamp),
                Slot::Derived(field) => derived.value(field),
            };
            let value = if self.profile.mapping.is_numeric(destination) {
                null_if_empty(value)
            } else {
                value
            };
            record.insert(destination, value);
        }

        Ok(record)
    }
}

impl Derived<'_> {
    fn value(&self, field: DerivedField) -> CanonicalValue {
        match field {
            DerivedField::Location => self
                .location
                .map_or(CanonicalValue::Null, CanonicalValue::Point),
            DerivedField::FiscalYear => self.fiscal.map(|f| i64::from(f.fiscal_year)).into(),
            DerivedField::FiscalMonth => self.fiscal.map(|f| i64::from(f.fiscal_month)).into(),
            DerivedField::Year => self.period.map(|p| i64::from(p.year())).into(),
            DerivedField::Month => self.period.map(|p| i64::from(p.month())).into(),
            DerivedField::MonthName => self.period.map_or(CanonicalValue::Null, |p| {
                CanonicalValue::Text(p.month_name().to_string())
            }),
            DerivedField::Department => self.context.department.into(),
        }
    }
}

/// Carry a raw scalar over unchanged
fn canonical_from_raw(value: &RawValue) -> CanonicalValue {
    match value {
        RawValue::Null => CanonicalValue::Null,
        RawValue::Text(s) => CanonicalValue::Text(s.clone()),
        RawValue::Integer(i) => CanonicalValue::Integer(*i),
        RawValue::Float(f) if f.is_nan() => CanonicalValue::Null,
        RawValue::Float(f) => CanonicalValue::Float(*f),
    }
}

/// Numeric fields never carry an empty string
fn null_if_empty(value: CanonicalValue) -> CanonicalValue {
    match value {
        CanonicalValue::Text(s) if s.is_empty() => CanonicalValue::Null,
        other => other,
    }
}

#[cfg(test)]
mod tests;
