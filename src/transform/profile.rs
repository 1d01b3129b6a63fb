//! Transform profiles and per-extract context

use super::fiscal::CalendarPeriod;
use super::mapping::FieldMapping;
use super::spatial::StatePlaneZone;

/// Columns carrying a projected coordinate pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialColumns {
    /// Source column holding x (easting)
    pub x_column: String,
    /// Source column holding y (northing)
    pub y_column: String,
    /// Zone the coordinates are expressed in
    pub zone: StatePlaneZone,
}

impl SpatialColumns {
    /// Coordinates in the default zone
    pub fn new(x_column: impl Into<String>, y_column: impl Into<String>) -> Self {
        Self {
            x_column: x_column.into(),
            y_column: y_column.into(),
            zone: StatePlaneZone::default(),
        }
    }
}

/// Where the (year, month) for fiscal derivation comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FiscalSource {
    /// No fiscal fields are derived
    #[default]
    None,
    /// Each record's own timestamp column
    Column(String),
    /// The extract's period (partition key, report as-of date)
    Context,
}

/// Columns the transform computes rather than reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedField {
    Location,
    FiscalYear,
    FiscalMonth,
    Year,
    Month,
    MonthName,
    Department,
}

impl DerivedField {
    /// Every derived field
    pub const ALL: &'static [DerivedField] = &[
        DerivedField::Location,
        DerivedField::FiscalYear,
        DerivedField::FiscalMonth,
        DerivedField::Year,
        DerivedField::Month,
        DerivedField::MonthName,
        DerivedField::Department,
    ];

    /// Column name the derived value is exposed under
    pub fn column(self) -> &'static str {
        match self {
            DerivedField::Location => "location",
            DerivedField::FiscalYear => "fiscal_year",
            DerivedField::FiscalMonth => "fiscal_month",
            DerivedField::Year => "year",
            DerivedField::Month => "month",
            DerivedField::MonthName => "month_name",
            DerivedField::Department => "department",
        }
    }

    /// Look up a derived field by column name
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.column() == name)
    }
}

/// Everything the transform needs to know about one source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformProfile {
    /// Profile name for logging
    pub name: String,
    /// Allow-list and renames
    pub mapping: FieldMapping,
    /// Coordinate pair to reproject into `location`
    pub spatial: Option<SpatialColumns>,
    /// Columns normalized to canonical timestamps
    pub timestamp_columns: Vec<String>,
    /// Source of the fiscal period
    pub fiscal: FiscalSource,
    /// Derived fields allowed to shadow a column; `None` allows all
    pub derived_fields: Option<Vec<DerivedField>>,
}

impl TransformProfile {
    /// A profile that only maps fields
    pub fn mapping_only(name: impl Into<String>, mapping: FieldMapping) -> Self {
        Self {
            name: name.into(),
            mapping,
            spatial: None,
            timestamp_columns: Vec::new(),
            fiscal: FiscalSource::None,
            derived_fields: None,
        }
    }

    /// Reproject a coordinate pair into `location`
    #[must_use]
    pub fn with_spatial(mut self, spatial: SpatialColumns) -> Self {
        self.spatial = Some(spatial);
        self
    }

    /// Normalize these columns as timestamps
    #[must_use]
    pub fn with_timestamps<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamp_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Derive fiscal fields from this source
    #[must_use]
    pub fn with_fiscal(mut self, fiscal: FiscalSource) -> Self {
        self.fiscal = fiscal;
        self
    }

    /// Only compute these derived fields; other names are read from the table
    #[must_use]
    pub fn with_derived_fields(mut self, fields: impl IntoIterator<Item = DerivedField>) -> Self {
        self.derived_fields = Some(fields.into_iter().collect());
        self
    }

    /// Whether the profile can produce a derived field for this context
    pub fn derives(&self, field: DerivedField, context: &TransformContext) -> bool {
        if let Some(ref allowed) = self.derived_fields {
            if !allowed.contains(&field) {
                return false;
            }
        }
        match field {
            DerivedField::Location => self.spatial.is_some(),
            DerivedField::FiscalYear | DerivedField::FiscalMonth => {
                !matches!(self.fiscal, FiscalSource::None)
            }
            DerivedField::Year | DerivedField::Month | DerivedField::MonthName => {
                matches!(self.fiscal, FiscalSource::Context) && context.period.is_some()
            }
            DerivedField::Department => context.department.is_some(),
        }
    }
}

/// Facts about one extract that are not in its rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformContext {
    /// Calendar period the extract covers
    pub period: Option<CalendarPeriod>,
    /// Department code the extract belongs to
    pub department: Option<i64>,
    /// Storage key or report id, for error messages
    pub origin: Option<String>,
}

impl TransformContext {
    /// Context with a calendar period
    pub fn with_period(period: CalendarPeriod) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }
}
