//! Built-in field sets and transform profiles
//!
//! Each source type gets a closed enum of the columns it maps, so renaming a
//! column is a compile-time change in exactly one place.

use super::mapping::{FieldMapping, FieldSet};
use super::profile::{DerivedField, FiscalSource, SpatialColumns, TransformProfile};
use crate::error::Result;
use crate::record::RawTable;
use serde::{Deserialize, Serialize};

// ============================================================================
// 311 service requests
// ============================================================================

/// Columns of the service request export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrField {
    ServiceRequestNumber,
    Department,
    GroupDescription,
    SrDescription,
    MethodReceived,
    SrStatus,
    IsDuplicate,
    StatusChangeDate,
    CreatedDate,
    OverdueOnDate,
    LastUpdateDate,
    CloseDate,
    SrAgeDays,
    ResponseDays,
    OpenCount,
    ClosedCount,
    OverdueCount,
    ClosedOnTime,
    ClosedLate,
    DaysLate,
    SrLocation,
    StatePlaneX,
    StatePlaneY,
    Location,
    FiscalYear,
}

impl FieldSet for CsrField {
    const ALL: &'static [Self] = &[
        CsrField::ServiceRequestNumber,
        CsrField::Department,
        CsrField::GroupDescription,
        CsrField::SrDescription,
        CsrField::MethodReceived,
        CsrField::SrStatus,
        CsrField::IsDuplicate,
        CsrField::StatusChangeDate,
        CsrField::CreatedDate,
        CsrField::OverdueOnDate,
        CsrField::LastUpdateDate,
        CsrField::CloseDate,
        CsrField::SrAgeDays,
        CsrField::ResponseDays,
        CsrField::OpenCount,
        CsrField::ClosedCount,
        CsrField::OverdueCount,
        CsrField::ClosedOnTime,
        CsrField::ClosedLate,
        CsrField::DaysLate,
        CsrField::SrLocation,
        CsrField::StatePlaneX,
        CsrField::StatePlaneY,
        CsrField::Location,
        CsrField::FiscalYear,
    ];

    fn source_column(self) -> &'static str {
        match self {
            CsrField::ServiceRequestNumber => "Service Request (SR) Number",
            CsrField::Department => "Department",
            CsrField::GroupDescription => "Group Description",
            CsrField::SrDescription => "SR Description",
            CsrField::MethodReceived => "Method Received",
            CsrField::SrStatus => "SR Status",
            CsrField::IsDuplicate => "Is Duplicate? (1/0)",
            CsrField::StatusChangeDate => "Status Change Date",
            CsrField::CreatedDate => "Created Date",
            CsrField::OverdueOnDate => "Overdue On Date",
            CsrField::LastUpdateDate => "Last Update Date",
            CsrField::CloseDate => "Close Date",
            CsrField::SrAgeDays => "SR Age (days)",
            CsrField::ResponseDays => "Response Days",
            CsrField::OpenCount => "Open Count",
            CsrField::ClosedCount => "Closed Count",
            CsrField::OverdueCount => "Overdue Count",
            CsrField::ClosedOnTime => "Closed on Time",
            CsrField::ClosedLate => "Closed Late",
            CsrField::DaysLate => "# of Days Late",
            CsrField::SrLocation => "SR Location",
            CsrField::StatePlaneX => "State Plane X Coordinate",
            CsrField::StatePlaneY => "State Plane Y Coordinate",
            CsrField::Location => DerivedField::Location.column(),
            CsrField::FiscalYear => DerivedField::FiscalYear.column(),
        }
    }

    fn destination(self) -> &'static str {
        match self {
            CsrField::ServiceRequestNumber => "service_request_sr_number",
            CsrField::Department => "department",
            CsrField::GroupDescription => "group_description",
            CsrField::SrDescription => "sr_description",
            CsrField::MethodReceived => "method_received",
            CsrField::SrStatus => "sr_status",
            CsrField::IsDuplicate => "is_duplicate_1_0",
            CsrField::StatusChangeDate => "status_change_date",
            CsrField::CreatedDate => "created_date",
            CsrField::OverdueOnDate => "overdue_on_date",
            CsrField::LastUpdateDate => "last_update_date",
            CsrField::CloseDate => "close_date",
            CsrField::SrAgeDays => "sr_age_days",
            CsrField::ResponseDays => "response_days",
            CsrField::OpenCount => "open_count",
            CsrField::ClosedCount => "closed_count",
            CsrField::OverdueCount => "overdue_count",
            CsrField::ClosedOnTime => "closed_on_time",
            CsrField::ClosedLate => "closed_late",
            CsrField::DaysLate => "of_days_late",
            CsrField::SrLocation => "sr_location",
            CsrField::StatePlaneX => "state_plane_x_coordinate",
            CsrField::StatePlaneY => "state_plane_y_coordinate",
            CsrField::Location => "location",
            CsrField::FiscalYear => "fiscal_year",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            CsrField::IsDuplicate
                | CsrField::SrAgeDays
                | CsrField::ResponseDays
                | CsrField::OpenCount
                | CsrField::ClosedCount
                | CsrField::OverdueCount
                | CsrField::ClosedOnTime
                | CsrField::ClosedLate
                | CsrField::DaysLate
                | CsrField::StatePlaneX
                | CsrField::StatePlaneY
        )
    }
}

impl CsrField {
    /// Datetime columns normalized before mapping
    pub const TIMESTAMPS: &'static [CsrField] = &[
        CsrField::StatusChangeDate,
        CsrField::CreatedDate,
        CsrField::OverdueOnDate,
        CsrField::LastUpdateDate,
        CsrField::CloseDate,
    ];
}

// ============================================================================
// Finance partitions
// ============================================================================

/// Columns of a monthly department expense extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseField {
    FundId,
    FundName,
    UnitId,
    UnitName,
    ObjectId,
    ObjectName,
    ProgramId,
    ProgramName,
    ActivityId,
    ActivityName,
    ExpenseAmount,
    EncumbranceAmount,
    Year,
    Month,
    MonthName,
    Department,
    FiscalYear,
    FiscalMonth,
}

impl FieldSet for ExpenseField {
    const ALL: &'static [Self] = &[
        ExpenseField::FundId,
        ExpenseField::FundName,
        ExpenseField::UnitId,
        ExpenseField::UnitName,
        ExpenseField::ObjectId,
        ExpenseField::ObjectName,
        ExpenseField::ProgramId,
        ExpenseField::ProgramName,
        ExpenseField::ActivityId,
        ExpenseField::ActivityName,
        ExpenseField::ExpenseAmount,
        ExpenseField::EncumbranceAmount,
        ExpenseField::Year,
        ExpenseField::Month,
        ExpenseField::MonthName,
        ExpenseField::Department,
        ExpenseField::FiscalYear,
        ExpenseField::FiscalMonth,
    ];

    fn source_column(self) -> &'static str {
        match self {
            ExpenseField::FundId => "Fund ID",
            ExpenseField::FundName => "Fund Name",
            ExpenseField::UnitId => "Unit ID",
            ExpenseField::UnitName => "Unit Name",
            ExpenseField::ObjectId => "Object ID",
            ExpenseField::ObjectName => "Object Name",
            ExpenseField::ProgramId => "Program ID",
            ExpenseField::ProgramName => "Program Name",
            ExpenseField::ActivityId => "Activity ID",
            ExpenseField::ActivityName => "Activity Name",
            ExpenseField::ExpenseAmount => "Expense Amount",
            ExpenseField::EncumbranceAmount => "Encumbrance Amount",
            ExpenseField::Year => DerivedField::Year.column(),
            ExpenseField::Month => DerivedField::Month.column(),
            ExpenseField::MonthName => DerivedField::MonthName.column(),
            ExpenseField::Department => DerivedField::Department.column(),
            ExpenseField::FiscalYear => DerivedField::FiscalYear.column(),
            ExpenseField::FiscalMonth => DerivedField::FiscalMonth.column(),
        }
    }

    fn destination(self) -> &'static str {
        match self {
            ExpenseField::FundId => "fund_id",
            ExpenseField::FundName => "fund_name",
            ExpenseField::UnitId => "unit_id",
            ExpenseField::UnitName => "unit_name",
            ExpenseField::ObjectId => "object_id",
            ExpenseField::ObjectName => "object_name",
            ExpenseField::ProgramId => "program_id",
            ExpenseField::ProgramName => "program_name",
            ExpenseField::ActivityId => "activity_id",
            ExpenseField::ActivityName => "activity_name",
            ExpenseField::ExpenseAmount => "expense_amount",
            ExpenseField::EncumbranceAmount => "encumbrance_amount",
            other => other.source_column(),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            ExpenseField::ExpenseAmount | ExpenseField::EncumbranceAmount
        )
    }
}

/// Columns of a monthly department revenue extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueField {
    FundId,
    FundName,
    UnitId,
    UnitName,
    RevenueSourceId,
    RevenueSourceName,
    RevenueAmount,
    BudgetAmount,
    Year,
    Month,
    MonthName,
    Department,
    FiscalYear,
    FiscalMonth,
}

impl FieldSet for RevenueField {
    const ALL: &'static [Self] = &[
        RevenueField::FundId,
        RevenueField::FundName,
        RevenueField::UnitId,
        RevenueField::UnitName,
        RevenueField::RevenueSourceId,
        RevenueField::RevenueSourceName,
        RevenueField::RevenueAmount,
        RevenueField::BudgetAmount,
        RevenueField::Year,
        RevenueField::Month,
        RevenueField::MonthName,
        RevenueField::Department,
        RevenueField::FiscalYear,
        RevenueField::FiscalMonth,
    ];

    fn source_column(self) -> &'static str {
        match self {
            RevenueField::FundId => "Fund ID",
            RevenueField::FundName => "Fund Name",
            RevenueField::UnitId => "Unit ID",
            RevenueField::UnitName => "Unit Name",
            RevenueField::RevenueSourceId => "Revenue Source ID",
            RevenueField::RevenueSourceName => "Revenue Source Name",
            RevenueField::RevenueAmount => "Revenue Amount",
            RevenueField::BudgetAmount => "Budget Amount",
            RevenueField::Year => DerivedField::Year.column(),
            RevenueField::Month => DerivedField::Month.column(),
            RevenueField::MonthName => DerivedField::MonthName.column(),
            RevenueField::Department => DerivedField::Department.column(),
            RevenueField::FiscalYear => DerivedField::FiscalYear.column(),
            RevenueField::FiscalMonth => DerivedField::FiscalMonth.column(),
        }
    }

    fn destination(self) -> &'static str {
        match self {
            RevenueField::FundId => "fund_id",
            RevenueField::FundName => "fund_name",
            RevenueField::UnitId => "unit_id",
            RevenueField::UnitName => "unit_name",
            RevenueField::RevenueSourceId => "revenue_source_id",
            RevenueField::RevenueSourceName => "revenue_source_name",
            RevenueField::RevenueAmount => "revenue_amount",
            RevenueField::BudgetAmount => "budget_amount",
            other => other.source_column(),
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            RevenueField::RevenueAmount | RevenueField::BudgetAmount
        )
    }
}

// ============================================================================
// Profile selection
// ============================================================================

/// Which transform a registry job applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Service requests: reprojection, five timestamps, fiscal year
    Csr,
    /// Monthly expense partitions
    Expenses,
    /// Monthly revenue partitions
    Revenue,
    /// Every column kept under its own name
    Passthrough,
    /// Report columns kept, fiscal fields from the as-of date
    Report,
}

impl ProfileKind {
    /// Profile name
    pub fn name(self) -> &'static str {
        match self {
            ProfileKind::Csr => "csr",
            ProfileKind::Expenses => "expenses",
            ProfileKind::Revenue => "revenue",
            ProfileKind::Passthrough => "passthrough",
            ProfileKind::Report => "report",
        }
    }

    /// Build the profile for an extract
    ///
    /// Fixed profiles ignore the table; passthrough and report profiles
    /// take their allow-list from its columns.
    pub fn build(self, raw: &RawTable) -> Result<TransformProfile> {
        let profile = match self {
            ProfileKind::Csr => TransformProfile::mapping_only(
                self.name(),
                FieldMapping::for_fields::<CsrField>()?,
            )
            .with_spatial(SpatialColumns::new(
                CsrField::StatePlaneX.source_column(),
                CsrField::StatePlaneY.source_column(),
            ))
            .with_timestamps(CsrField::TIMESTAMPS.iter().map(|f| f.source_column()))
            .with_fiscal(FiscalSource::Column(
                CsrField::CreatedDate.source_column().to_string(),
            )),
            ProfileKind::Expenses => TransformProfile::mapping_only(
                self.name(),
                FieldMapping::for_fields::<ExpenseField>()?,
            )
            .with_fiscal(FiscalSource::Context),
            ProfileKind::Revenue => TransformProfile::mapping_only(
                self.name(),
                FieldMapping::for_fields::<RevenueField>()?,
            )
            .with_fiscal(FiscalSource::Context),
            ProfileKind::Passthrough => {
                TransformProfile::mapping_only(self.name(), FieldMapping::identity(raw.columns())?)
                    .with_derived_fields([])
            }
            ProfileKind::Report => {
                let fiscal = [DerivedField::FiscalYear, DerivedField::FiscalMonth];
                let mut mapping = FieldMapping::identity(raw.columns())?;
                for field in fiscal {
                    if mapping.destination_of(field.column()).is_none() {
                        mapping.push(field.column(), field.column())?;
                    }
                }
                TransformProfile::mapping_only(self.name(), mapping)
                    .with_fiscal(FiscalSource::Context)
                    .with_derived_fields(fiscal)
            }
        };
        Ok(profile)
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
