//! Fiscal calendar derivation
//!
//! The fiscal year starts in October: October 2022 is month 1 of fiscal
//! year 2023, September 2023 is month 12 of the same fiscal year.

use chrono::{Datelike, Month, NaiveDate};

/// First calendar month of a fiscal year
pub const FISCAL_YEAR_START_MONTH: u32 = 10;

/// A calendar (year, month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarPeriod {
    year: i32,
    month: u32,
}

impl CalendarPeriod {
    /// Create a period; `None` unless `month` is in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Period containing a date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-based
    pub fn month(&self) -> u32 {
        self.month
    }

    /// English month name ("January")
    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("", |m| m.name())
    }

    /// Fiscal period this calendar month falls in
    pub fn fiscal(&self) -> FiscalPeriod {
        FiscalPeriod::from_calendar(self.year, self.month)
    }
}

/// A derived (fiscal_year, fiscal_month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalPeriod {
    /// Fiscal year
    pub fiscal_year: i32,
    /// Fiscal month in 1..=12
    pub fiscal_month: u32,
}

impl FiscalPeriod {
    /// Derive the fiscal period for a calendar year and month
    pub fn from_calendar(year: i32, month: u32) -> Self {
        Self {
            fiscal_year: fiscal_year(year, month),
            fiscal_month: fiscal_month(month),
        }
    }
}

/// Fiscal year of a calendar month
pub fn fiscal_year(year: i32, month: u32) -> i32 {
    if month >= FISCAL_YEAR_START_MONTH {
        year + 1
    } else {
        year
    }
}

/// Fiscal month of a calendar month
pub fn fiscal_month(month: u32) -> u32 {
    if month >= FISCAL_YEAR_START_MONTH {
        month - 9
    } else {
        month + 3
    }
}
