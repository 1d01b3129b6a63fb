//! Record model
//!
//! Row-oriented tables as they come out of a source, and the canonical
//! records the transform hands to a loader.
//!
//! # Overview
//!
//! - [`RawTable`] stores its column names once; every row holds exactly one
//!   value per column, so two rows can never disagree about their keys.
//! - [`RowView`] borrows a single row for by-name access.
//! - [`CanonicalRecord`] keeps destination fields in mapping order.

mod canonical;
mod raw;

pub use canonical::{CanonicalRecord, CanonicalValue, WktPoint, TIMESTAMP_FORMAT};
pub use raw::{RawRecord, RawTable, RawValue, RowView};
