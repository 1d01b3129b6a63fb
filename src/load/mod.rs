//! Load module
//!
//! Writes transformed record sets to their destinations.
//!
//! # Destinations
//!
//! - **Object storage**: one CSV or Parquet artifact per source
//! - **Catalog**: JSON upsert (`POST`) or full replace (`PUT`) of a dataset

mod catalog;
mod object;
mod types;

pub use catalog::{CatalogLoader, APP_TOKEN_HEADER};
pub use object::ObjectStoreLoader;
pub use types::{Destination, LoadResult, Loader};
