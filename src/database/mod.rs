//! Database source support via DuckDB
//!
//! DuckDB is the query engine. The configured replica (PostgreSQL, MySQL,
//! SQLite or a DuckDB file) is attached read-only as `source_db`.

mod engine;

pub use engine::DatabaseEngine;
