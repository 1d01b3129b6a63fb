//! DuckDB-based database query engine
//!
//! Provides unified access to PostgreSQL, MySQL, SQLite and DuckDB files via
//! DuckDB extensions. The source database is attached read-only as
//! `source_db`, so every registry query addresses its tables through that
//! catalog name.

use crate::config::{mask_url, DatabaseConfig, DatabaseKind};
use crate::error::{Error, Result};
use crate::record::{RawTable, RawValue};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;
use tracing::debug;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Database query engine using DuckDB
pub struct DatabaseEngine {
    /// DuckDB connection
    conn: Connection,
    /// Database type
    kind: DatabaseKind,
    /// Connection string used (for logging)
    connection_string: String,
}

impl DatabaseEngine {
    /// Open DuckDB and attach the configured database
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::database(format!("Failed to create DuckDB connection: {e}")))?;

        let engine = Self {
            conn,
            kind: config.engine,
            connection_string: config.connection_string(),
        };

        engine.attach_database()?;
        debug!("Attached {:?} database {}", engine.kind, engine.connection_info());

        Ok(engine)
    }

    /// An engine over an empty in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig::in_memory())
    }

    /// Attach external database to DuckDB
    fn attach_database(&self) -> Result<()> {
        let (extension, attach_type) = match self.kind {
            DatabaseKind::Postgres => (Some("postgres"), Some("POSTGRES")),
            DatabaseKind::Mysql => (Some("mysql"), Some("MYSQL")),
            DatabaseKind::Sqlite => (Some("sqlite"), Some("SQLITE")),
            DatabaseKind::Duckdb => (None, None),
        };

        if let Some(extension) = extension {
            self.conn
                .execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
                .map_err(|e| {
                    Error::database(format!("Failed to load {extension} extension: {e}"))
                })?;
        }

        // An in-memory DuckDB source is the engine's own catalog
        if self.kind == DatabaseKind::Duckdb && self.connection_string == ":memory:" {
            return self
                .conn
                .execute_batch("ATTACH ':memory:' AS source_db;")
                .map_err(|e| Error::database(format!("Failed to attach DuckDB: {e}")));
        }

        let attach_sql = match attach_type {
            Some(kind) => format!(
                "ATTACH '{}' AS source_db (TYPE {kind}, READ_ONLY);",
                self.connection_string
            ),
            None => format!("ATTACH '{}' AS source_db (READ_ONLY);", self.connection_string),
        };

        self.conn.execute_batch(&attach_sql).map_err(|e| {
            Error::database(format!(
                "Failed to attach {}: {e}",
                self.connection_info()
            ))
        })
    }

    /// Test database connection
    pub fn check_connection(&self) -> Result<()> {
        let query = match self.kind {
            DatabaseKind::Postgres => "SELECT 1 FROM source_db.pg_catalog.pg_tables LIMIT 1",
            DatabaseKind::Mysql => "SELECT 1 FROM source_db.information_schema.tables LIMIT 1",
            DatabaseKind::Sqlite => "SELECT 1 FROM source_db.sqlite_master LIMIT 1",
            DatabaseKind::Duckdb => "SELECT 1",
        };

        self.conn
            .execute(query, [])
            .map_err(|e| Error::database(format!("Connection check failed: {e}")))?;

        Ok(())
    }

    /// Run statements that return no rows (setup, fixtures)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::database(format!("Statement failed: {e}")))
    }

    /// Run a query and bind each row to the statement's column names
    pub fn query_table(&self, sql: &str) -> Result<RawTable> {
        debug!("Executing query: {}", sql);

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::database(format!("Failed to prepare query: {e}")))?;

        let mut rows = stmt
            .query([])
            .map_err(|e| Error::database(format!("Query failed: {e}")))?;

        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();
        let width = columns.len();
        let mut table = RawTable::new(columns);

        while let Some(row) = rows
            .next()
            .map_err(|e| Error::database(format!("Failed to read row: {e}")))?
        {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                let value: Value = row
                    .get(index)
                    .map_err(|e| Error::database(format!("Failed to read column {index}: {e}")))?;
                values.push(raw_value(value));
            }
            table.push_row(values)?;
        }

        Ok(table)
    }

    /// Get database type
    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    /// Get connection string (for logging - password masked)
    pub fn connection_info(&self) -> String {
        mask_url(&self.connection_string)
    }
}

impl std::fmt::Debug for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseEngine")
            .field("kind", &self.kind)
            .field("connection", &self.connection_info())
            .finish_non_exhaustive()
    }
}

/// Convert a DuckDB value into an untyped cell
///
/// Temporal values become text the timestamp normalizer understands.
fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Boolean(b) => RawValue::Integer(i64::from(b)),
        Value::TinyInt(i) => RawValue::Integer(i.into()),
        Value::SmallInt(i) => RawValue::Integer(i.into()),
        Value::Int(i) => RawValue::Integer(i.into()),
        Value::BigInt(i) => RawValue::Integer(i),
        Value::UTinyInt(i) => RawValue::Integer(i.into()),
        Value::USmallInt(i) => RawValue::Integer(i.into()),
        Value::UInt(i) => RawValue::Integer(i.into()),
        Value::UBigInt(i) => {
            i64::try_from(i).map_or_else(|_| RawValue::Text(i.to_string()), RawValue::Integer)
        }
        Value::HugeInt(i) => {
            i64::try_from(i).map_or_else(|_| RawValue::Text(i.to_string()), RawValue::Integer)
        }
        Value::Float(f) => RawValue::Float(f64::from(f)),
        Value::Double(f) => RawValue::Float(f),
        Value::Decimal(d) => RawValue::Text(d.to_string()),
        Value::Text(s) => RawValue::Text(s),
        Value::Timestamp(unit, t) => {
            let micros = to_micros(unit, t);
            DateTime::from_timestamp_micros(micros).map_or_else(
                || RawValue::Integer(t),
                |dt| RawValue::Text(dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            )
        }
        Value::Date32(d) => NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_CE_DAYS)
            .map_or_else(
                || RawValue::Integer(d.into()),
                |date| RawValue::Text(date.format("%Y-%m-%d").to_string()),
            ),
        Value::Time64(unit, t) => {
            let micros = to_micros(unit, t);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(0);
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).map_or_else(
                || RawValue::Integer(t),
                |time| RawValue::Text(time.format("%H:%M:%S").to_string()),
            )
        }
        other => RawValue::Text(format!("{other:?}")),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
