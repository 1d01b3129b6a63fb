//! SQL extraction from the relational read-replica

use super::types::{Extract, Extractor};
use crate::config::DatabaseConfig;
use crate::database::DatabaseEngine;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Built-in right-of-way permit queries, in DuckDB SQL against `source_db`
///
/// Day buckets round to the nearest calendar day, so noon and later fall
/// into the following day. Output names are upper case like the replica's
/// native driver reports them.
pub const BUILTIN_QUERIES: &[(&str, &str)] = &[
    (
        "applications_received",
        r#"SELECT
    foldertype AS "FOLDERTYPE",
    subcode AS "SUBCODE",
    strftime(date_trunc('day', indate + INTERVAL 12 HOUR), '%Y-%m-%d') AS "INDATE_DAY",
    COUNT(1) AS "ISSUEDROWPERMITS"
FROM source_db.folder
WHERE (foldertype IN ('DS')
    AND statuscode NOT IN (50005, 50003, 70045)
    AND indate >= TIMESTAMP '2018-10-01 00:00:00'
    AND indate IS NOT NULL)
    OR (foldertype IN ('RW', 'EX')
    AND statuscode NOT IN (70045, 50003)
    AND indate >= TIMESTAMP '2018-10-01 00:00:00'
    AND subcode NOT IN (50510)
    AND indate IS NOT NULL)
GROUP BY 1, 2, 3
ORDER BY 1, 3, 2"#,
    ),
    (
        "active_permits",
        r#"SELECT
    foldertype AS "FOLDERTYPE",
    COUNT(1) AS "ACTIVEPERMITS"
FROM source_db.folder
WHERE (foldertype IN ('EX', 'DS')
    AND statuscode IN (50010))
    OR (foldertype IN ('RW')
    AND statuscode IN (50010)
    AND foldername NOT LIKE 'LA-%')
GROUP BY 1
ORDER BY 1"#,
    ),
    (
        "issued_permits",
        r#"SELECT
    foldertype AS "FOLDERTYPE",
    subcode AS "SUBCODE",
    strftime(date_trunc('day', issuedate + INTERVAL 12 HOUR), '%Y-%m-%d') AS "ISSUEDATE_DAY",
    COUNT(1) AS "ISSUEDROWPERMITS"
FROM source_db.folder
WHERE (foldertype IN ('EX', 'DS')
    AND issuedate >= TIMESTAMP '2018-10-01 00:00:00'
    AND issuedate IS NOT NULL)
    OR (foldertype IN ('RW')
    AND issuedate >= TIMESTAMP '2018-10-01 00:00:00'
    AND subcode NOT IN (50510)
    AND issuedate IS NOT NULL)
GROUP BY 1, 2, 3
ORDER BY 1, 3, 2"#,
    ),
];

/// Look up a built-in query by name
pub fn builtin_query(name: &str) -> Option<&'static str> {
    BUILTIN_QUERIES
        .iter()
        .find(|(query, _)| *query == name)
        .map(|(_, sql)| *sql)
}

/// Runs one named query and binds rows to its output column names
pub struct SqlExtractor {
    name: String,
    sql: String,
    // DuckDB connections are not Sync
    engine: Mutex<DatabaseEngine>,
}

impl SqlExtractor {
    /// Wrap an already-open engine
    pub fn new(name: impl Into<String>, sql: impl Into<String>, engine: DatabaseEngine) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            engine: Mutex::new(engine),
        }
    }

    /// Open the configured replica
    pub fn connect(
        name: impl Into<String>,
        sql: impl Into<String>,
        config: &DatabaseConfig,
    ) -> Result<Self> {
        let name = name.into();
        let engine = DatabaseEngine::new(config).map_err(|e| e.into_source_unavailable(&name))?;
        Ok(Self::new(name, sql, engine))
    }
}

impl std::fmt::Debug for SqlExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExtractor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Extractor for SqlExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self) -> Result<Vec<Extract>> {
        info!("Executing query: {}", self.name);

        let table = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| Error::database("database engine lock poisoned"))
                .map_err(|e| e.into_source_unavailable(&self.name))?;
            engine
                .query_table(&self.sql)
                .map_err(|e| e.into_source_unavailable(&self.name))?
        };

        info!("Extracted {} rows from '{}'", table.len(), self.name);
        Ok(vec![Extract::new(table)])
    }
}
