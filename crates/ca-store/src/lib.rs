//! # ca-store — The "Archive" of CrashArchive
//!
//! SQLite-backed [`ReportStore`]. One connection, guarded by a mutex; every
//! statement runs on the tokio blocking pool so async callers never stall a
//! worker thread.
//!
//! Schema (`crash_reports`):
//!
//! | Column        | Type    | Notes                              |
//! |---------------|---------|------------------------------------|
//! | `id`          | INTEGER | primary key, assigned on insert    |
//! | `version`     | TEXT    |                                    |
//! | `build`       | INTEGER |                                    |
//! | `plugin`      | TEXT    | empty when no plugin is blamed     |
//! | `involvement` | TEXT    | `none` / `direct` / `indirect`     |
//! | `type`        | TEXT    | error type                         |
//! | `message`     | TEXT    |                                    |
//! | `file`, `line`| TEXT, INTEGER | crash site                   |
//! | `duplicate`   | BOOLEAN |                                    |
//! | `resolved`    | BOOLEAN |                                    |

pub mod error;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use ca_core::{CompiledPredicate, Involvement, Param, ReportStore, ReportSummary, StoreFailure};

pub use error::{StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS crash_reports (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    version     TEXT    NOT NULL,
    build       INTEGER NOT NULL,
    plugin      TEXT    NOT NULL DEFAULT '',
    involvement TEXT    NOT NULL,
    type        TEXT    NOT NULL,
    message     TEXT    NOT NULL,
    file        TEXT    NOT NULL DEFAULT '',
    line        INTEGER NOT NULL DEFAULT 0,
    duplicate   BOOLEAN NOT NULL DEFAULT 0,
    resolved    BOOLEAN NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_crash_reports_version ON crash_reports(version);
CREATE INDEX IF NOT EXISTS idx_crash_reports_plugin ON crash_reports(plugin);
CREATE INDEX IF NOT EXISTS idx_crash_reports_site ON crash_reports(message, file, line);
"#;

/// A report as submitted, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub version: String,
    pub build: u64,
    #[serde(default)]
    pub plugin: String,
    pub involvement: Involvement,
    pub error_type: String,
    pub message: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub duplicate: bool,
    #[serde(default)]
    pub resolved: bool,
}

/// The crash site used to group similar reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrashSite {
    pub message: String,
    pub file: String,
    pub line: u32,
}

/// SQLite report store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("crash_reports schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }

    /// Insert many reports in one transaction. Returns their ids in order.
    ///
    /// Nothing is written if any report fails, including a build number
    /// above `i64::MAX` ([`StoreError::OutOfRange`]).
    pub async fn insert_all(&self, reports: Vec<NewReport>) -> StoreResult<Vec<u64>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let ids = reports
                .iter()
                .map(|r| insert_report(&tx, r))
                .collect::<StoreResult<Vec<_>>>()?;
            tx.commit()?;
            Ok(ids)
        })
        .await
    }

    /// Distinct version strings, unordered.
    pub async fn known_versions(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT version FROM crash_reports")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut versions = Vec::new();
            for row in rows {
                versions.push(row?);
            }
            Ok(versions)
        })
        .await
    }

    /// Crash site of report `id`, or `None` if it does not exist.
    pub async fn crash_site(&self, id: u64) -> StoreResult<Option<CrashSite>> {
        let id = checked_sql_int("id", id)?;
        self.with_conn(move |conn| {
            let site = conn
                .query_row(
                    "SELECT message, file, line FROM crash_reports WHERE id = ?",
                    params![id],
                    |row| {
                        Ok(CrashSite {
                            message: row.get(0)?,
                            file: row.get(1)?,
                            line: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(site)
        })
        .await
    }

    async fn count_matching(&self, predicate: &CompiledPredicate) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM crash_reports {}", predicate.where_clause());
        let values = bind_values(predicate);
        tracing::debug!("count: {}", sql);
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn select_matching(
        &self,
        predicate: &CompiledPredicate,
        offset: u64,
        limit: u64,
    ) -> StoreResult<Vec<ReportSummary>> {
        let sql = format!(
            "SELECT id, version, plugin, message, resolved FROM crash_reports {} \
             ORDER BY id DESC LIMIT ? OFFSET ?",
            predicate.where_clause()
        );
        let mut values = bind_values(predicate);
        values.push(Value::Integer(clamp_sql_int(limit)));
        values.push(Value::Integer(clamp_sql_int(offset)));
        tracing::debug!("select: {}", sql);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                let id: i64 = row.get(0)?;
                Ok(ReportSummary {
                    id: u64::try_from(id).unwrap_or(0),
                    version: row.get(1)?,
                    plugin: row.get(2)?,
                    message: row.get(3)?,
                    resolved: row.get(4)?,
                })
            })?;
            let mut reports = Vec::new();
            for row in rows {
                reports.push(row?);
            }
            Ok(reports)
        })
        .await
    }
}

#[async_trait::async_trait]
impl ReportStore for SqliteStore {
    async fn count(&self, predicate: &CompiledPredicate) -> Result<u64, StoreFailure> {
        Ok(self.count_matching(predicate).await?)
    }

    async fn select_page(
        &self,
        predicate: &CompiledPredicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ReportSummary>, StoreFailure> {
        Ok(self.select_matching(predicate, offset, limit).await?)
    }
}

fn insert_report(conn: &Connection, report: &NewReport) -> StoreResult<u64> {
    conn.execute(
        "INSERT INTO crash_reports \
         (version, build, plugin, involvement, type, message, file, line, duplicate, resolved) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            report.version,
            checked_sql_int("build", report.build)?,
            report.plugin,
            report.involvement.code(),
            report.error_type,
            report.message,
            report.file,
            report.line,
            report.duplicate,
            report.resolved,
        ],
    )?;
    Ok(u64::try_from(conn.last_insert_rowid()).unwrap_or(0))
}

/// Map predicate params to SQLite values.
///
/// SQLite integers are signed 64-bit. A u64 above `i64::MAX` is bound as a
/// REAL; SQLite compares INTEGER and REAL numerically, so it still orders
/// above every stored integer and equals none of them.
fn bind_values(predicate: &CompiledPredicate) -> Vec<Value> {
    predicate
        .params()
        .iter()
        .map(|p| match p {
            Param::UInt(v) => match i64::try_from(*v) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Real(*v as f64),
            },
            Param::Text(s) => Value::Text(s.clone()),
        })
        .collect()
}

fn checked_sql_int(field: &'static str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange { field, value })
}

/// Saturating conversion, only for LIMIT and OFFSET.
fn clamp_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
