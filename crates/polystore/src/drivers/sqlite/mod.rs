//! SQLite driver using sqlx.
//!
//! One `SqliteConnection` per adapter, opened in WAL mode with foreign keys
//! enforced. The database file and its directory are created on demand.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteRow,
};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Connection, Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::{Provider, SqliteSettings};
use crate::core::statement::leading_keyword;
use crate::core::{Adapter, Row, RunResult, SqlValue};
use crate::error::{Result, StoreError};

/// SQLite adapter.
pub struct SqliteAdapter {
    conn: Option<SqliteConnection>,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl SqliteAdapter {
    /// Open the database file, creating it and its directory if missing.
    pub async fn connect(settings: &SqliteSettings) -> Result<Self> {
        let path = Path::new(&settings.file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::connection(Provider::Sqlite.as_str(), e))?;
            }
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .disable_statement_logging()
            .connect()
            .await
            .map_err(|e| StoreError::connection(Provider::Sqlite.as_str(), e))?;

        info!("Opened SQLite database at {}", settings.file_path);

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::connection(Provider::Sqlite.as_str(), "adapter is closed"))
    }
}

fn bind_params<'q>(
    sql: &'q str,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(sql), |query, param| match param {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.as_str()),
    })
}

/// Convert a row by the storage class of each value.
fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => SqlValue::Int(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                    SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        out.insert(sqlx::Column::name(column).to_string(), value);
    }
    Ok(out)
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn provider(&self) -> Provider {
        Provider::Sqlite
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        let is_insert = leading_keyword(sql) == "INSERT";
        let conn = self.conn()?;
        let result = bind_params(sql, params).execute(&mut *conn).await?;

        Ok(RunResult {
            inserted_id: is_insert.then(|| result.last_insert_rowid()),
            changes: result.rows_affected(),
        })
    }

    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let rows = bind_params(sql, params).fetch_all(&mut *conn).await?;
        rows.iter().map(convert_row).collect()
    }

    async fn exec(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn()?;
        // sqlite runs every statement of a multi-statement text
        sqlx::query(sql).execute(&mut *conn).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("Closed SQLite connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_temp(dir: &tempfile::TempDir) -> SqliteAdapter {
        let settings = SqliteSettings {
            file_path: dir
                .path()
                .join("nested/dir/test.db")
                .to_string_lossy()
                .into_owned(),
        };
        SqliteAdapter::connect(&settings).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_creates_directory_and_uses_wal() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        assert!(dir.path().join("nested/dir/test.db").exists());

        let row = adapter.get("PRAGMA journal_mode", &[]).await.unwrap().unwrap();
        assert_eq!(row.get("journal_mode"), Some(&SqlValue::Text("wal".into())));

        let row = adapter.get("PRAGMA foreign_keys", &[]).await.unwrap().unwrap();
        assert_eq!(row.get("foreign_keys"), Some(&SqlValue::Int(1)));
        adapter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_inserted_id_and_changes() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        adapter
            .exec("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, price REAL)")
            .await
            .unwrap();

        let first = adapter
            .run("INSERT INTO t (name, price) VALUES (?, ?)", &["a".into(), 1.5.into()])
            .await
            .unwrap();
        assert_eq!(first, RunResult { inserted_id: Some(1), changes: 1 });

        adapter
            .run("INSERT INTO t (name, price) VALUES (?, ?)", &["b".into(), SqlValue::Null])
            .await
            .unwrap();

        let updated = adapter
            .run("UPDATE t SET price = ?", &[2.0.into()])
            .await
            .unwrap();
        assert_eq!(updated, RunResult { inserted_id: None, changes: 2 });

        let rows = adapter.all("SELECT * FROM t ORDER BY id", &[]).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name"), Some(&SqlValue::Text("b".into())));
        assert_eq!(rows[1].get("price"), Some(&SqlValue::Float(2.0)));
        adapter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_on_empty_result_is_none() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        adapter.exec("CREATE TABLE t (id INTEGER)").await.unwrap();
        assert!(adapter.get("SELECT * FROM t", &[]).await.unwrap().is_none());
        adapter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        adapter.exec("CREATE TABLE t (id INTEGER)").await.unwrap();

        adapter.begin().await.unwrap();
        adapter.run("INSERT INTO t (id) VALUES (?)", &[SqlValue::Int(7)]).await.unwrap();
        adapter.rollback().await.unwrap();

        assert!(adapter.all("SELECT id FROM t", &[]).await.unwrap().is_empty());
        adapter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_exec_runs_every_statement() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        adapter
            .exec("CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER); INSERT INTO b (id) VALUES (3);")
            .await
            .unwrap();

        assert!(adapter.all("SELECT id FROM a", &[]).await.unwrap().is_empty());
        let row = adapter.get("SELECT id FROM b", &[]).await.unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&SqlValue::Int(3)));
        adapter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let dir = tempdir().unwrap();
        let mut adapter = open_temp(&dir).await;
        adapter.close().await.unwrap();
        adapter.close().await.unwrap();

        let err = adapter.exec("SELECT 1").await.unwrap_err();
        assert!(matches!(err, StoreError::Connection { .. }));
    }
}
