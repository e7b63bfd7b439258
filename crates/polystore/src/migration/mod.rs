//! Snapshot export, transactional import, and provider-to-provider migration.
//!
//! Every entry point opens its own adapter and closes it before returning,
//! whatever the outcome. The `*_from`/`*_into` variants take an already
//! open adapter for callers that manage the connection themselves.

mod init;
mod snapshot;

pub use init::{initialize_schema, DdlOutcome, InitReport, StepReport};
pub use snapshot::{ImportMode, Snapshot, SNAPSHOT_VERSION};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{self, Family, IdentityReset, DELETE_ORDER, INSERT_ORDER};
use crate::config::{self, DatabaseConfig};
use crate::core::{Adapter, Row, SqlValue};
use crate::drivers;
use crate::error::{Result, StoreError};

/// Rows written to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub inserted: u64,
    /// Empty rows that were skipped.
    pub skipped: u64,
}

/// Result of an import, tables in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub tables: Vec<TableCount>,
}

impl ImportReport {
    /// Rows inserted into `table`, if it was part of the import.
    pub fn inserted(&self, table: &str) -> Option<u64> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.inserted)
    }

    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }
}

/// Result of [`migrate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub exported_at: DateTime<Utc>,
    pub source: String,
    pub import: ImportReport,
}

/// Close an adapter, logging instead of failing.
async fn close_quietly<A>(adapter: &mut A)
where
    A: Adapter + ?Sized,
{
    if let Err(e) = adapter.close().await {
        warn!("Failed to close {} adapter: {}", adapter.provider(), e);
    }
}

/// Export every table of the configured database.
pub async fn export_snapshot(config: &DatabaseConfig) -> Result<Snapshot> {
    let mut adapter = drivers::open(config).await?;
    let snapshot = export_from(&mut adapter, &config.describe()).await;
    close_quietly(&mut adapter).await;
    Ok(snapshot)
}

/// Export every table through an open adapter.
///
/// Tables are read one at a time in parent-first order. A table that cannot
/// be read (for example, it does not exist yet) is exported empty.
pub async fn export_from<A>(adapter: &mut A, source: &str) -> Snapshot
where
    A: Adapter + ?Sized,
{
    let mut snapshot = Snapshot::empty(source);

    for table in INSERT_ORDER {
        let sql = format!("SELECT * FROM {} ORDER BY id", table);
        let rows = match adapter.all(&sql, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not read {}, exporting it empty: {}", table, e);
                Vec::new()
            }
        };
        debug!("Exported {} row(s) from {}", rows.len(), table);
        snapshot.tables.insert(table.to_string(), rows);
    }

    info!(
        "Exported {} row(s) from {}",
        snapshot.row_count(),
        snapshot.source
    );
    snapshot
}

/// Import a snapshot into the configured database.
///
/// The snapshot is validated before any connection is opened. The schema is
/// initialized, then the whole load runs in one transaction.
pub async fn import_snapshot(
    config: &DatabaseConfig,
    snapshot: &Snapshot,
    mode: ImportMode,
) -> Result<ImportReport> {
    snapshot.validate()?;

    let mut adapter = drivers::open(config).await?;
    let result = async {
        initialize_schema(&mut adapter).await?;
        import_into(&mut adapter, snapshot, mode).await
    }
    .await;
    close_quietly(&mut adapter).await;
    result
}

/// Import a snapshot through an open adapter whose schema already exists.
///
/// On any failure inside the transaction the transaction is rolled back and
/// a `Transaction` error naming the failing table is returned.
pub async fn import_into<A>(
    adapter: &mut A,
    snapshot: &Snapshot,
    mode: ImportMode,
) -> Result<ImportReport>
where
    A: Adapter + ?Sized,
{
    snapshot.validate()?;
    let family = adapter.provider().family();

    adapter.begin().await?;
    let tables = match load(adapter, family, snapshot, mode).await {
        Ok(tables) => tables,
        Err(e) => {
            rollback_quietly(adapter).await;
            return Err(e);
        }
    };
    if let Err(e) = adapter.commit().await {
        rollback_quietly(adapter).await;
        return Err(StoreError::transaction("commit", e));
    }

    // DDL would have committed the transaction early on this family.
    if mode == ImportMode::Replace && family.ddl_commits_transaction() {
        for table in INSERT_ORDER {
            if let Err(e) = reset_identity(adapter, family, table).await {
                warn!("Identity reset for {} failed after commit: {}", table, e);
            }
        }
    }

    let report = ImportReport { mode, tables };
    info!(
        "Imported {} row(s) into {} ({} mode)",
        report.total_inserted(),
        adapter.provider(),
        mode
    );
    Ok(report)
}

async fn rollback_quietly<A>(adapter: &mut A)
where
    A: Adapter + ?Sized,
{
    if let Err(e) = adapter.rollback().await {
        warn!("Rollback failed: {}", e);
    }
}

/// Statements that run inside the import transaction.
async fn load<A>(
    adapter: &mut A,
    family: Family,
    snapshot: &Snapshot,
    mode: ImportMode,
) -> Result<Vec<TableCount>>
where
    A: Adapter + ?Sized,
{
    if mode == ImportMode::Replace {
        for table in DELETE_ORDER {
            adapter
                .run(&format!("DELETE FROM {}", table), &[])
                .await
                .map_err(|e| StoreError::transaction(table, e))?;
        }
    }

    let mut counts = Vec::with_capacity(INSERT_ORDER.len());
    for table in INSERT_ORDER {
        let mut count = TableCount {
            table: table.to_string(),
            inserted: 0,
            skipped: 0,
        };

        for row in snapshot.rows(table) {
            if row.is_empty() {
                warn!("Skipping row with no fields in {}", table);
                count.skipped += 1;
                continue;
            }
            let (sql, params) = insert_statement(family, table, row);
            adapter
                .run(&sql, &params)
                .await
                .map_err(|e| StoreError::transaction(table, e))?;
            count.inserted += 1;
        }

        if mode == ImportMode::Replace && !family.ddl_commits_transaction() {
            reset_identity(adapter, family, table)
                .await
                .map_err(|e| StoreError::transaction(table, e))?;
        }

        debug!("Loaded {} row(s) into {}", count.inserted, table);
        counts.push(count);
    }

    Ok(counts)
}

/// INSERT with exactly the row's own columns, quoted for `family`.
fn insert_statement(family: Family, table: &str, row: &Row) -> (String, Vec<SqlValue>) {
    let columns: Vec<String> = row.keys().map(|c| family.quote_ident(c)).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );
    (sql, row.values().cloned().collect())
}

/// Point the table's identity counter one past its largest id.
async fn reset_identity<A>(adapter: &mut A, family: Family, table: &str) -> Result<()>
where
    A: Adapter + ?Sized,
{
    if family == Family::Sqlite {
        return Ok(());
    }

    let max_id = adapter
        .get(&catalog::max_id_query(table), &[])
        .await?
        .and_then(|row| row.get("max_id").and_then(SqlValue::as_i64))
        .unwrap_or(0);

    match catalog::identity_reset(family, table, max_id + 1) {
        IdentityReset::NotNeeded => {}
        IdentityReset::Query { sql, params } => {
            adapter.all(&sql, &params).await?;
        }
        IdentityReset::Ddl(sql) => adapter.exec(&sql).await?,
    }
    debug!("Identity of {} reset to {}", table, max_id + 1);
    Ok(())
}

/// Copy every table from one configured database to another.
pub async fn migrate(
    source: &DatabaseConfig,
    target: &DatabaseConfig,
    mode: ImportMode,
) -> Result<MigrationReport> {
    config::validate_distinct(source, target)?;
    config::validate(target)?;

    info!(
        "Migrating {} -> {} ({} mode)",
        source.describe(),
        target.describe(),
        mode
    );

    let snapshot = export_snapshot(source).await?;
    let import = import_snapshot(target, &snapshot, mode).await?;

    Ok(MigrationReport {
        exported_at: snapshot.exported_at,
        source: snapshot.source,
        import,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_statement_uses_row_columns_only() {
        let row: Row = [
            ("name".to_string(), SqlValue::Text("Acme".into())),
            ("id".to_string(), SqlValue::Int(3)),
        ]
        .into_iter()
        .collect();

        let (sql, params) = insert_statement(Family::Postgres, "clients", &row);
        assert_eq!(sql, "INSERT INTO clients (\"id\", \"name\") VALUES (?, ?)");
        assert_eq!(params, vec![SqlValue::Int(3), SqlValue::Text("Acme".into())]);

        let (sql, _) = insert_statement(Family::Mysql, "clients", &row);
        assert_eq!(sql, "INSERT INTO clients (`id`, `name`) VALUES (?, ?)");
    }

    #[test]
    fn test_import_report_totals() {
        let report = ImportReport {
            mode: ImportMode::Append,
            tables: vec![
                TableCount {
                    table: "clients".into(),
                    inserted: 2,
                    skipped: 1,
                },
                TableCount {
                    table: "invoices".into(),
                    inserted: 3,
                    skipped: 0,
                },
            ],
        };
        assert_eq!(report.total_inserted(), 5);
        assert_eq!(report.inserted("invoices"), Some(3));
        assert_eq!(report.inserted("receipts"), None);
    }
}
