//! Idempotent schema initialization.
//!
//! Tables are created with `IF NOT EXISTS` and must all succeed. Indexes and
//! additive columns are best-effort: a failure on the per-family allow-list
//! means the object is already there and is reported, not raised.

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{self, Family};
use crate::core::{Adapter, SqlValue};
use crate::error::Result;

/// Outcome of one best-effort DDL step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlOutcome {
    Applied,
    AlreadyPresent,
}

/// One index or column step and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub outcome: DdlOutcome,
}

/// Result of [`initialize_schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub tables: usize,
    pub indexes: Vec<StepReport>,
    pub columns: Vec<StepReport>,
}

impl InitReport {
    /// Number of steps that changed the schema.
    pub fn applied(&self) -> usize {
        self.indexes
            .iter()
            .chain(&self.columns)
            .filter(|s| s.outcome == DdlOutcome::Applied)
            .count()
    }
}

/// Create tables, additive columns and indexes for the adapter's provider.
///
/// Safe to run any number of times.
pub async fn initialize_schema<A>(adapter: &mut A) -> Result<InitReport>
where
    A: Adapter + ?Sized,
{
    let provider = adapter.provider();
    let family = provider.family();
    let mut report = InitReport::default();

    for statement in catalog::schema_statements(provider) {
        adapter.exec(&statement).await?;
        report.tables += 1;
    }

    for step in catalog::migration_statements(provider) {
        let params = [
            SqlValue::Text(step.table.to_string()),
            SqlValue::Text(step.column.to_string()),
        ];
        let outcome = if adapter.get(family.column_probe_sql(), &params).await?.is_some() {
            DdlOutcome::AlreadyPresent
        } else {
            best_effort(adapter, family, &step.statement).await?
        };
        report.columns.push(StepReport {
            name: format!("{}.{}", step.table, step.column),
            outcome,
        });
    }

    // Indexes last: some cover columns added by the steps above.
    for statement in catalog::index_statements(provider) {
        let outcome = best_effort(adapter, family, &statement).await?;
        report.indexes.push(StepReport {
            name: index_name(&statement),
            outcome,
        });
    }

    info!(
        "Schema ready on {}: {} tables, {} change(s) applied",
        provider,
        report.tables,
        report.applied()
    );
    Ok(report)
}

/// Run DDL, mapping allow-listed "already exists" failures to an outcome.
async fn best_effort<A>(adapter: &mut A, family: Family, statement: &str) -> Result<DdlOutcome>
where
    A: Adapter + ?Sized,
{
    match adapter.exec(statement).await {
        Ok(()) => Ok(DdlOutcome::Applied),
        Err(e) if family.is_already_present(&e) => {
            debug!("Already present, skipping: {} ({})", statement, e);
            Ok(DdlOutcome::AlreadyPresent)
        }
        Err(e) => Err(e),
    }
}

fn index_name(statement: &str) -> String {
    statement
        .split_whitespace()
        .find(|w| w.starts_with("idx_"))
        .unwrap_or(statement)
        .to_string()
}
