//! The uniform statement-execution contract.
//!
//! Every backing engine is reached through [`Adapter`]: four statement
//! operations plus `close`. Statements are authored with `?` placeholders;
//! each implementation translates at its own boundary.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Provider;
use crate::error::Result;

use super::statement::TransactionVerb;
use super::value::{Row, SqlValue};

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Identifier generated for an INSERT, when the engine reports one.
    pub inserted_id: Option<i64>,
    /// Rows changed by the statement.
    pub changes: u64,
}

/// Single-connection session against one provider.
///
/// A handle is owned by one logical task. `close` is safe to call more than
/// once; every other operation fails after it.
#[async_trait]
pub trait Adapter: Send {
    /// Provider this session is connected to.
    fn provider(&self) -> Provider;

    /// Execute a mutating statement.
    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult>;

    /// Fetch the first row of a query, if any.
    ///
    /// Default implementation reads all rows and keeps the first.
    async fn get(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        Ok(self.all(sql, params).await?.into_iter().next())
    }

    /// Fetch every row of a query, in result order.
    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Execute DDL or a transaction-control verb without parameters.
    async fn exec(&mut self, sql: &str) -> Result<()>;

    /// Release the connection.
    async fn close(&mut self) -> Result<()>;

    /// Begin an explicit transaction.
    async fn begin(&mut self) -> Result<()> {
        self.exec(verb_sql(TransactionVerb::Begin)).await
    }

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<()> {
        self.exec(verb_sql(TransactionVerb::Commit)).await
    }

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<()> {
        self.exec(verb_sql(TransactionVerb::Rollback)).await
    }
}

fn verb_sql(verb: TransactionVerb) -> &'static str {
    match verb {
        TransactionVerb::Begin => "BEGIN",
        TransactionVerb::Commit => "COMMIT",
        TransactionVerb::Rollback => "ROLLBACK",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result_serializes_camel_case() {
        let result = RunResult {
            inserted_id: Some(10),
            changes: 1,
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"insertedId":10,"changes":1}"#
        );
    }

    #[test]
    fn test_verb_sql_round_trips_through_parser() {
        for verb in [
            TransactionVerb::Begin,
            TransactionVerb::Commit,
            TransactionVerb::Rollback,
        ] {
            assert_eq!(TransactionVerb::parse(verb_sql(verb)), Some(verb));
        }
    }
}
