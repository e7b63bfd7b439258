//! MySQL driver, also used for MariaDB.
//!
//! One `mysql_async` connection per adapter. Statements keep their `?`
//! placeholders; `BEGIN` is sent as `START TRANSACTION`.

mod types;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Params, SslOpts};
use tracing::{debug, info};

use crate::config::{Provider, ServerSettings};
use crate::core::statement::leading_keyword;
use crate::core::{Adapter, Row, RunResult, SqlValue, TransactionVerb};
use crate::error::{Result, StoreError};

/// MySQL-family adapter.
pub struct MysqlAdapter {
    provider: Provider,
    conn: Option<Conn>,
}

impl MysqlAdapter {
    /// Open one connection using a provider section.
    pub async fn connect(provider: Provider, settings: &ServerSettings) -> Result<Self> {
        let password = (!settings.password.is_empty()).then_some(settings.password.as_str());

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(settings.host.as_str())
            .tcp_port(settings.port)
            .db_name(Some(settings.database.as_str()))
            .user(Some(settings.user.as_str()))
            .pass(password)
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if settings.ssl {
            builder = builder.ssl_opts(SslOpts::default().with_danger_accept_invalid_certs(true));
        }

        let opts: Opts = builder.into();
        let conn = Conn::new(opts)
            .await
            .map_err(|e| StoreError::connection(provider.as_str(), e))?;

        info!(
            "Connected to {}: {}:{}/{} (ssl={})",
            provider, settings.host, settings.port, settings.database, settings.ssl
        );

        Ok(Self {
            provider,
            conn: Some(conn),
        })
    }

    fn conn(&mut self) -> Result<&mut Conn> {
        let provider = self.provider;
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::connection(provider.as_str(), "adapter is closed"))
    }
}

fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(types::sql_value_to_mysql).collect())
    }
}

/// MySQL spelling of a statement sent through `exec`.
fn exec_sql(sql: &str) -> &str {
    match TransactionVerb::parse(sql) {
        Some(TransactionVerb::Begin) => "START TRANSACTION",
        Some(TransactionVerb::Commit) => "COMMIT",
        Some(TransactionVerb::Rollback) => "ROLLBACK",
        None => sql,
    }
}

#[async_trait]
impl Adapter for MysqlAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        let is_insert = leading_keyword(sql) == "INSERT";
        let conn = self.conn()?;
        conn.exec_drop(sql, to_params(params)).await?;

        let inserted_id = if is_insert {
            conn.last_insert_id()
                .filter(|id| *id > 0)
                .and_then(|id| i64::try_from(id).ok())
        } else {
            None
        };

        Ok(RunResult {
            inserted_id,
            changes: conn.affected_rows(),
        })
    }

    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let rows: Vec<mysql_async::Row> = conn.exec(sql, to_params(params)).await?;
        Ok(rows.iter().map(types::convert_row).collect())
    }

    async fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn()?.query_drop(exec_sql(sql)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
            debug!("Closed {} connection", self.provider);
        }
        Ok(())
    }
}
