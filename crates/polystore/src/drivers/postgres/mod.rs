//! PostgreSQL driver, also used for Supabase.
//!
//! One `tokio_postgres` client per adapter. `?` placeholders become `$n`,
//! and INSERTs gain `RETURNING id` so the generated identifier is reported.

mod types;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, info, warn};

use crate::config::{Provider, ServerSettings};
use crate::core::statement::{has_returning_clause, leading_keyword, rewrite_placeholders};
use crate::core::{Adapter, Row, RunResult, SqlValue};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{Result, StoreError};

/// PostgreSQL-family adapter.
pub struct PostgresAdapter {
    provider: Provider,
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PostgresAdapter {
    /// Open one connection using a provider section.
    pub async fn connect(provider: Provider, settings: &ServerSettings) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config
            .host(&settings.host)
            .port(settings.port)
            .dbname(&settings.database)
            .user(&settings.user)
            .application_name("polystore");
        if !settings.password.is_empty() {
            pg_config.password(&settings.password);
        }

        let ssl_mode = SslMode::from_flag(settings.ssl);
        let (client, connection) = match TlsBuilder::new(ssl_mode).build()? {
            Some(tls) => {
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| StoreError::connection(provider.as_str(), e))?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {}", e);
                    }
                });
                (client, handle)
            }
            None => {
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| StoreError::connection(provider.as_str(), e))?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {}", e);
                    }
                });
                (client, handle)
            }
        };

        info!(
            "Connected to {}: {}:{}/{} (ssl={})",
            provider, settings.host, settings.port, settings.database, settings.ssl
        );

        Ok(Self {
            provider,
            client: Some(client),
            connection: Some(connection),
        })
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::connection(self.provider.as_str(), "adapter is closed"))
    }
}

/// Rewrite `?` placeholders to PostgreSQL's `$n`.
fn to_pg_placeholders(sql: &str) -> String {
    rewrite_placeholders(sql, |n| format!("${}", n))
}

/// Append `RETURNING id` to an INSERT that has no RETURNING clause.
fn with_returning_id(sql: &str) -> String {
    if leading_keyword(sql) == "INSERT" && !has_returning_clause(sql) {
        format!("{} RETURNING id", sql.trim_end().trim_end_matches(';'))
    } else {
        sql.to_string()
    }
}

fn as_params(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Adapter for PostgresAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        let client = self.client()?;
        let sql = to_pg_placeholders(sql);
        let params = as_params(params);

        if leading_keyword(&sql) != "INSERT" {
            let changes = client.execute(sql.as_str(), &params).await?;
            return Ok(RunResult {
                inserted_id: None,
                changes,
            });
        }

        let sql = with_returning_id(&sql);
        let rows = client.query(sql.as_str(), &params).await?;
        let mut inserted_id = None;
        if let Some(first) = rows.first() {
            inserted_id = types::convert_row(first)?
                .get("id")
                .and_then(SqlValue::as_i64);
        }
        debug!("INSERT returned {} row(s), id {:?}", rows.len(), inserted_id);

        Ok(RunResult {
            inserted_id,
            changes: rows.len() as u64,
        })
    }

    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let client = self.client()?;
        let sql = to_pg_placeholders(sql);
        let rows = client.query(sql.as_str(), &as_params(params)).await?;
        rows.iter().map(types::convert_row).collect()
    }

    async fn exec(&mut self, sql: &str) -> Result<()> {
        self.client()?.batch_execute(sql).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            drop(client);
            if let Some(handle) = self.connection.take() {
                let _ = handle.await;
            }
            debug!("Closed {} connection", self.provider);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_become_numbered() {
        assert_eq!(
            to_pg_placeholders("UPDATE clients SET name = ? WHERE id = ?"),
            "UPDATE clients SET name = $1 WHERE id = $2"
        );
    }

    #[test]
    fn test_insert_gains_returning_id() {
        assert_eq!(
            with_returning_id("INSERT INTO clients (name) VALUES ($1);"),
            "INSERT INTO clients (name) VALUES ($1) RETURNING id"
        );
        assert_eq!(
            with_returning_id("INSERT INTO clients (name) VALUES ($1) RETURNING id, name"),
            "INSERT INTO clients (name) VALUES ($1) RETURNING id, name"
        );
        assert_eq!(
            with_returning_id("DELETE FROM clients"),
            "DELETE FROM clients"
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_connection_error() {
        let settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..ServerSettings::defaults_for(Provider::Postgres)
        };
        let err = match PostgresAdapter::connect(Provider::Postgres, &settings).await {
            Ok(_) => panic!("connecting to port 1 should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, StoreError::Connection { ref provider, .. } if provider == "postgres"));
    }
}
