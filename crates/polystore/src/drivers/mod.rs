//! Database driver implementations of the [`Adapter`] contract.
//!
//! - [`sqlite`]: sqlx-backed SQLite
//! - [`postgres`]: tokio-postgres, serving postgres and supabase
//! - [`mysql`]: mysql_async, serving mysql and mariadb
//! - [`common`]: shared utilities (TLS)
//!
//! # Static dispatch
//!
//! [`AdapterImpl`] is an enum over the three families rather than a
//! `Box<dyn Adapter>`; the compiler generates a match instead of a vtable
//! call. Providers of one family share a variant.

pub mod common;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use common::{SslMode, TlsBuilder};
pub use mysql::MysqlAdapter;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use async_trait::async_trait;
use tracing::info;

use crate::catalog::Family;
use crate::config::{self, DatabaseConfig, Provider};
use crate::core::{Adapter, Row, RunResult, SqlValue};
use crate::error::{Result, StoreError};

/// Enum-based static dispatch for adapters.
pub enum AdapterImpl {
    Sqlite(SqliteAdapter),
    Postgres(PostgresAdapter),
    Mysql(MysqlAdapter),
}

impl AdapterImpl {
    /// Dialect family of the connected provider.
    pub fn family(&self) -> Family {
        self.provider().family()
    }
}

#[async_trait]
impl Adapter for AdapterImpl {
    fn provider(&self) -> Provider {
        match self {
            AdapterImpl::Sqlite(a) => a.provider(),
            AdapterImpl::Postgres(a) => a.provider(),
            AdapterImpl::Mysql(a) => a.provider(),
        }
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        match self {
            AdapterImpl::Sqlite(a) => a.run(sql, params).await,
            AdapterImpl::Postgres(a) => a.run(sql, params).await,
            AdapterImpl::Mysql(a) => a.run(sql, params).await,
        }
    }

    async fn get(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        match self {
            AdapterImpl::Sqlite(a) => a.get(sql, params).await,
            AdapterImpl::Postgres(a) => a.get(sql, params).await,
            AdapterImpl::Mysql(a) => a.get(sql, params).await,
        }
    }

    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        match self {
            AdapterImpl::Sqlite(a) => a.all(sql, params).await,
            AdapterImpl::Postgres(a) => a.all(sql, params).await,
            AdapterImpl::Mysql(a) => a.all(sql, params).await,
        }
    }

    async fn exec(&mut self, sql: &str) -> Result<()> {
        match self {
            AdapterImpl::Sqlite(a) => a.exec(sql).await,
            AdapterImpl::Postgres(a) => a.exec(sql).await,
            AdapterImpl::Mysql(a) => a.exec(sql).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            AdapterImpl::Sqlite(a) => a.close().await,
            AdapterImpl::Postgres(a) => a.close().await,
            AdapterImpl::Mysql(a) => a.close().await,
        }
    }
}

/// Open an adapter for the configuration's active provider.
///
/// The active section is validated first, so missing connection fields are
/// reported without any network or file I/O.
///
/// # Errors
///
/// Returns a `Connection` error naming the provider when validation or the
/// connection attempt fails.
pub async fn open(config: &DatabaseConfig) -> Result<AdapterImpl> {
    config::validate(config)?;

    let provider = config.provider;
    info!("Opening {} adapter ({})", provider, config.describe());

    let adapter = match provider.family() {
        Family::Sqlite => AdapterImpl::Sqlite(SqliteAdapter::connect(&config.sqlite).await?),
        Family::Postgres => {
            let settings = server_settings(config, provider)?;
            AdapterImpl::Postgres(PostgresAdapter::connect(provider, settings).await?)
        }
        Family::Mysql => {
            let settings = server_settings(config, provider)?;
            AdapterImpl::Mysql(MysqlAdapter::connect(provider, settings).await?)
        }
    };

    Ok(adapter)
}

fn server_settings(config: &DatabaseConfig, provider: Provider) -> Result<&config::ServerSettings> {
    config.server(provider).ok_or_else(|| {
        StoreError::connection(provider.as_str(), "no connection settings for provider")
    })
}
