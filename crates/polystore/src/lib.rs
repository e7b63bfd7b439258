//! # polystore
//!
//! Provider-agnostic persistence layer for a small invoicing schema.
//!
//! One application data model is stored on any of five providers (sqlite,
//! postgres, mysql, mariadb, supabase) through:
//!
//! - **Config manager**: normalized JSON configuration with password preservation
//! - **Schema catalog**: per-dialect DDL for nine tables, indexes and additive columns
//! - **Adapters**: one `run`/`get`/`all`/`exec`/`close` contract over every engine
//! - **Snapshots**: export, transactional import (replace or append) and migration
//!
//! ## Example
//!
//! ```rust,no_run
//! use polystore::{migrate, ConfigManager, ImportMode, Provider};
//!
//! #[tokio::main]
//! async fn main() -> polystore::Result<()> {
//!     let source = ConfigManager::new("polystore.json").load();
//!     let target = source.with_provider(Provider::Postgres);
//!     let report = migrate(&source, &target, ImportMode::Replace).await?;
//!     println!("Migrated {} rows", report.import.total_inserted());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod migration;

// Re-exports for convenient access
pub use catalog::{
    index_statements, migration_statements, schema_statements, Family, DELETE_ORDER, INSERT_ORDER,
};
pub use config::{ConfigManager, DatabaseConfig, Provider, PublicConfig};
pub use self::core::{Adapter, Row, RunResult, SqlValue};
pub use drivers::{open, AdapterImpl};
pub use error::{ErrorKind, Result, StoreError};
pub use migration::{
    export_from, export_snapshot, import_into, import_snapshot, initialize_schema, migrate,
    ImportMode, ImportReport, InitReport, MigrationReport, Snapshot,
};
