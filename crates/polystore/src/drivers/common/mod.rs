//! Utilities shared across database drivers.
//!
//! - [`tls`]: TLS configuration for PostgreSQL-family connections

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
