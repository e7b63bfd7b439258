//! Core abstractions shared by the drivers and the migration engine.
//!
//! - [`value`]: the scalar value set and row type
//! - [`statement`]: placeholder rewriting and statement classification
//! - [`traits`]: the [`Adapter`] contract

pub mod statement;
pub mod traits;
pub mod value;

pub use statement::{is_plain_identifier, TransactionVerb};
pub use traits::{Adapter, RunResult};
pub use value::{Row, SqlValue, DATE_FORMAT, TIMESTAMP_FORMAT};
