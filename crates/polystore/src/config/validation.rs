//! Pre-connection validation of the active provider section.

use super::{DatabaseConfig, Provider};
use crate::error::{Result, StoreError};

/// Validate that the active provider section has enough to attempt a connection.
///
/// Runs before any I/O so a half-filled configuration fails fast with a
/// message that names the provider and the missing field.
pub fn validate(config: &DatabaseConfig) -> Result<()> {
    let provider = config.provider;

    let Some(server) = config.server(provider) else {
        if config.sqlite.file_path.trim().is_empty() {
            return Err(StoreError::connection(
                provider.as_str(),
                "sqlite.filePath is required",
            ));
        }
        return Ok(());
    };

    if server.host.is_empty() {
        return Err(StoreError::connection(
            provider.as_str(),
            format!("{}.host is required", provider),
        ));
    }
    if server.database.is_empty() {
        return Err(StoreError::connection(
            provider.as_str(),
            format!("{}.database is required", provider),
        ));
    }
    if server.user.is_empty() {
        return Err(StoreError::connection(
            provider.as_str(),
            format!("{}.user is required", provider),
        ));
    }

    Ok(())
}

/// Reject a migration whose source and target resolve to the same database.
pub fn validate_distinct(source: &DatabaseConfig, target: &DatabaseConfig) -> Result<()> {
    let same = match (source.provider, target.provider) {
        (Provider::Sqlite, Provider::Sqlite) => source.sqlite.file_path == target.sqlite.file_path,
        (a, b) if a.family() == b.family() => match (source.server(a), target.server(b)) {
            (Some(s), Some(t)) => {
                s.host == t.host && s.port == t.port && s.database == t.database
            }
            _ => false,
        },
        _ => false,
    };

    if same {
        return Err(StoreError::validation(
            "source and target cannot be the same database",
        ));
    }
    Ok(())
}
