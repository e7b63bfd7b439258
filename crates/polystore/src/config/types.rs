//! Configuration type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::Family;
use crate::error::{Result, StoreError};

/// Supported backing database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
    Mariadb,
    Supabase,
}

impl Provider {
    /// Every provider, in configuration file order.
    pub const ALL: [Provider; 5] = [
        Provider::Sqlite,
        Provider::Postgres,
        Provider::Mysql,
        Provider::Mariadb,
        Provider::Supabase,
    ];

    /// Providers reached over the network with host/port/user credentials.
    pub const NETWORKED: [Provider; 4] = [
        Provider::Postgres,
        Provider::Mysql,
        Provider::Mariadb,
        Provider::Supabase,
    ];

    /// Configuration tag for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Sqlite => "sqlite",
            Provider::Postgres => "postgres",
            Provider::Mysql => "mysql",
            Provider::Mariadb => "mariadb",
            Provider::Supabase => "supabase",
        }
    }

    /// Parse a provider tag.
    ///
    /// # Errors
    ///
    /// Returns an error naming the tag if it is not one of the supported providers.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Provider::Sqlite),
            "postgres" => Ok(Provider::Postgres),
            "mysql" => Ok(Provider::Mysql),
            "mariadb" => Ok(Provider::Mariadb),
            "supabase" => Ok(Provider::Supabase),
            other => Err(StoreError::Config(format!(
                "Unsupported database provider: '{}'. Supported providers: sqlite, postgres, mysql, mariadb, supabase",
                other
            ))),
        }
    }

    /// SQL dialect family used by this provider.
    pub fn family(&self) -> Family {
        match self {
            Provider::Sqlite => Family::Sqlite,
            Provider::Postgres | Provider::Supabase => Family::Postgres,
            Provider::Mysql | Provider::Mariadb => Family::Mysql,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Provider::parse(s)
    }
}

/// SQLite settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqliteSettings {
    /// Database file path.
    pub file_path: String,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            file_path: "data/polystore.db".to_string(),
        }
    }
}

/// Settings for a networked provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
}

impl ServerSettings {
    /// Default settings for a networked provider.
    ///
    /// SQLite has no server section; asking for it yields the postgres defaults.
    pub fn defaults_for(provider: Provider) -> Self {
        match provider {
            Provider::Mysql | Provider::Mariadb => Self {
                host: "localhost".to_string(),
                port: 3306,
                database: "polystore".to_string(),
                user: "root".to_string(),
                password: String::new(),
                ssl: false,
            },
            Provider::Supabase => Self {
                host: String::new(),
                port: 5432,
                database: "postgres".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                ssl: true,
            },
            Provider::Postgres | Provider::Sqlite => Self {
                host: "localhost".to_string(),
                port: 5432,
                database: "polystore".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                ssl: false,
            },
        }
    }
}

/// Root configuration record.
///
/// Every provider section is always present, whichever provider is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Active provider.
    pub provider: Provider,
    pub sqlite: SqliteSettings,
    pub postgres: ServerSettings,
    pub mysql: ServerSettings,
    pub mariadb: ServerSettings,
    pub supabase: ServerSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Sqlite,
            sqlite: SqliteSettings::default(),
            postgres: ServerSettings::defaults_for(Provider::Postgres),
            mysql: ServerSettings::defaults_for(Provider::Mysql),
            mariadb: ServerSettings::defaults_for(Provider::Mariadb),
            supabase: ServerSettings::defaults_for(Provider::Supabase),
        }
    }
}

impl DatabaseConfig {
    /// Server section for a networked provider, `None` for sqlite.
    pub fn server(&self, provider: Provider) -> Option<&ServerSettings> {
        match provider {
            Provider::Sqlite => None,
            Provider::Postgres => Some(&self.postgres),
            Provider::Mysql => Some(&self.mysql),
            Provider::Mariadb => Some(&self.mariadb),
            Provider::Supabase => Some(&self.supabase),
        }
    }

    /// Mutable server section for a networked provider.
    pub fn server_mut(&mut self, provider: Provider) -> Option<&mut ServerSettings> {
        match provider {
            Provider::Sqlite => None,
            Provider::Postgres => Some(&mut self.postgres),
            Provider::Mysql => Some(&mut self.mysql),
            Provider::Mariadb => Some(&mut self.mariadb),
            Provider::Supabase => Some(&mut self.supabase),
        }
    }

    /// Copy of this configuration with a different active provider.
    pub fn with_provider(&self, provider: Provider) -> Self {
        let mut config = self.clone();
        config.provider = provider;
        config
    }

    /// Secret-free descriptor of the active connection, e.g. `postgres://app@db:5432/books`.
    pub fn describe(&self) -> String {
        match self.server(self.provider) {
            None => format!("sqlite:{}", self.sqlite.file_path),
            Some(s) => format!(
                "{}://{}@{}:{}/{}",
                self.provider, s.user, s.host, s.port, s.database
            ),
        }
    }

    /// Raw JSON form, in the persisted layout.
    pub fn to_value(&self) -> Value {
        let mut root = json!({
            "provider": self.provider.as_str(),
            "sqlite": { "filePath": self.sqlite.file_path },
        });
        for provider in Provider::NETWORKED {
            if let Some(s) = self.server(provider) {
                root[provider.as_str()] = json!({
                    "host": s.host,
                    "port": s.port,
                    "database": s.database,
                    "user": s.user,
                    "password": s.password,
                    "ssl": s.ssl,
                });
            }
        }
        root
    }
}

/// Outward-facing server section: the password is reduced to a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicServerSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub ssl: bool,
    pub has_password: bool,
}

impl From<&ServerSettings> for PublicServerSettings {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            database: s.database.clone(),
            user: s.user.clone(),
            ssl: s.ssl,
            has_password: !s.password.is_empty(),
        }
    }
}

/// Outward-facing configuration view. Never carries a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicConfig {
    pub provider: Provider,
    pub sqlite: SqliteSettings,
    pub postgres: PublicServerSettings,
    pub mysql: PublicServerSettings,
    pub mariadb: PublicServerSettings,
    pub supabase: PublicServerSettings,
}
