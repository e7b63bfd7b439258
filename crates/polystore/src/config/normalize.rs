//! Normalization, merging and secret preservation of raw configuration.
//!
//! Raw configuration arrives as loosely typed JSON (a persisted file or a
//! request body). Everything here is total: malformed fields fall back to
//! per-provider defaults instead of failing.

use serde_json::{Map, Value};

use super::types::{
    DatabaseConfig, Provider, PublicConfig, PublicServerSettings, ServerSettings, SqliteSettings,
};

const TRUE_WORDS: [&str; 4] = ["1", "true", "yes", "on"];
const FALSE_WORDS: [&str; 4] = ["0", "false", "no", "off"];

/// Normalize a raw configuration record.
///
/// Idempotent: `normalize(&normalize(x).to_value()) == normalize(x)`.
pub fn normalize(raw: &Value) -> DatabaseConfig {
    let provider = raw
        .get("provider")
        .and_then(Value::as_str)
        .and_then(|tag| Provider::parse(tag).ok())
        .unwrap_or_default();

    DatabaseConfig {
        provider,
        sqlite: normalize_sqlite(raw.get("sqlite")),
        postgres: normalize_server(Provider::Postgres, raw.get("postgres")),
        mysql: normalize_server(Provider::Mysql, raw.get("mysql")),
        mariadb: normalize_server(Provider::Mariadb, raw.get("mariadb")),
        supabase: normalize_server(Provider::Supabase, raw.get("supabase")),
    }
}

/// Overlay `patch` on `current`, one provider section at a time.
///
/// Fields present in a patch section replace the current ones; fields the
/// patch leaves out are kept.
pub fn merge(current: &DatabaseConfig, patch: &Value) -> DatabaseConfig {
    let mut base = current.to_value();

    if let Some(patch) = patch.as_object() {
        if let Some(provider) = patch.get("provider") {
            base["provider"] = provider.clone();
        }
        for section in Provider::ALL {
            let key = section.as_str();
            let Some(fields) = patch.get(key).and_then(Value::as_object) else {
                continue;
            };
            if let Some(target) = base.get_mut(key).and_then(Value::as_object_mut) {
                for (field, value) in fields {
                    target.insert(field.clone(), value.clone());
                }
            }
        }
    }

    normalize(&base)
}

/// Merge `incoming` into `current` without ever blanking a stored password.
///
/// A section's password is replaced only when `incoming` carries a non-empty
/// value for it, coerced the same way `merge` coerces it.
pub fn apply_secret_preservation(current: &DatabaseConfig, incoming: &Value) -> DatabaseConfig {
    let mut merged = merge(current, incoming);

    for provider in Provider::NETWORKED {
        let supplied = incoming
            .get(provider.as_str())
            .and_then(Value::as_object)
            .and_then(|section| string_field(section, "password"))
            .is_some_and(|password| !password.is_empty());
        if supplied {
            continue;
        }
        if let (Some(target), Some(previous)) =
            (merged.server_mut(provider), current.server(provider))
        {
            target.password = previous.password.clone();
        }
    }

    merged
}

/// Secret-free view of a configuration.
pub fn public_view(config: &DatabaseConfig) -> PublicConfig {
    PublicConfig {
        provider: config.provider,
        sqlite: config.sqlite.clone(),
        postgres: PublicServerSettings::from(&config.postgres),
        mysql: PublicServerSettings::from(&config.mysql),
        mariadb: PublicServerSettings::from(&config.mariadb),
        supabase: PublicServerSettings::from(&config.supabase),
    }
}

fn normalize_sqlite(raw: Option<&Value>) -> SqliteSettings {
    let defaults = SqliteSettings::default();
    let Some(section) = raw.and_then(Value::as_object) else {
        return defaults;
    };

    SqliteSettings {
        file_path: string_field(section, "filePath")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(defaults.file_path),
    }
}

fn normalize_server(provider: Provider, raw: Option<&Value>) -> ServerSettings {
    let defaults = ServerSettings::defaults_for(provider);
    let Some(section) = raw.and_then(Value::as_object) else {
        return defaults;
    };

    ServerSettings {
        host: string_field(section, "host")
            .map(|h| h.trim().to_string())
            .unwrap_or(defaults.host),
        port: section
            .get("port")
            .and_then(coerce_port)
            .unwrap_or(defaults.port),
        database: string_field(section, "database")
            .map(|d| d.trim().to_string())
            .unwrap_or(defaults.database),
        user: string_field(section, "user")
            .map(|u| u.trim().to_string())
            .unwrap_or(defaults.user),
        password: string_field(section, "password").unwrap_or(defaults.password),
        ssl: section
            .get("ssl")
            .and_then(coerce_bool)
            .unwrap_or(defaults.ssl),
    }
}

fn string_field(section: &Map<String, Value>, key: &str) -> Option<String> {
    match section.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(port).ok().filter(|p| *p != 0)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => {
            let word = s.trim().to_lowercase();
            if TRUE_WORDS.contains(&word.as_str()) {
                Some(true)
            } else if FALSE_WORDS.contains(&word.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}
