//! Per-family SQL spellings.
//!
//! Providers collapse into three dialect families. Each family picks its own
//! identity column, text width, boolean representation and literal spelling,
//! and knows which DDL failures mean "already there".

use crate::error::StoreError;

/// SQL dialect family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// sqlite
    Sqlite,
    /// postgres, supabase
    Postgres,
    /// mysql, mariadb
    Mysql,
}

/// Postgres SQLSTATEs for objects that already exist.
const PG_ALREADY_PRESENT: [&str; 3] = [
    "42701", // duplicate_column
    "42P07", // duplicate_table (also indexes)
    "42710", // duplicate_object
];

/// MySQL/MariaDB server errors for objects that already exist.
const MYSQL_ALREADY_PRESENT: [&str; 3] = [
    "1060", // ER_DUP_FIELDNAME
    "1061", // ER_DUP_KEYNAME
    "1050", // ER_TABLE_EXISTS_ERROR
];

/// SQLite reports these only through the message text.
const SQLITE_ALREADY_PRESENT: [&str; 2] = ["duplicate column name", "already exists"];

impl Family {
    /// Family identifier used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Family::Sqlite => "sqlite",
            Family::Postgres => "postgres",
            Family::Mysql => "mysql",
        }
    }

    /// Quote an identifier.
    ///
    /// - SQLite/PostgreSQL: `"identifier"`
    /// - MySQL: `` `identifier` ``
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Family::Mysql => format!("`{}`", name.replace('`', "``")),
            Family::Sqlite | Family::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Auto-increment integer primary key.
    pub fn id_column_type(&self) -> &'static str {
        match self {
            Family::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Family::Postgres => "SERIAL PRIMARY KEY",
            Family::Mysql => "INT AUTO_INCREMENT PRIMARY KEY",
        }
    }

    /// Short, indexable text. MySQL cannot index or default a bare TEXT column.
    pub fn short_text_type(&self) -> &'static str {
        match self {
            Family::Mysql => "VARCHAR(255)",
            Family::Sqlite | Family::Postgres => "TEXT",
        }
    }

    /// Floating point amounts and rates.
    pub fn real_type(&self) -> &'static str {
        match self {
            Family::Sqlite => "REAL",
            Family::Postgres => "DOUBLE PRECISION",
            Family::Mysql => "DOUBLE",
        }
    }

    /// Boolean column type.
    pub fn bool_type(&self) -> &'static str {
        match self {
            Family::Sqlite => "INTEGER",
            Family::Postgres => "BOOLEAN",
            Family::Mysql => "TINYINT(1)",
        }
    }

    /// Boolean literal for defaults.
    pub fn bool_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (Family::Postgres, true) => "TRUE",
            (Family::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Calendar date column type.
    pub fn date_type(&self) -> &'static str {
        match self {
            Family::Sqlite => "TEXT",
            Family::Postgres | Family::Mysql => "DATE",
        }
    }

    /// Timestamp column type.
    pub fn timestamp_type(&self) -> &'static str {
        match self {
            Family::Sqlite => "TEXT",
            Family::Postgres => "TIMESTAMP",
            Family::Mysql => "DATETIME",
        }
    }

    /// Trailing table options for CREATE TABLE.
    pub fn table_options(&self) -> &'static str {
        match self {
            Family::Mysql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            Family::Sqlite | Family::Postgres => "",
        }
    }

    /// Whether CREATE INDEX accepts IF NOT EXISTS.
    pub fn supports_index_if_not_exists(&self) -> bool {
        !matches!(self, Family::Mysql)
    }

    /// Parameterized probe returning a row when `table.column` exists.
    ///
    /// Parameters: table name, column name.
    pub fn column_probe_sql(&self) -> &'static str {
        match self {
            Family::Sqlite => "SELECT 1 AS present FROM pragma_table_info(?) WHERE name = ?",
            Family::Postgres => {
                "SELECT 1 AS present FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name::text = ? AND column_name::text = ?"
            }
            Family::Mysql => {
                "SELECT 1 AS present FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?"
            }
        }
    }

    /// Whether MySQL-style DDL would implicitly commit an open transaction.
    pub fn ddl_commits_transaction(&self) -> bool {
        matches!(self, Family::Mysql)
    }

    /// Whether a DDL failure means the desired object already exists.
    ///
    /// This is an explicit allow-list per family; any other failure is real.
    pub fn is_already_present(&self, err: &StoreError) -> bool {
        let StoreError::Database { code, message } = err else {
            return false;
        };
        match self {
            Family::Postgres => code
                .as_deref()
                .is_some_and(|c| PG_ALREADY_PRESENT.contains(&c)),
            Family::Mysql => code
                .as_deref()
                .is_some_and(|c| MYSQL_ALREADY_PRESENT.contains(&c)),
            Family::Sqlite => {
                let message = message.to_lowercase();
                SQLITE_ALREADY_PRESENT.iter().any(|m| message.contains(m))
            }
        }
    }
}
