//! Dialect-aware schema catalog.
//!
//! Pure functions from a provider to ordered DDL statement lists:
//!
//! - [`schema_statements`]: CREATE TABLE for the nine tables, must all succeed
//! - [`index_statements`]: secondary indexes, best-effort
//! - [`migration_statements`]: additive columns for older installations, best-effort
//!
//! Also home of the fixed table orderings used by import and export.

mod dialect;
pub mod tables;

pub use dialect::Family;

use crate::config::Provider;
use crate::core::SqlValue;

/// Parent-first table order for inserts and exports.
pub const INSERT_ORDER: [&str; 9] = [
    "settings",
    "users",
    "clients",
    "products",
    "invoices",
    "invoice_items",
    "invoice_delivery_notes",
    "receipts",
    "audit_logs",
];

/// Child-first table order for deletes: exactly [`INSERT_ORDER`] reversed.
pub const DELETE_ORDER: [&str; 9] = [
    "audit_logs",
    "receipts",
    "invoice_delivery_notes",
    "invoice_items",
    "invoices",
    "products",
    "clients",
    "users",
    "settings",
];

/// Secondary indexes: (index name, table, column).
const INDEXES: [(&str, &str, &str); 12] = [
    ("idx_invoices_client_id", "invoices", "client_id"),
    ("idx_invoices_issue_date", "invoices", "issue_date"),
    ("idx_products_name", "products", "name"),
    ("idx_products_code", "products", "code"),
    ("idx_products_category", "products", "category"),
    ("idx_invoice_items_invoice_id", "invoice_items", "invoice_id"),
    ("idx_receipts_invoice_id", "receipts", "invoice_id"),
    ("idx_delivery_notes_invoice_id", "invoice_delivery_notes", "invoice_id"),
    ("idx_users_email", "users", "email"),
    ("idx_users_username", "users", "username"),
    ("idx_audit_logs_user_id", "audit_logs", "user_id"),
    ("idx_audit_logs_created_at", "audit_logs", "created_at"),
];

/// Columns added after the first schema release: (table, column).
///
/// Installations created before these existed get them through
/// [`migration_statements`]; fresh installations already have them.
const ADDED_COLUMNS: [(&str, &str); 6] = [
    ("products", "code"),
    ("products", "category"),
    ("invoices", "is_paid"),
    ("users", "last_login_at"),
    ("settings", "invoice_prefix"),
    ("audit_logs", "ip_address"),
];

/// An additive column migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMigration {
    pub table: &'static str,
    pub column: &'static str,
    /// `ALTER TABLE ... ADD COLUMN ...` for the target family.
    pub statement: String,
}

/// CREATE TABLE statements, in dependency order.
pub fn schema_statements(provider: Provider) -> Vec<String> {
    let family = provider.family();
    tables::CREATE_ORDER
        .iter()
        .map(|table| tables::render_create_table(family, table))
        .collect()
}

/// CREATE INDEX statements.
pub fn index_statements(provider: Provider) -> Vec<String> {
    let family = provider.family();
    let if_not_exists = if family.supports_index_if_not_exists() {
        "IF NOT EXISTS "
    } else {
        ""
    };

    INDEXES
        .iter()
        .map(|(name, table, column)| {
            format!(
                "CREATE INDEX {}{} ON {}({})",
                if_not_exists, name, table, column
            )
        })
        .collect()
}

/// Additive column migrations.
pub fn migration_statements(provider: Provider) -> Vec<ColumnMigration> {
    let family = provider.family();
    ADDED_COLUMNS
        .iter()
        .filter_map(|(table, column)| {
            let spec = tables::find(table)?.column(column)?;
            Some(ColumnMigration {
                table,
                column,
                statement: format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    table,
                    tables::render_column(family, spec)
                ),
            })
        })
        .collect()
}

/// Query returning `max_id`, the largest id in `table` (0 when empty).
pub fn max_id_query(table: &str) -> String {
    format!("SELECT COALESCE(MAX(id), 0) AS max_id FROM {}", table)
}

/// Identity repair after rows were inserted with explicit ids.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityReset {
    /// The engine adjusts its counter on its own (sqlite).
    NotNeeded,
    /// A parameterized query to run through `Adapter::all`.
    Query { sql: String, params: Vec<SqlValue> },
    /// A DDL statement to run through `Adapter::exec`.
    Ddl(String),
}

/// Identity reset so the next generated id for `table` is `next_id`.
pub fn identity_reset(family: Family, table: &str, next_id: i64) -> IdentityReset {
    match family {
        Family::Sqlite => IdentityReset::NotNeeded,
        Family::Postgres => IdentityReset::Query {
            sql: "SELECT setval(pg_get_serial_sequence(?, 'id'), ?, false) AS next_id".to_string(),
            params: vec![SqlValue::Text(table.to_string()), SqlValue::Int(next_id)],
        },
        Family::Mysql => {
            IdentityReset::Ddl(format!("ALTER TABLE {} AUTO_INCREMENT = {}", table, next_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_order_is_reverse_of_insert_order() {
        let mut reversed = INSERT_ORDER;
        reversed.reverse();
        assert_eq!(reversed, DELETE_ORDER);
    }

    #[test]
    fn test_insert_order_respects_foreign_keys() {
        for (position, name) in INSERT_ORDER.iter().enumerate() {
            let table = tables::find(name).unwrap();
            for column in table.columns {
                if let tables::ColumnKind::References { table: parent, .. } = column.kind {
                    let parent_position = INSERT_ORDER.iter().position(|t| *t == parent).unwrap();
                    assert!(
                        parent_position < position,
                        "{} must be inserted after {}",
                        name,
                        parent
                    );
                }
            }
        }
    }

    #[test]
    fn test_schema_statements_cover_all_tables_in_order() {
        for provider in Provider::ALL {
            let statements = schema_statements(provider);
            assert_eq!(statements.len(), 9);
            assert!(statements[0].contains("TABLE IF NOT EXISTS settings"));
            assert!(statements[8].contains("TABLE IF NOT EXISTS receipts"));
            for name in INSERT_ORDER {
                assert!(
                    statements
                        .iter()
                        .any(|s| s.contains(&format!("IF NOT EXISTS {} (", name))),
                    "{} missing for {}",
                    name,
                    provider
                );
            }
        }
    }

    #[test]
    fn test_identity_column_spelling_per_family() {
        assert!(schema_statements(Provider::Sqlite)[0].contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(schema_statements(Provider::Supabase)[0].contains("SERIAL PRIMARY KEY"));
        assert!(schema_statements(Provider::Mariadb)[0].contains("INT AUTO_INCREMENT PRIMARY KEY"));
    }

    #[test]
    fn test_index_statements() {
        let pg = index_statements(Provider::Postgres);
        assert_eq!(pg.len(), 12);
        assert!(pg.contains(&"CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)".to_string()));

        let mysql = index_statements(Provider::Mysql);
        assert!(mysql.contains(&"CREATE INDEX idx_audit_logs_created_at ON audit_logs(created_at)".to_string()));
    }

    #[test]
    fn test_migration_statements() {
        let steps = migration_statements(Provider::Sqlite);
        assert_eq!(steps.len(), ADDED_COLUMNS.len());

        let category = steps.iter().find(|s| s.column == "category").unwrap();
        assert_eq!(category.table, "products");
        assert_eq!(category.statement, "ALTER TABLE products ADD COLUMN category TEXT");

        let paid = migration_statements(Provider::Postgres)
            .into_iter()
            .find(|s| s.column == "is_paid")
            .unwrap();
        assert_eq!(
            paid.statement,
            "ALTER TABLE invoices ADD COLUMN is_paid BOOLEAN DEFAULT FALSE"
        );
    }

    #[test]
    fn test_identity_reset_next_id_after_max() {
        // ids [1, 5, 9] were restored: the next generated id must be 10
        match identity_reset(Family::Postgres, "invoices", 9 + 1) {
            IdentityReset::Query { sql, params } => {
                assert!(sql.contains("setval(pg_get_serial_sequence(?, 'id'), ?, false)"));
                assert_eq!(
                    params,
                    vec![SqlValue::Text("invoices".to_string()), SqlValue::Int(10)]
                );
            }
            other => panic!("unexpected reset {:?}", other),
        }

        assert_eq!(
            identity_reset(Family::Mysql, "invoices", 10),
            IdentityReset::Ddl("ALTER TABLE invoices AUTO_INCREMENT = 10".to_string())
        );
        assert_eq!(
            identity_reset(Family::Sqlite, "invoices", 10),
            IdentityReset::NotNeeded
        );
    }
}
