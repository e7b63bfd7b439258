//! Table definitions, written once and rendered per family.

use super::dialect::Family;

/// Referential action for a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    NoAction,
    Cascade,
    SetNull,
}

impl OnDelete {
    fn clause(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "",
            OnDelete::Cascade => " ON DELETE CASCADE",
            OnDelete::SetNull => " ON DELETE SET NULL",
        }
    }
}

/// Abstract column type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    /// Auto-increment integer primary key.
    Id,
    /// Unbounded text.
    Text,
    /// Short, indexable text with an optional quoted default.
    ShortText { default: Option<&'static str> },
    Integer,
    /// Amounts and rates.
    Real { default: Option<f64> },
    Bool { default: bool },
    Date,
    Timestamp { default_now: bool },
    /// Integer reference to `table.id`.
    References { table: &'static str, on_delete: OnDelete },
}

/// One column of a table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub not_null: bool,
    pub unique: bool,
}

/// One table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        not_null: false,
        unique: false,
    }
}

const fn required(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        not_null: true,
        unique: false,
    }
}

const fn unique(name: &'static str, kind: ColumnKind, not_null: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        not_null,
        unique: true,
    }
}

const ID: ColumnSpec = col("id", ColumnKind::Id);
const TEXT: ColumnKind = ColumnKind::Text;
const SHORT: ColumnKind = ColumnKind::ShortText { default: None };
const MONEY: ColumnKind = ColumnKind::Real { default: Some(0.0) };
const CREATED_AT: ColumnSpec = col("created_at", ColumnKind::Timestamp { default_now: true });
const UPDATED_AT: ColumnSpec = col("updated_at", ColumnKind::Timestamp { default_now: true });

pub const SETTINGS: TableSpec = TableSpec {
    name: "settings",
    columns: &[
        ID,
        col("company_name", SHORT),
        col("company_address", TEXT),
        col("company_email", SHORT),
        col("company_phone", SHORT),
        col("tax_id", SHORT),
        required("currency", ColumnKind::ShortText { default: Some("EUR") }),
        required("default_tax_rate", MONEY),
        col("invoice_prefix", ColumnKind::ShortText { default: Some("INV-") }),
        UPDATED_AT,
    ],
};

pub const CLIENTS: TableSpec = TableSpec {
    name: "clients",
    columns: &[
        ID,
        required("name", SHORT),
        col("email", SHORT),
        col("phone", SHORT),
        col("address", TEXT),
        col("tax_id", SHORT),
        col("notes", TEXT),
        CREATED_AT,
        UPDATED_AT,
    ],
};

pub const PRODUCTS: TableSpec = TableSpec {
    name: "products",
    columns: &[
        ID,
        required("name", SHORT),
        col("code", SHORT),
        col("category", SHORT),
        col("description", TEXT),
        required("unit_price", MONEY),
        required("tax_rate", MONEY),
        col("unit", SHORT),
        col("is_active", ColumnKind::Bool { default: true }),
        CREATED_AT,
        UPDATED_AT,
    ],
};

pub const INVOICES: TableSpec = TableSpec {
    name: "invoices",
    columns: &[
        ID,
        unique("invoice_number", SHORT, true),
        required(
            "client_id",
            ColumnKind::References {
                table: "clients",
                on_delete: OnDelete::NoAction,
            },
        ),
        required("issue_date", ColumnKind::Date),
        col("due_date", ColumnKind::Date),
        required("status", ColumnKind::ShortText { default: Some("draft") }),
        required("subtotal", MONEY),
        required("tax_total", MONEY),
        required("total", MONEY),
        col("notes", TEXT),
        col("is_paid", ColumnKind::Bool { default: false }),
        CREATED_AT,
        UPDATED_AT,
    ],
};

pub const INVOICE_ITEMS: TableSpec = TableSpec {
    name: "invoice_items",
    columns: &[
        ID,
        required(
            "invoice_id",
            ColumnKind::References {
                table: "invoices",
                on_delete: OnDelete::Cascade,
            },
        ),
        col("product_id", ColumnKind::Integer),
        col("description", TEXT),
        required("quantity", ColumnKind::Real { default: Some(1.0) }),
        required("unit_price", MONEY),
        required("tax_rate", MONEY),
        required("line_total", MONEY),
    ],
};

pub const INVOICE_DELIVERY_NOTES: TableSpec = TableSpec {
    name: "invoice_delivery_notes",
    columns: &[
        ID,
        required(
            "invoice_id",
            ColumnKind::References {
                table: "invoices",
                on_delete: OnDelete::Cascade,
            },
        ),
        col("note_number", SHORT),
        col("delivery_date", ColumnKind::Date),
        col("recipient", SHORT),
        col("content", TEXT),
        CREATED_AT,
    ],
};

pub const USERS: TableSpec = TableSpec {
    name: "users",
    columns: &[
        ID,
        unique("username", SHORT, true),
        unique("email", SHORT, false),
        required("password_hash", TEXT),
        required("role", ColumnKind::ShortText { default: Some("user") }),
        col("is_active", ColumnKind::Bool { default: true }),
        col("last_login_at", ColumnKind::Timestamp { default_now: false }),
        CREATED_AT,
    ],
};

pub const AUDIT_LOGS: TableSpec = TableSpec {
    name: "audit_logs",
    columns: &[
        ID,
        col(
            "user_id",
            ColumnKind::References {
                table: "users",
                on_delete: OnDelete::SetNull,
            },
        ),
        required("action", SHORT),
        col("entity_type", SHORT),
        col("entity_id", ColumnKind::Integer),
        col("details", TEXT),
        col("ip_address", SHORT),
        CREATED_AT,
    ],
};

pub const RECEIPTS: TableSpec = TableSpec {
    name: "receipts",
    columns: &[
        ID,
        required(
            "invoice_id",
            ColumnKind::References {
                table: "invoices",
                on_delete: OnDelete::Cascade,
            },
        ),
        col("receipt_number", SHORT),
        required("amount", MONEY),
        col("payment_method", SHORT),
        col("paid_at", ColumnKind::Timestamp { default_now: false }),
        col("notes", TEXT),
        CREATED_AT,
    ],
};

/// Creation order: every referenced table precedes its referrers.
pub const CREATE_ORDER: [&TableSpec; 9] = [
    &SETTINGS,
    &CLIENTS,
    &PRODUCTS,
    &INVOICES,
    &INVOICE_ITEMS,
    &INVOICE_DELIVERY_NOTES,
    &USERS,
    &AUDIT_LOGS,
    &RECEIPTS,
];

/// Look up a table by name.
pub fn find(name: &str) -> Option<&'static TableSpec> {
    CREATE_ORDER.iter().copied().find(|t| t.name == name)
}

impl TableSpec {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Render a column definition (name, type, constraints) for `family`.
pub fn render_column(family: Family, column: &ColumnSpec) -> String {
    let mut def = format!("{} ", column.name);

    let default = match column.kind {
        ColumnKind::Id => {
            def.push_str(family.id_column_type());
            return def;
        }
        ColumnKind::Text => {
            def.push_str("TEXT");
            None
        }
        ColumnKind::ShortText { default } => {
            def.push_str(family.short_text_type());
            default.map(|d| format!("'{}'", d))
        }
        ColumnKind::Integer | ColumnKind::References { .. } => {
            def.push_str("INTEGER");
            None
        }
        ColumnKind::Real { default } => {
            def.push_str(family.real_type());
            default.map(|d| format!("{:?}", d))
        }
        ColumnKind::Bool { default } => {
            def.push_str(family.bool_type());
            Some(family.bool_literal(default).to_string())
        }
        ColumnKind::Date => {
            def.push_str(family.date_type());
            None
        }
        ColumnKind::Timestamp { default_now } => {
            def.push_str(family.timestamp_type());
            default_now.then(|| "CURRENT_TIMESTAMP".to_string())
        }
    };

    if column.not_null {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = default {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }
    def
}

/// Render `CREATE TABLE IF NOT EXISTS` for `family`.
pub fn render_create_table(family: Family, table: &TableSpec) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| render_column(family, c))
        .collect();

    for column in table.columns {
        if let ColumnKind::References {
            table: parent,
            on_delete,
        } = column.kind
        {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}(id){}",
                column.name,
                parent,
                on_delete.clause()
            ));
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n){}",
        table.name,
        parts.join(",\n    "),
        family.table_options()
    )
}
