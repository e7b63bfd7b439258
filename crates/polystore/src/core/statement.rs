//! Statement text helpers shared by the drivers.
//!
//! Statements above the adapter layer are written once with `?` positional
//! placeholders. Drivers that need another placeholder syntax rewrite them
//! here, skipping anything inside string literals, quoted identifiers and
//! comments.

/// Rewrite `?` placeholders using `placeholder(n)` for the n-th (1-based) one.
pub fn rewrite_placeholders<F>(sql: &str, placeholder: F) -> String
where
    F: Fn(usize) -> String,
{
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut index = 0;

    while let Some(c) = chars.next() {
        match c {
            '?' => {
                index += 1;
                out.push_str(&placeholder(index));
            }
            '\'' | '"' | '`' => {
                out.push(c);
                // Quoted section; a doubled quote is an escaped quote.
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == c {
                        if chars.peek() == Some(&c) {
                            out.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// First keyword of a statement, uppercased (`INSERT`, `BEGIN`, ...).
pub fn leading_keyword(sql: &str) -> String {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// Whether the statement already carries a `RETURNING` clause.
pub fn has_returning_clause(sql: &str) -> bool {
    sql.to_uppercase()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|word| word == "RETURNING")
}

/// Explicit transaction-control verbs understood by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionVerb {
    Begin,
    Commit,
    Rollback,
}

impl TransactionVerb {
    /// Recognize `BEGIN [TRANSACTION]`, `START TRANSACTION`, `COMMIT`, `ROLLBACK`.
    pub fn parse(sql: &str) -> Option<Self> {
        let normalized = sql
            .trim()
            .trim_end_matches(';')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match normalized.as_str() {
            "BEGIN" | "BEGIN TRANSACTION" | "START TRANSACTION" => Some(TransactionVerb::Begin),
            "COMMIT" | "COMMIT TRANSACTION" | "END" => Some(TransactionVerb::Commit),
            "ROLLBACK" | "ROLLBACK TRANSACTION" => Some(TransactionVerb::Rollback),
            _ => None,
        }
    }
}

/// Whether `name` is a plain SQL identifier that is safe to quote and embed.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
