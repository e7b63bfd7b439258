//! Statement order of a replace import against postgres- and mysql-family
//! targets, observed through a recording adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use polystore::{
    import_into, Adapter, ImportMode, Provider, Result, Row, RunResult, Snapshot, SqlValue,
    DELETE_ORDER,
};
use serde_json::json;

/// Adapter that records every statement and answers `MAX(id)` queries from
/// a fixed table of ids.
struct RecordingAdapter {
    provider: Provider,
    max_ids: BTreeMap<&'static str, i64>,
    log: Vec<(String, Vec<SqlValue>)>,
}

impl RecordingAdapter {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            max_ids: BTreeMap::from([("invoices", 9)]),
            log: Vec::new(),
        }
    }

    fn statements(&self) -> Vec<&str> {
        self.log.iter().map(|(sql, _)| sql.as_str()).collect()
    }

    fn position(&self, pred: impl Fn(&str, &[SqlValue]) -> bool) -> usize {
        self.log
            .iter()
            .position(|(sql, params)| pred(sql, params))
            .unwrap_or_else(|| panic!("statement not found in {:#?}", self.log))
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<RunResult> {
        self.log.push((sql.to_string(), params.to_vec()));
        Ok(RunResult {
            inserted_id: None,
            changes: 1,
        })
    }

    async fn all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.log.push((sql.to_string(), params.to_vec()));
        if let Some(table) = sql.strip_prefix("SELECT COALESCE(MAX(id), 0) AS max_id FROM ") {
            let max_id = self.max_ids.get(table.trim()).copied().unwrap_or(0);
            let row: Row = [("max_id".to_string(), SqlValue::Int(max_id))]
                .into_iter()
                .collect();
            return Ok(vec![row]);
        }
        Ok(Vec::new())
    }

    async fn exec(&mut self, sql: &str) -> Result<()> {
        self.log.push((sql.to_string(), Vec::new()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn invoices_snapshot() -> Snapshot {
    Snapshot::from_value(&json!({
        "tables": { "invoices": [{"id": 1}, {"id": 5}, {"id": 9}] }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_postgres_replace_resets_sequence_inside_transaction() {
    let mut adapter = RecordingAdapter::new(Provider::Postgres);
    let report = import_into(&mut adapter, &invoices_snapshot(), ImportMode::Replace)
        .await
        .unwrap();
    assert_eq!(report.inserted("invoices"), Some(3));

    let statements = adapter.statements();
    assert_eq!(statements.first(), Some(&"BEGIN"));
    assert_eq!(statements.last(), Some(&"COMMIT"));

    // Child-first deletes open the transaction
    let deletes: Vec<String> = DELETE_ORDER
        .iter()
        .map(|t| format!("DELETE FROM {}", t))
        .collect();
    assert_eq!(&statements[1..=DELETE_ORDER.len()], deletes.as_slice());

    let last_insert = adapter
        .log
        .iter()
        .rposition(|(sql, _)| sql.starts_with("INSERT INTO invoices"))
        .unwrap();
    let inserts = statements
        .iter()
        .filter(|sql| sql.starts_with("INSERT INTO invoices"))
        .count();
    assert_eq!(inserts, 3);

    let max_query = adapter.position(|sql, _| {
        sql == "SELECT COALESCE(MAX(id), 0) AS max_id FROM invoices"
    });
    let setval = adapter.position(|sql, params| {
        sql.contains("setval(pg_get_serial_sequence(?, 'id'), ?, false)")
            && params == [SqlValue::Text("invoices".into()), SqlValue::Int(10)]
    });
    let commit = statements.len() - 1;

    assert!(last_insert < max_query);
    assert!(max_query < setval);
    assert!(setval < commit);
    assert!(!statements.iter().any(|sql| sql.contains("AUTO_INCREMENT")));
}

#[tokio::test]
async fn test_mysql_replace_resets_auto_increment_after_commit() {
    let mut adapter = RecordingAdapter::new(Provider::Mysql);
    import_into(&mut adapter, &invoices_snapshot(), ImportMode::Replace)
        .await
        .unwrap();

    let statements = adapter.statements();
    assert_eq!(statements.first(), Some(&"BEGIN"));

    let commit = adapter.position(|sql, _| sql == "COMMIT");
    let alter = adapter.position(|sql, _| sql == "ALTER TABLE invoices AUTO_INCREMENT = 10");
    assert!(commit < alter);

    // No DDL inside the transaction
    assert!(!statements[..commit]
        .iter()
        .any(|sql| sql.starts_with("ALTER TABLE")));
    assert!(!statements.iter().any(|sql| sql.contains("setval")));
}

#[tokio::test]
async fn test_append_leaves_rows_and_identities_alone() {
    for provider in [Provider::Supabase, Provider::Mariadb] {
        let mut adapter = RecordingAdapter::new(provider);
        import_into(&mut adapter, &invoices_snapshot(), ImportMode::Append)
            .await
            .unwrap();

        let statements = adapter.statements();
        assert_eq!(statements.first(), Some(&"BEGIN"));
        assert_eq!(statements.last(), Some(&"COMMIT"));
        assert!(!statements.iter().any(|sql| sql.starts_with("DELETE")));
        assert!(!statements.iter().any(|sql| sql.contains("MAX(id)")));
        assert_eq!(statements.len(), 2 + 3);
    }
}
