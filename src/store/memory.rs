// ABOUTME: In-process record store that records every statement and mutation
// ABOUTME: Supports failure injection so ignore-errors paths can be exercised

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use super::RecordStore;
use crate::error::{MutationKind, StoreError};
use crate::row::{Row, Value};

/// A mutation that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMutation {
    pub kind: MutationKind,
    pub table: String,
    /// Key value in text form.
    pub key: String,
}

/// Tables held in memory, keyed by table name.
///
/// `fetch_all` understands the `SELECT * FROM <table>` form the driver
/// issues (backtick quoting optional).
#[derive(Debug)]
pub struct MemoryStore {
    key_column: String,
    tables: BTreeMap<String, Vec<Row>>,
    statements: Vec<String>,
    mutations: Vec<AppliedMutation>,
    failing_statements: HashSet<String>,
    failing_reads: HashSet<String>,
    failing_keys: HashSet<(MutationKind, String)>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            key_column: "id".to_string(),
            tables: BTreeMap::new(),
            statements: Vec::new(),
            mutations: Vec::new(),
            failing_statements: HashSet::new(),
            failing_reads: HashSet::new(),
            failing_keys: HashSet::new(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column that identifies inserted rows in the mutation log (default `id`).
    pub fn with_key_column(mut self, column: &str) -> Self {
        self.key_column = column.to_string();
        self
    }

    /// Seed a table with rows, replacing any previous contents.
    pub fn with_table(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    /// Make `execute` fail for this exact statement.
    pub fn fail_statement(mut self, statement: &str) -> Self {
        self.failing_statements.insert(statement.to_string());
        self
    }

    /// Make snapshot reads of `table` fail.
    pub fn fail_read(mut self, table: &str) -> Self {
        self.failing_reads.insert(table.to_string());
        self
    }

    /// Make the given mutation kind fail for the row with this key.
    pub fn fail_mutation(mut self, kind: MutationKind, key: &str) -> Self {
        self.failing_keys.insert((kind, key.to_string()));
        self
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Statements passed to `execute`, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Mutations that were actually applied, in order.
    pub fn mutations(&self) -> &[AppliedMutation] {
        &self.mutations
    }

    fn check_failure(&self, kind: MutationKind, key: &Value) -> Result<(), StoreError> {
        let key = key.to_text().unwrap_or_default();
        if self.failing_keys.contains(&(kind, key.clone())) {
            return Err(StoreError::Rejected(format!("injected {} failure for key {}", kind, key)));
        }
        Ok(())
    }

    fn record(&mut self, kind: MutationKind, table: &str, key: &Value) {
        self.mutations.push(AppliedMutation {
            kind,
            table: table.to_string(),
            key: key.to_text().unwrap_or_default(),
        });
    }
}

fn matches_key(row: &Row, key_column: &str, key: &Value) -> bool {
    row.get(key_column).and_then(Value::to_text) == key.to_text()
}

fn table_of_select(query: &str) -> Option<String> {
    let lower = query.to_ascii_lowercase();
    let idx = lower.find(" from ")?;
    let rest = query[idx + " from ".len()..].trim();
    let name = rest.split_whitespace().next()?;
    Some(name.trim_matches('`').replace("``", "`"))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        if self.failing_statements.contains(statement) {
            return Err(StoreError::Rejected(format!("injected failure for '{}'", statement)));
        }
        self.statements.push(statement.to_string());
        Ok(())
    }

    async fn fetch_all(&mut self, query: &str) -> Result<Vec<Row>, StoreError> {
        let table = table_of_select(query)
            .ok_or_else(|| StoreError::Rejected(format!("unsupported query '{}'", query)))?;
        if self.failing_reads.contains(&table) {
            return Err(StoreError::Rejected(format!("injected read failure for {}", table)));
        }
        self.tables
            .get(&table)
            .cloned()
            .ok_or_else(|| StoreError::Rejected(format!("table {} doesn't exist", table)))
    }

    async fn insert(&mut self, table: &str, row: &Row) -> Result<(), StoreError> {
        let id = row.get(&self.key_column).cloned().unwrap_or(Value::Null);
        self.check_failure(MutationKind::Insert, &id)?;

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        self.record(MutationKind::Insert, table, &id);
        Ok(())
    }

    async fn update(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        key: &Value,
    ) -> Result<(), StoreError> {
        self.check_failure(MutationKind::Update, key)?;

        let rows = self.tables.entry(table.to_string()).or_default();
        for existing in rows.iter_mut().filter(|r| matches_key(r, key_column, key)) {
            for (name, value) in row.columns() {
                existing.set(name, value.clone());
            }
        }
        self.record(MutationKind::Update, table, key);
        Ok(())
    }

    async fn delete(
        &mut self,
        table: &str,
        key_column: &str,
        key: &Value,
    ) -> Result<(), StoreError> {
        self.check_failure(MutationKind::Delete, key)?;

        if let Some(rows) = self.tables.get_mut(table) {
            rows.retain(|r| !matches_key(r, key_column, key));
        }
        self.record(MutationKind::Delete, table, key);
        Ok(())
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.keys().cloned().collect())
    }
}
