// ABOUTME: Record store abstraction over one database connection
// ABOUTME: Snapshot reads, single-row mutations by key, raw statements and table listing

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MysqlStore;

use crate::error::StoreError;
use crate::row::{Row, Value};
use async_trait::async_trait;

/// Login used when opening a store, overriding whatever the URI carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Credential {
    pub fn new(user: Option<String>, password: Option<String>) -> Self {
        Self { user, password }
    }
}

/// Everything the reconciliation engine needs from a database.
///
/// Each implementation wraps exactly one connection for the whole run, so
/// table locks taken through `execute` stay on the connection that later
/// reads and writes.
#[async_trait]
pub trait RecordStore: Send {
    /// Run a statement that returns no rows (lock, unlock, ...).
    async fn execute(&mut self, statement: &str) -> Result<(), StoreError>;

    /// Run a query and collect every row.
    async fn fetch_all(&mut self, query: &str) -> Result<Vec<Row>, StoreError>;

    async fn insert(&mut self, table: &str, row: &Row) -> Result<(), StoreError>;

    /// Overwrite the row whose `key_column` equals `key` with `row`'s columns.
    async fn update(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        key: &Value,
    ) -> Result<(), StoreError>;

    async fn delete(&mut self, table: &str, key_column: &str, key: &Value)
        -> Result<(), StoreError>;

    /// Names of all base tables visible on this connection.
    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError>;
}
