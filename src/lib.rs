// ABOUTME: Library root for table-reconciler
// ABOUTME: Exposes the reconciliation engine, record stores, config and commands

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod reconcile;
pub mod row;
pub mod store;
pub mod tables;
pub mod utils;

pub use config::SyncOptions;
pub use error::{ReconcileError, StoreError};
pub use reconcile::{Reconciler, RunStats, TableStats};
pub use row::{Key, Row, Value};
pub use store::{MemoryStore, MysqlStore, RecordStore};
