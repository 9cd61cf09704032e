// ABOUTME: Error types for record stores and the reconciliation engine
// ABOUTME: Classifies failures into connection, lock, snapshot and mutation kinds

use std::fmt;
use thiserror::Error;

/// Which database a failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Row mutation kinds, used in reports and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => f.write_str("insert"),
            MutationKind::Update => f.write_str("update"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// Failure reported by a `RecordStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mysql(#[from] mysql_async::Error),
    #[error(transparent)]
    Url(#[from] mysql_async::UrlError),
    #[error("{0}")]
    Rejected(String),
}

/// Failure of the reconciliation engine.
///
/// `Connection` and `TableList` always abort the run. `Lock` and
/// `SnapshotRead` abandon the current table when errors are ignored.
/// `Mutation` skips the current row when errors are ignored.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to connect to {side} database at {uri}")]
    Connection {
        side: Side,
        uri: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list tables on {side}")]
    TableList {
        side: Side,
        #[source]
        source: StoreError,
    },

    #[error("failed to run '{statement}' for table {table} on {side}")]
    Lock {
        side: Side,
        table: String,
        statement: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read snapshot of table {table} from {side}")]
    SnapshotRead {
        side: Side,
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to {kind} {row} in table {table} on {side}")]
    Mutation {
        kind: MutationKind,
        side: Side,
        table: String,
        row: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// True for errors that end the current table but may leave the run going.
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            ReconcileError::Lock { .. } | ReconcileError::SnapshotRead { .. }
        )
    }

    /// The error message followed by its cause chain, for single-line logs.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}
