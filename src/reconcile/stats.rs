// ABOUTME: Per-table and per-run reconciliation counters
// ABOUTME: Threaded explicitly through the driver, never global

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub table: String,
    /// Source rows examined by the upsert pass.
    pub scanned: u64,
    /// Source rows left out because their timestamp is unusable.
    pub skipped: u64,
    pub added: u64,
    pub updated: u64,
    /// Rows pushed back to the source in two-way mode.
    pub updated_source: u64,
    pub deleted: u64,
    /// Rows on either side left out of the snapshot for a missing or NULL key.
    pub dropped: u64,
    pub warnings: u64,
    pub errors: u64,
}

impl TableStats {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

/// Totals for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub tables_processed: u64,
    /// Tables given up on after a lock or snapshot failure.
    pub tables_abandoned: u64,
    pub scanned: u64,
    pub skipped: u64,
    pub added: u64,
    pub updated: u64,
    pub updated_source: u64,
    pub deleted: u64,
    pub dropped: u64,
    pub warnings: u64,
    pub errors: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub tables: Vec<TableStats>,
}

impl RunStats {
    pub fn started_now() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Fold a finished table into the run totals.
    pub fn absorb(&mut self, table: TableStats) {
        self.tables_processed += 1;
        self.scanned += table.scanned;
        self.skipped += table.skipped;
        self.added += table.added;
        self.updated += table.updated;
        self.updated_source += table.updated_source;
        self.deleted += table.deleted;
        self.dropped += table.dropped;
        self.warnings += table.warnings;
        self.errors += table.errors;
        self.tables.push(table);
    }

    /// Record a table that could not be processed.
    pub fn abandon(&mut self) {
        self.tables_abandoned += 1;
        self.errors += 1;
    }

    /// Check if the run finished without warnings or errors.
    pub fn is_clean(&self) -> bool {
        self.warnings == 0 && self.errors == 0
    }
}
