// ABOUTME: Reconciliation driver - runs lock, snapshot, delete and upsert per table
// ABOUTME: Aggregates per-table counters into run totals and applies the error policy

use std::time::Instant;

use super::applier::{Applier, Mutation};
use super::lock::{LockCoordinator, LockState};
use super::resolver::{resolve, Decision};
use super::snapshot::Snapshot;
use super::stats::{RunStats, TableStats};
use crate::config::SyncOptions;
use crate::error::{ReconcileError, Side};
use crate::progress::TableProgress;
use crate::store::RecordStore;
use crate::utils::quote_mysql_ident;

/// Reconciles tables from `source` into `target`.
///
/// Tables are processed one after another. For each table the target is read
/// before the source, so a source row that appears between the two reads is
/// still reconciled in the same pass.
pub struct Reconciler<'a, S, T> {
    source: &'a mut S,
    target: &'a mut T,
    options: &'a SyncOptions,
}

impl<'a, S, T> Reconciler<'a, S, T>
where
    S: RecordStore,
    T: RecordStore,
{
    pub fn new(source: &'a mut S, target: &'a mut T, options: &'a SyncOptions) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    /// Reconcile every table in `tables`.
    ///
    /// Lock and snapshot failures abandon the table when errors are ignored
    /// and abort the run otherwise. Unignored mutation failures abort the run.
    pub async fn run(&mut self, tables: &[String]) -> Result<RunStats, ReconcileError> {
        let start = Instant::now();
        let mut run = RunStats::started_now();

        for table in tables {
            match self.reconcile_table(table).await {
                Ok(stats) => {
                    log_table_summary(&stats, self.options.apply);
                    run.absorb(stats);
                }
                Err(err) if err.is_table_scoped() && self.options.ignore_errors => {
                    tracing::error!("Skipping table {}: {}", table, err.report());
                    run.abandon();
                }
                Err(err) => return Err(err),
            }
        }

        run.duration_ms = start.elapsed().as_millis() as u64;
        Ok(run)
    }

    /// Reconcile a single table and return its counters.
    pub async fn reconcile_table(&mut self, table: &str) -> Result<TableStats, ReconcileError> {
        let options = self.options;
        let progress = TableProgress::new(table, options.progress);
        let mut locks = LockCoordinator::new(table, options.read_lock, options.write_lock);

        let result = self
            .reconcile_locked(table, &mut locks, &progress)
            .await;
        progress.finish();

        if result.is_err() && locks.state() != LockState::Unlocked {
            // Leave the target unlocked before handing the error back.
            if let Err(unlock) = locks.release(self.target).await {
                tracing::warn!("{}", unlock.report());
            }
        }
        result
    }

    async fn reconcile_locked(
        &mut self,
        table: &str,
        locks: &mut LockCoordinator,
        progress: &TableProgress,
    ) -> Result<TableStats, ReconcileError> {
        let options = self.options;
        let key_column = options.primary_key.as_str();
        let timestamp_key = options.timestamp_key.as_deref();
        let mut stats = TableStats::new(table);

        locks.acquire_source(self.source).await?;

        progress.stage("reading target");
        let target_snapshot = read_snapshot(self.target, Side::Target, table, key_column).await?;
        progress.stage("reading source");
        let source_snapshot = read_snapshot(self.source, Side::Source, table, key_column).await?;
        tracing::debug!(
            "{}: {} source rows, {} target rows",
            table,
            source_snapshot.len(),
            target_snapshot.len()
        );
        stats.dropped = (source_snapshot.dropped() + target_snapshot.dropped()) as u64;
        if source_snapshot.is_empty() && !target_snapshot.is_empty() && options.delete {
            tracing::warn!(
                "{}: source table is empty, all {} target rows are up for deletion",
                table,
                target_snapshot.len()
            );
        }

        locks.before_apply(self.target).await?;

        let applier = Applier::new(table, key_column, options.ignore_errors);

        // Deletion pass: target rows the source no longer has.
        let live_delete = options.apply && options.delete;
        for (_, row) in target_snapshot.keys_missing_from(&source_snapshot) {
            applier
                .apply(self.target, Mutation::Delete(row), live_delete, &mut stats)
                .await?;
        }

        // Upsert pass over every source row.
        progress.start_pass("applying", source_snapshot.len() as u64);
        for (key, original) in source_snapshot.iter() {
            progress.inc();
            stats.scanned += 1;

            let mut row = original.clone();
            options.repair.repair(table, &mut row, timestamp_key);
            let target_row = target_snapshot.get(key);

            match resolve(&row, target_row, options) {
                Decision::Skip => {
                    tracing::debug!(
                        "{}: skipping {}, no usable {}",
                        table,
                        row.describe(key_column),
                        timestamp_key.unwrap_or_default()
                    );
                    stats.skipped += 1;
                }
                Decision::NoOp => {}
                Decision::Insert => {
                    applier
                        .apply(self.target, Mutation::Insert(&row), options.apply, &mut stats)
                        .await?;
                }
                Decision::UpdateTarget => {
                    applier
                        .apply(
                            self.target,
                            Mutation::UpdateTarget(&row),
                            options.apply,
                            &mut stats,
                        )
                        .await?;
                }
                Decision::UpdateSource => {
                    if let Some(newer) = target_row {
                        applier
                            .apply(
                                self.source,
                                Mutation::UpdateSource(newer),
                                options.apply,
                                &mut stats,
                            )
                            .await?;
                    }
                }
                Decision::WarnTargetNewer => {
                    tracing::warn!(
                        "{}: target row is newer than source, not overwriting: {}",
                        table,
                        row.describe(key_column)
                    );
                    stats.warnings += 1;
                }
            }
        }

        locks.release(self.target).await?;
        if locks.source_lock_outstanding() {
            tracing::debug!(
                "{}: source READ lock stays held until the source connection releases it",
                table
            );
        }
        Ok(stats)
    }
}

async fn read_snapshot<S>(
    store: &mut S,
    side: Side,
    table: &str,
    key_column: &str,
) -> Result<Snapshot, ReconcileError>
where
    S: RecordStore,
{
    let query = format!("SELECT * FROM {}", quote_mysql_ident(table));
    let rows = store
        .fetch_all(&query)
        .await
        .map_err(|source| ReconcileError::SnapshotRead {
            side,
            table: table.to_string(),
            source,
        })?;
    Ok(Snapshot::from_rows(rows, key_column))
}

fn log_table_summary(stats: &TableStats, live: bool) {
    tracing::info!(
        "{}{}: scanned={} skipped={} added={} updated={} updated_source={} deleted={} dropped={} warnings={} errors={}",
        if live { "" } else { "(dry run) " },
        stats.table,
        stats.scanned,
        stats.skipped,
        stats.added,
        stats.updated,
        stats.updated_source,
        stats.deleted,
        stats.dropped,
        stats.warnings,
        stats.errors
    );
}
