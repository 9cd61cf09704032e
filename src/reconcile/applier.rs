// ABOUTME: Mutation applier - sends inserts, updates and deletes to a record store
// ABOUTME: Honours dry-run, counts every outcome, converts failures per ignore-errors

use crate::error::{MutationKind, ReconcileError, Side, StoreError};
use crate::reconcile::stats::TableStats;
use crate::row::{Row, Value};
use crate::store::RecordStore;

/// A single row change ready to be sent.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// Insert `row` into the target.
    Insert(&'a Row),
    /// Overwrite the target row with `row`.
    UpdateTarget(&'a Row),
    /// Overwrite the source row with `row` (the target's version).
    UpdateSource(&'a Row),
    /// Remove `row` from the target.
    Delete(&'a Row),
}

impl<'a> Mutation<'a> {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Insert(_) => MutationKind::Insert,
            Mutation::UpdateTarget(_) | Mutation::UpdateSource(_) => MutationKind::Update,
            Mutation::Delete(_) => MutationKind::Delete,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Mutation::UpdateSource(_) => Side::Source,
            _ => Side::Target,
        }
    }

    pub fn row(&self) -> &'a Row {
        match self {
            Mutation::Insert(row)
            | Mutation::UpdateTarget(row)
            | Mutation::UpdateSource(row)
            | Mutation::Delete(row) => row,
        }
    }

    fn count(&self, stats: &mut TableStats) {
        match self {
            Mutation::Insert(_) => stats.added += 1,
            Mutation::UpdateTarget(_) => stats.updated += 1,
            Mutation::UpdateSource(_) => stats.updated_source += 1,
            Mutation::Delete(_) => stats.deleted += 1,
        }
    }
}

/// Applies mutations for one table.
pub struct Applier<'a> {
    table: &'a str,
    key_column: &'a str,
    ignore_errors: bool,
}

impl<'a> Applier<'a> {
    pub fn new(table: &'a str, key_column: &'a str, ignore_errors: bool) -> Self {
        Self {
            table,
            key_column,
            ignore_errors,
        }
    }

    /// Send `mutation` to `store` when `live`, otherwise only count it.
    ///
    /// Successful and dry-run mutations bump the matching counter. A failed
    /// mutation bumps `errors`; it is returned as an error unless errors are
    /// ignored, in which case the caller moves on to the next row.
    pub async fn apply<S>(
        &self,
        store: &mut S,
        mutation: Mutation<'_>,
        live: bool,
        stats: &mut TableStats,
    ) -> Result<(), ReconcileError>
    where
        S: RecordStore,
    {
        let row = mutation.row();
        let marker = if live { "" } else { "(NOT) " };
        tracing::debug!(
            "{}{} {} on {}: {}",
            marker,
            mutation.kind(),
            self.table,
            mutation.side(),
            row.describe(self.key_column)
        );

        if !live {
            mutation.count(stats);
            return Ok(());
        }

        match self.send(store, mutation).await {
            Ok(()) => {
                mutation.count(stats);
                Ok(())
            }
            Err(source) => {
                stats.errors += 1;
                let err = ReconcileError::Mutation {
                    kind: mutation.kind(),
                    side: mutation.side(),
                    table: self.table.to_string(),
                    row: row.describe(self.key_column),
                    source,
                };
                tracing::error!("{}", err.report());
                if self.ignore_errors {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn send<S>(&self, store: &mut S, mutation: Mutation<'_>) -> Result<(), StoreError>
    where
        S: RecordStore,
    {
        let row = mutation.row();
        let key = row.get(self.key_column).unwrap_or(&Value::Null);
        match mutation {
            Mutation::Insert(_) => store.insert(self.table, row).await,
            Mutation::UpdateTarget(_) | Mutation::UpdateSource(_) => {
                store.update(self.table, row, self.key_column, key).await
            }
            Mutation::Delete(_) => store.delete(self.table, self.key_column, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> Row {
        Row::new().with("id", 4).with("name", "four")
    }

    #[tokio::test]
    async fn test_live_insert_counts_and_applies() {
        let mut store = MemoryStore::new().with_table("t", vec![]);
        let mut stats = TableStats::new("t");
        let row = sample();

        Applier::new("t", "id", false)
            .apply(&mut store, Mutation::Insert(&row), true, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.added, 1);
        assert_eq!(store.rows("t").len(), 1);
        assert_eq!(store.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_applying() {
        let mut store = MemoryStore::new().with_table("t", vec![sample()]);
        let mut stats = TableStats::new("t");
        let row = sample();
        let applier = Applier::new("t", "id", false);

        applier
            .apply(&mut store, Mutation::UpdateTarget(&row), false, &mut stats)
            .await
            .unwrap();
        applier
            .apply(&mut store, Mutation::Delete(&row), false, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.deleted, 1);
        assert!(store.mutations().is_empty());
        assert_eq!(store.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn test_failure_aborts_without_ignore_errors() {
        let mut store = MemoryStore::new().fail_mutation(MutationKind::Delete, "4");
        let mut stats = TableStats::new("t");
        let row = sample();

        let err = Applier::new("t", "id", false)
            .apply(&mut store, Mutation::Delete(&row), true, &mut stats)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Mutation {
                kind: MutationKind::Delete,
                side: Side::Target,
                ..
            }
        ));
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.deleted, 0);
    }

    #[tokio::test]
    async fn test_failure_skipped_with_ignore_errors() {
        let mut store = MemoryStore::new().fail_mutation(MutationKind::Update, "4");
        let mut stats = TableStats::new("t");
        let row = sample();

        Applier::new("t", "id", true)
            .apply(&mut store, Mutation::UpdateSource(&row), true, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.updated_source, 0);
    }

    #[test]
    fn test_mutation_sides() {
        let row = sample();
        assert_eq!(Mutation::Insert(&row).side(), Side::Target);
        assert_eq!(Mutation::UpdateTarget(&row).side(), Side::Target);
        assert_eq!(Mutation::UpdateSource(&row).side(), Side::Source);
        assert_eq!(Mutation::Delete(&row).kind(), MutationKind::Delete);
    }
}
