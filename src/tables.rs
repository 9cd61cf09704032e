// ABOUTME: Table selection for a run - explicit list or '*' minus the skip-list
// ABOUTME: Expands '*' from the source store's table listing

use crate::config::ALL_TABLES;
use crate::error::{ReconcileError, Side};
use crate::store::RecordStore;

/// Which tables a run should visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSelection {
    requested: Vec<String>,
    skip: Vec<String>,
}

impl TableSelection {
    pub fn new(requested: Vec<String>, skip: Vec<String>) -> Self {
        Self { requested, skip }
    }

    /// True when the selection contains the `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.requested.iter().any(|t| t == ALL_TABLES)
    }

    /// The skip-list only applies to tables found through `*`.
    pub fn should_skip(&self, table: &str) -> bool {
        self.skip.iter().any(|s| s == table)
    }

    /// Resolve the selection to concrete table names, in run order.
    ///
    /// With `*`, every base table of `store` not on the skip-list is taken in
    /// name order. Explicit names are kept as given and appended after the
    /// expansion unless already present.
    pub async fn resolve<S>(&self, store: &mut S) -> Result<Vec<String>, ReconcileError>
    where
        S: RecordStore,
    {
        let mut tables: Vec<String> = Vec::new();

        if self.is_wildcard() {
            let listed = store
                .list_tables()
                .await
                .map_err(|source| ReconcileError::TableList {
                    side: Side::Source,
                    source,
                })?;
            for table in listed {
                if self.should_skip(&table) {
                    tracing::debug!("Skipping table {} (skip-list)", table);
                    continue;
                }
                tables.push(table);
            }
        }

        for table in self.requested.iter().filter(|t| *t != ALL_TABLES) {
            if !tables.contains(table) {
                tables.push(table.clone());
            }
        }

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_table("accounts", vec![])
            .with_table("nodes_info", vec![])
            .with_table("sessions", vec![])
    }

    #[tokio::test]
    async fn test_wildcard_expands_minus_skip_list() {
        let selection = TableSelection::new(vec!["*".to_string()], vec!["sessions".to_string()]);
        let tables = selection.resolve(&mut store()).await.unwrap();
        assert_eq!(tables, vec!["accounts", "nodes_info"]);
    }

    #[tokio::test]
    async fn test_explicit_list_kept_as_given() {
        let selection = TableSelection::new(
            vec!["sessions".to_string(), "accounts".to_string()],
            vec!["sessions".to_string()],
        );
        let tables = selection.resolve(&mut store()).await.unwrap();
        assert_eq!(tables, vec!["sessions", "accounts"]);
    }

    #[tokio::test]
    async fn test_wildcard_with_extra_names_deduplicates() {
        let selection = TableSelection::new(
            vec!["*".to_string(), "accounts".to_string(), "archive".to_string()],
            Vec::new(),
        );
        let tables = selection.resolve(&mut store()).await.unwrap();
        assert_eq!(tables, vec!["accounts", "nodes_info", "sessions", "archive"]);
    }

    #[test]
    fn test_is_wildcard() {
        assert!(TableSelection::new(vec!["*".to_string()], Vec::new()).is_wildcard());
        assert!(!TableSelection::new(vec!["t".to_string()], Vec::new()).is_wildcard());
    }
}
