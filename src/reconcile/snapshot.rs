// ABOUTME: Snapshot indexer - keys a full table read by primary key
// ABOUTME: Built once per side per table and never updated afterwards

use std::collections::BTreeMap;

use crate::row::{Key, Row};

/// Full contents of one table on one side, keyed by primary key.
#[derive(Debug, Default)]
pub struct Snapshot {
    rows: BTreeMap<Key, Row>,
    dropped: usize,
}

impl Snapshot {
    /// Index `rows` by `key_column`.
    ///
    /// A later row with the same key replaces an earlier one. Rows whose key
    /// column is missing or NULL cannot be matched and are dropped.
    pub fn from_rows(rows: Vec<Row>, key_column: &str) -> Self {
        let mut snapshot = Snapshot::default();
        for row in rows {
            match row.key(key_column) {
                Some(key) => {
                    snapshot.rows.insert(key, row);
                }
                None => {
                    tracing::warn!(
                        "Dropping row without {} from snapshot: {}",
                        key_column,
                        row.describe(key_column)
                    );
                    snapshot.dropped += 1;
                }
            }
        }
        snapshot
    }

    pub fn get(&self, key: &Key) -> Option<&Row> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that had no usable key.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Row)> {
        self.rows.iter()
    }

    /// Keys present here but not in `other`.
    pub fn keys_missing_from<'a>(&'a self, other: &'a Snapshot) -> impl Iterator<Item = (&'a Key, &'a Row)> {
        self.rows.iter().filter(move |(key, _)| !other.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Value;

    #[test]
    fn test_index_by_key() {
        let snapshot = Snapshot::from_rows(
            vec![
                Row::new().with("id", 1).with("v", "a"),
                Row::new().with("id", 2).with("v", "b"),
            ],
            "id",
        );
        assert_eq!(snapshot.len(), 2);
        let key = Row::new().with("id", 2).key("id").unwrap();
        assert_eq!(snapshot.get(&key).unwrap().get("v"), Some(&Value::from("b")));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let snapshot = Snapshot::from_rows(
            vec![
                Row::new().with("id", 1).with("v", "first"),
                Row::new().with("id", 1).with("v", "second"),
            ],
            "id",
        );
        assert_eq!(snapshot.len(), 1);
        let (_, row) = snapshot.iter().next().unwrap();
        assert_eq!(row.get("v"), Some(&Value::from("second")));
    }

    #[test]
    fn test_rows_without_key_dropped() {
        let snapshot = Snapshot::from_rows(
            vec![
                Row::new().with("id", Value::Null),
                Row::new().with("other", 1),
                Row::new().with("id", 3),
            ],
            "id",
        );
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.dropped(), 2);
    }

    #[test]
    fn test_keys_missing_from() {
        let target = Snapshot::from_rows(
            vec![Row::new().with("id", 1), Row::new().with("id", 9)],
            "id",
        );
        let source = Snapshot::from_rows(vec![Row::new().with("id", 1)], "id");
        let orphans: Vec<String> = target
            .keys_missing_from(&source)
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(orphans, vec!["9".to_string()]);
    }
}
