// ABOUTME: Sentinel "zero date" repair applied to source rows before comparison
// ABOUTME: Derives missing timestamps from sibling date columns and nulls other sentinels

use std::collections::BTreeMap;

use crate::row::{Row, Value};

/// MySQL's all-zero DATETIME.
pub const DEFAULT_SENTINEL: &str = "0000-00-00 00:00:00";

/// Table whose timestamps are rebuilt by default.
pub const DEFAULT_REPAIR_TABLE: &str = "nodes_info";

/// `9` stands for any ASCII digit, every other byte must match as is.
const DATETIME_PATTERN: &str = "9999-99-99 99:99:99";

/// How sentinel values in one table are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRepair {
    /// Rebuild a sentinel timestamp column from the newest other date-time column.
    pub derive_timestamp: bool,
    /// Replace sentinels in non-timestamp columns with NULL.
    pub null_sentinels: bool,
}

/// Per-table repair rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPolicy {
    pub sentinel: String,
    pub tables: BTreeMap<String, TableRepair>,
    /// Rule for tables not listed in `tables`.
    pub fallback: TableRepair,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            DEFAULT_REPAIR_TABLE.to_string(),
            TableRepair {
                derive_timestamp: true,
                null_sentinels: true,
            },
        );
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            tables,
            fallback: TableRepair {
                derive_timestamp: false,
                null_sentinels: true,
            },
        }
    }
}

impl RepairPolicy {
    pub fn rule_for(&self, table: &str) -> &TableRepair {
        self.tables.get(table).unwrap_or(&self.fallback)
    }

    pub fn is_sentinel(&self, value: &Value) -> bool {
        value.as_text() == Some(self.sentinel.as_str())
    }

    /// Repair `row` in place.
    ///
    /// Repairing an already repaired row changes nothing.
    pub fn repair(&self, table: &str, row: &mut Row, timestamp_key: Option<&str>) {
        let rule = self.rule_for(table);

        if rule.derive_timestamp {
            if let Some(ts_col) = timestamp_key {
                if row.get(ts_col).is_some_and(|v| self.is_sentinel(v)) {
                    if let Some(newest) = newest_datetime(row, ts_col, &self.sentinel) {
                        tracing::trace!(
                            "{}: replacing sentinel {} with {}",
                            table,
                            ts_col,
                            newest
                        );
                        row.set(ts_col, newest);
                    }
                }
            }
        }

        if rule.null_sentinels {
            for (name, value) in row.columns_mut() {
                if Some(name.as_str()) != timestamp_key && self.is_sentinel(value) {
                    *value = Value::Null;
                }
            }
        }
    }

    /// False when the timestamp column is still unusable after repair.
    pub fn has_valid_timestamp(&self, row: &Row, timestamp_key: &str) -> bool {
        match row.get(timestamp_key) {
            None => false,
            Some(v) => !v.is_null() && !self.is_sentinel(v),
        }
    }
}

/// Exactly `YYYY-MM-DD HH:MM:SS` with a digit in every numeric position.
///
/// Calendar validity is not checked, so MySQL zero-in-date values such as
/// `2019-06-00 00:00:00` qualify. Padding with spaces does not.
pub fn is_datetime(text: &str) -> bool {
    text.len() == DATETIME_PATTERN.len()
        && DATETIME_PATTERN
            .bytes()
            .zip(text.bytes())
            .all(|(expected, actual)| match expected {
                b'9' => actual.is_ascii_digit(),
                literal => actual == literal,
            })
}

/// The greatest date-time found outside `skip_column`, ignoring the sentinel.
/// The format is fixed-width, so string order is chronological order.
fn newest_datetime(row: &Row, skip_column: &str, sentinel: &str) -> Option<String> {
    row.columns()
        .filter(|(name, _)| name.as_str() != skip_column)
        .filter_map(|(_, value)| value.as_text())
        .filter(|text| *text != sentinel && is_datetime(text))
        .max()
        .map(str::to_string)
}
