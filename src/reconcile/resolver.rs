// ABOUTME: Conflict resolver - decides what to do with each source row
// ABOUTME: Force, timestamp ordering, or full-row equality, one-way or two-way

use std::cmp::Ordering;

use crate::config::SyncOptions;
use crate::row::{Row, Value};

/// Outcome for one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No target row with this key.
    Insert,
    /// Overwrite the target row with the source row.
    UpdateTarget,
    /// Two-way only: overwrite the source row with the newer target row.
    UpdateSource,
    /// Target is newer but two-way is off; report it and leave both sides.
    WarnTargetNewer,
    /// Rows already agree.
    NoOp,
    /// Source timestamp is NULL or still the sentinel after repair.
    Skip,
}

/// Order two timestamp values.
///
/// Timestamps are stored as fixed-width `YYYY-MM-DD HH:MM:SS` text, so plain
/// string comparison is chronological. NULL sorts first. Swap this out if
/// timestamps ever arrive in another format.
pub fn compare_timestamps(source: Option<&Value>, target: Option<&Value>) -> Ordering {
    let source = source.and_then(Value::to_text);
    let target = target.and_then(Value::to_text);
    source.cmp(&target)
}

/// Decide what to do with a (repaired) source row and its target counterpart.
pub fn resolve(source: &Row, target: Option<&Row>, options: &SyncOptions) -> Decision {
    if let Some(ts) = &options.timestamp_key {
        if !options.repair.has_valid_timestamp(source, ts) {
            return Decision::Skip;
        }
    }

    let Some(target) = target else {
        return Decision::Insert;
    };

    if options.force {
        return Decision::UpdateTarget;
    }

    match &options.timestamp_key {
        Some(ts) => match compare_timestamps(source.get(ts), target.get(ts)) {
            Ordering::Greater => Decision::UpdateTarget,
            Ordering::Equal => Decision::NoOp,
            Ordering::Less if options.two_way => Decision::UpdateSource,
            Ordering::Less => Decision::WarnTargetNewer,
        },
        None => {
            if source.same_content(target) {
                Decision::NoOp
            } else {
                Decision::UpdateTarget
            }
        }
    }
}
