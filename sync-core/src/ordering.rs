//! Canonical task order.
//!
//! Tasks are ordered by due date ascending, then by creation time ascending.
//! A due date or creation time that is absent, empty or fails to parse is
//! treated as the earliest possible instant, so such tasks sort first. This
//! is a defined default, not an error.
//!
//! The remote subscription uses the same ordering so ties resolve the same
//! way on both sides, but the local sort is always reapplied.

use std::cmp::Ordering;

use sync_types::time::{parse_due_date, parse_timestamp};
use sync_types::Task;

/// (due, created) in epoch milliseconds. `None` orders before every `Some`.
type SortKey = (Option<i64>, Option<i64>);

fn sort_key(task: &Task) -> SortKey {
    (
        parse_due_date(&task.due_date).map(|dt| dt.timestamp_millis()),
        task.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt| dt.timestamp_millis()),
    )
}

/// Compare two tasks in canonical order.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Sort tasks in place. Stable: equal keys keep their relative order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_cached_key(sort_key);
}

/// Check that tasks are in canonical order.
pub fn is_sorted(tasks: &[Task]) -> bool {
    tasks
        .windows(2)
        .all(|pair| compare_tasks(&pair[0], &pair[1]) != Ordering::Greater)
}
