//! Derived statistics over the whole store.

use crate::backend::StorageBackend;
use crate::date_key::DateKey;
use crate::models::Priority;
use crate::store::{Snapshot, Store};

/// Number of days covered by the recent-activity histogram.
pub const RECENT_DAYS: i64 = 7;

/// Todo counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }
}

/// Summary statistics, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    /// Completed share of all todos, as a rounded percentage.
    pub completion_rate: u8,
    /// Dates with at least one todo.
    pub active_days: usize,
    /// Todo counts for the last seven days, oldest first.
    pub recent: Vec<(DateKey, usize)>,
    pub priorities: PriorityCounts,
}

impl Stats {
    pub fn compute(snapshot: &Snapshot, today: DateKey) -> Self {
        let mut stats = Stats::default();

        for todos in snapshot.todos_by_date.values() {
            if !todos.is_empty() {
                stats.active_days += 1;
            }
            for todo in todos {
                stats.total += 1;
                if todo.done {
                    stats.completed += 1;
                }
                match todo.priority {
                    Priority::High => stats.priorities.high += 1,
                    Priority::Normal => stats.priorities.normal += 1,
                    Priority::Low => stats.priorities.low += 1,
                }
            }
        }

        stats.completion_rate = completion_rate(stats.completed, stats.total);
        stats.recent = (0..RECENT_DAYS)
            .rev()
            .map(|back| {
                let date = today.offset_days(-back);
                let count = snapshot.todos_by_date.get(&date).map_or(0, Vec::len);
                (date, count)
            })
            .collect();

        stats
    }

    /// Largest count in the recent histogram, for bar scaling.
    pub fn recent_max(&self) -> usize {
        self.recent.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }
}

/// Rounded percentage, 0 when there is nothing to complete.
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

impl<B: StorageBackend> Store<B> {
    pub fn stats(&self, today: DateKey) -> Stats {
        Stats::compute(self.snapshot(), today)
    }
}
