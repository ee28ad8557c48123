//! Month grid for calendar navigation.

use crate::backend::StorageBackend;
use crate::date_key::DateKey;
use crate::store::{Snapshot, Store};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Six weeks of seven days.
pub const GRID_CELLS: usize = 42;

/// First column of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn labels(&self) -> [&'static str; 7] {
        match self {
            WeekStart::Monday => ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"],
            WeekStart::Sunday => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
        }
    }

    fn leading_days(&self, first: DateKey) -> i64 {
        let weekday = first.date().weekday();
        match self {
            WeekStart::Monday => weekday.num_days_from_monday() as i64,
            WeekStart::Sunday => weekday.num_days_from_sunday() as i64,
        }
    }
}

/// One day in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub date: DateKey,
    /// False for the leading/trailing days of neighbouring months.
    pub in_month: bool,
    pub is_today: bool,
    pub todo_count: usize,
    pub done_count: usize,
    pub has_note: bool,
}

impl GridCell {
    pub fn has_open_todos(&self) -> bool {
        self.done_count < self.todo_count
    }
}

/// Calendar data for one month.
#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub week_start: WeekStart,
    pub cells: Vec<GridCell>,
}

impl MonthGrid {
    /// Build the grid for the month containing `anchor`.
    pub fn build(anchor: DateKey, week_start: WeekStart, today: DateKey, snapshot: &Snapshot) -> Self {
        let first = anchor.first_of_month();
        let start = first.offset_days(-week_start.leading_days(first));

        let cells = (0..GRID_CELLS as i64)
            .map(|i| {
                let date = start.offset_days(i);
                let todos = snapshot.todos_by_date.get(&date);
                GridCell {
                    date,
                    in_month: date.month() == first.month() && date.year() == first.year(),
                    is_today: date == today,
                    todo_count: todos.map_or(0, Vec::len),
                    done_count: todos.map_or(0, |t| t.iter().filter(|t| t.done).count()),
                    has_note: snapshot.notes_by_date.contains_key(&date),
                }
            })
            .collect();

        Self {
            year: first.year(),
            month: first.month(),
            week_start,
            cells,
        }
    }

    pub fn weeks(&self) -> std::slice::Chunks<'_, GridCell> {
        self.cells.chunks(7)
    }

    /// Grid index of `date`, if it is displayed.
    pub fn position(&self, date: DateKey) -> Option<usize> {
        self.cells.iter().position(|c| c.date == date)
    }

    pub fn title(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

impl<B: StorageBackend> Store<B> {
    pub fn month_grid(&self, anchor: DateKey, week_start: WeekStart, today: DateKey) -> MonthGrid {
        MonthGrid::build(anchor, week_start, today, self.snapshot())
    }
}
