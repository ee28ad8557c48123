//! Storage and domain logic for Daybook.
//!
//! Daybook keeps an ordered todo list and a free-text note for every
//! calendar day, plus a theme preference and a focus timer. This crate owns
//! that state and its persistence; presentation lives in the app.
//!
//! # Features
//!
//! - **Store**: date-keyed todos and notes, persisted as one JSON blob
//! - **Commands**: typed mutations with an [`Outcome`] for the caller
//! - **Change tracking**: subscriptions, a revision counter and a dirty flag
//! - **Transfer**: todos-only and full export/import files
//! - **Calendar**: 42-cell month grids
//! - **Focus timer**: Pomodoro cycle with daily statistics

pub mod backend;
pub mod calendar;
pub mod command;
pub mod date_key;
pub mod error;
pub mod focus;
pub mod models;
pub mod stats;
pub mod store;
pub mod transfer;

// Re-exports
pub use backend::{FileStorage, MemoryStorage, StorageBackend};
pub use calendar::{GridCell, MonthGrid, WeekStart, GRID_CELLS};
pub use command::{Command, Outcome, Rejection};
pub use date_key::DateKey;
pub use error::{StoreError, StoreResult};
pub use focus::{FocusMode, FocusSettings, FocusStats, FocusTimer, SessionComplete, TimerState};
pub use models::{Priority, ThemePreference, TodoId, TodoItem};
pub use stats::{PriorityCounts, Stats};
pub use store::{Snapshot, Store, StoreEvent, SubscriptionId, STATE_KEY};
pub use transfer::{ExportFile, ExportScope, ImportSummary};
