//! Typed commands produced by the UI and applied to the store.

use crate::backend::StorageBackend;
use crate::date_key::DateKey;
use crate::models::{Priority, ThemePreference, TodoId, TodoItem};
use crate::store::Store;

/// A user intent against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTodo { date: DateKey, text: String, priority: Priority },
    EditTodo { date: DateKey, id: TodoId, text: String },
    ToggleTodo { date: DateKey, id: TodoId },
    RemoveTodo { date: DateKey, id: TodoId },
    ClearDone { date: DateKey },
    Reorder { date: DateKey, ids: Vec<TodoId> },
    MoveTodo { date: DateKey, id: TodoId, delta: isize },
    SetNote { date: DateKey, text: String },
    SetTheme(Option<ThemePreference>),
}

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyText,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::EmptyText => "Text cannot be empty",
        }
    }
}

/// Result of dispatching a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(TodoItem),
    Changed,
    Unchanged,
    Rejected(Rejection),
}

impl Outcome {
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Added(_) | Outcome::Changed)
    }

    fn from_flag(changed: bool) -> Self {
        if changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }
}

impl<B: StorageBackend> Store<B> {
    /// Apply a command. Unknown ids are an `Unchanged` outcome, not an error.
    pub fn dispatch(&mut self, command: Command) -> Outcome {
        match command {
            Command::AddTodo { date, text, priority } => match self.add_todo(date, &text, priority) {
                Some(item) => Outcome::Added(item),
                None => Outcome::Rejected(Rejection::EmptyText),
            },
            Command::EditTodo { date, id, text } => {
                if text.trim().is_empty() {
                    Outcome::Rejected(Rejection::EmptyText)
                } else {
                    Outcome::from_flag(self.edit_todo(date, &id, &text))
                }
            }
            Command::ToggleTodo { date, id } => Outcome::from_flag(self.toggle_todo(date, &id)),
            Command::RemoveTodo { date, id } => Outcome::from_flag(self.remove_todo(date, &id)),
            Command::ClearDone { date } => Outcome::from_flag(self.clear_done(date) > 0),
            Command::Reorder { date, ids } => Outcome::from_flag(self.reorder(date, &ids)),
            Command::MoveTodo { date, id, delta } => Outcome::from_flag(self.move_todo(date, &id, delta)),
            Command::SetNote { date, text } => Outcome::from_flag(self.set_note(date, &text)),
            Command::SetTheme(theme) => Outcome::from_flag(self.set_theme(theme)),
        }
    }
}
