//! Application state and logic.

use crate::config::Config;
use anyhow::Context;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use daybook_store::{
    Command, DateKey, ExportScope, FileStorage, FocusMode, FocusSettings, FocusTimer, ImportSummary,
    MonthGrid, Outcome, Priority, Stats, StorageBackend, Store, StoreEvent, ThemePreference, TodoId,
    TodoItem,
};
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const DEFAULT_EXPORT_PATH: &str = "daybook-export.json";

/// Application state.
pub struct App {
    /// Todos, notes and theme.
    pub store: Store<FileStorage>,
    /// Focus timer.
    pub focus: FocusTimer,
    focus_storage: FileStorage,
    /// Configuration.
    pub config: Config,
    /// Current view.
    pub view: View,
    /// Focused pane in the calendar view.
    pub pane: Pane,
    pub today: DateKey,
    /// Day whose todos and note are shown.
    pub selected_date: DateKey,
    /// Grid for the month of `selected_date`.
    pub grid: MonthGrid,
    /// Selected row in the visible todo list.
    pub selected_index: usize,
    /// Whether an input prompt is open.
    pub editing: bool,
    pub input_field: InputField,
    pub input_buffer: String,
    /// Priority given to the next added todo.
    pub new_priority: Priority,
    /// Message to display.
    pub message: Option<(String, MessageType)>,
    pub show_help: bool,
    pub confirm_dialog: Option<ConfirmDialog>,
    events: Receiver<StoreEvent>,
    drawn_revision: Option<u64>,
    redraw: bool,
    bell: bool,
    last_tick: Instant,
}

/// Current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Calendar,
    Stats,
    Focus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Calendar,
    Todos,
}

/// What the input prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputField {
    None,
    NewTodo,
    EditTodo(TodoId),
    Note,
    Export(ExportScope),
    Import,
}

impl InputField {
    pub fn title(&self) -> &'static str {
        match self {
            InputField::None => "",
            InputField::NewTodo => " New Todo (Tab: priority) ",
            InputField::EditTodo(_) => " Edit Todo ",
            InputField::Note => " Note ",
            InputField::Export(ExportScope::TodosOnly) => " Export Todos To ",
            InputField::Export(ExportScope::Full) => " Export Everything To ",
            InputField::Import => " Import From ",
        }
    }
}

/// Message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Confirmation dialog.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

#[derive(Debug, Clone)]
pub enum ConfirmAction {
    ClearDone(DateKey),
}

impl App {
    /// Open the configured data directory.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir();
        let storage = FileStorage::open(&data_dir)
            .with_context(|| format!("opening data directory {}", data_dir.display()))?;
        Ok(Self::with_storage(config, storage, DateKey::today()))
    }

    pub fn with_storage(config: Config, storage: FileStorage, today: DateKey) -> Self {
        let mut store = Store::load(storage.clone());
        let (tx, rx) = mpsc::channel();
        store.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });

        let focus = FocusTimer::load(&storage, today);
        let grid = store.month_grid(today, config.calendar.week_start, today);

        Self {
            store,
            focus,
            focus_storage: storage,
            config,
            view: View::Calendar,
            pane: Pane::Calendar,
            today,
            selected_date: today,
            grid,
            selected_index: 0,
            editing: false,
            input_field: InputField::None,
            input_buffer: String::new(),
            new_priority: Priority::Normal,
            message: None,
            show_help: false,
            confirm_dialog: None,
            events: rx,
            drawn_revision: None,
            redraw: true,
            bell: false,
            last_tick: Instant::now(),
        }
    }

    pub fn can_quit(&self) -> bool {
        !self.editing
    }

    // Rendering bookkeeping

    /// True when the store changed or the UI state moved since the last draw.
    pub fn needs_redraw(&self) -> bool {
        self.redraw || self.drawn_revision != Some(self.store.revision())
    }

    pub fn mark_drawn(&mut self) {
        self.redraw = false;
        self.drawn_revision = Some(self.store.revision());
    }

    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Whether a terminal bell is due; clears the request.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    // Queries

    pub fn visible_todos(&self) -> Vec<&TodoItem> {
        self.store
            .todos(self.selected_date)
            .iter()
            .filter(|t| self.config.calendar.show_completed || !t.done)
            .collect()
    }

    pub fn selected_todo(&self) -> Option<&TodoItem> {
        self.visible_todos().get(self.selected_index).copied()
    }

    pub fn stats(&self) -> Stats {
        self.store.stats(self.today)
    }

    fn refresh(&mut self) {
        self.grid = self
            .store
            .month_grid(self.selected_date, self.config.calendar.week_start, self.today);
        let len = self.visible_todos().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
    }

    fn set_message(&mut self, text: impl Into<String>, kind: MessageType) {
        // A save failure from the same action stays visible.
        if matches!(self.message, Some((_, MessageType::Error))) && kind != MessageType::Error {
            return;
        }
        self.message = Some((text.into(), kind));
    }

    // Store access

    /// Send a command to the store and react to what it reports.
    pub fn dispatch(&mut self, command: Command) -> Outcome {
        let outcome = self.store.dispatch(command);
        self.drain_events();
        if let Outcome::Rejected(reason) = &outcome {
            self.set_message(reason.message(), MessageType::Warning);
        }
        self.refresh();
        outcome
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                StoreEvent::SaveFailed { message } => {
                    self.store.take_save_error();
                    self.set_message(format!("Not saved: {}", message), MessageType::Error);
                }
                StoreEvent::ThemeChanged(theme) => {
                    self.set_message(
                        format!("Theme: {}", ThemePreference::label(theme)),
                        MessageType::Info,
                    );
                }
                StoreEvent::Changed { .. } | StoreEvent::Imported => {}
            }
            self.redraw = true;
        }
    }

    // Key handling

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.redraw = true;
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.confirm_dialog.is_some() {
            self.handle_confirm_key(key);
            return;
        }

        if self.editing {
            self.handle_input_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('1') => self.view = View::Calendar,
            KeyCode::Char('2') => self.view = View::Stats,
            KeyCode::Char('3') => self.view = View::Focus,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('T') => {
                let next = ThemePreference::cycle(self.store.theme());
                self.dispatch(Command::SetTheme(next));
            }
            KeyCode::Char('E') => {
                self.start_input(InputField::Export(ExportScope::TodosOnly), DEFAULT_EXPORT_PATH)
            }
            KeyCode::Char('B') => self.start_input(InputField::Export(ExportScope::Full), DEFAULT_EXPORT_PATH),
            KeyCode::Char('I') => self.start_input(InputField::Import, DEFAULT_EXPORT_PATH),
            _ => match self.view {
                View::Calendar => self.handle_calendar_key(key),
                View::Stats => {}
                View::Focus => self.handle_focus_key(key),
            },
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => {
                self.pane = match self.pane {
                    Pane::Calendar => Pane::Todos,
                    Pane::Todos => Pane::Calendar,
                };
            }
            KeyCode::Char('t') => self.select_date(self.today),
            KeyCode::Char('a') => self.start_input(InputField::NewTodo, ""),
            KeyCode::Char('n') => {
                let note = self.store.note(self.selected_date).to_string();
                self.start_input(InputField::Note, &note);
            }
            KeyCode::Char('p') => self.new_priority = self.new_priority.next(),
            KeyCode::Char('[') => self.select_date(self.selected_date.offset_months(-1)),
            KeyCode::Char(']') => self.select_date(self.selected_date.offset_months(1)),
            _ => match self.pane {
                Pane::Calendar => self.handle_grid_key(key),
                Pane::Todos => self.handle_todo_key(key),
            },
        }
    }

    fn handle_grid_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.select_date(self.selected_date.offset_days(-1)),
            KeyCode::Char('l') | KeyCode::Right => self.select_date(self.selected_date.offset_days(1)),
            KeyCode::Char('k') | KeyCode::Up => self.select_date(self.selected_date.offset_days(-7)),
            KeyCode::Char('j') | KeyCode::Down => self.select_date(self.selected_date.offset_days(7)),
            KeyCode::Enter => self.pane = Pane::Todos,
            _ => {}
        }
    }

    fn handle_todo_key(&mut self, key: KeyEvent) {
        let date = self.selected_date;
        match key.code {
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => self.pane = Pane::Calendar,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char(' ') | KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    self.dispatch(Command::ToggleTodo { date, id });
                }
            }
            KeyCode::Char('e') => {
                if let Some(todo) = self.selected_todo() {
                    let (id, text) = (todo.id.clone(), todo.text.clone());
                    self.start_input(InputField::EditTodo(id), &text);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    if self.dispatch(Command::RemoveTodo { date, id }).changed() {
                        self.set_message("Todo deleted", MessageType::Success);
                    }
                }
            }
            KeyCode::Char('J') => self.move_selected(1),
            KeyCode::Char('K') => self.move_selected(-1),
            KeyCode::Char('C') => {
                let done = self.store.todos(date).iter().filter(|t| t.done).count();
                if done == 0 {
                    self.set_message("Nothing completed to clear", MessageType::Info);
                } else {
                    self.confirm_dialog = Some(ConfirmDialog {
                        title: "Clear Completed".to_string(),
                        message: format!("Remove {} completed todo(s) from {}?", done, date),
                        action: ConfirmAction::ClearDone(date),
                    });
                }
            }
            _ => {}
        }
    }

    fn handle_focus_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(' ') => self.focus.toggle(),
            KeyCode::Char('r') => self.focus.reset(),
            KeyCode::Char('s') => {
                let next = self.focus.skip();
                self.set_message(format!("Skipped to {}", next.name()), MessageType::Info);
            }
            KeyCode::Char('m') => {
                let next = match self.focus.mode() {
                    FocusMode::Focus => FocusMode::ShortBreak,
                    FocusMode::ShortBreak => FocusMode::LongBreak,
                    FocusMode::LongBreak => FocusMode::Focus,
                };
                if !self.focus.set_mode(next) {
                    self.set_message("Pause the timer to switch mode", MessageType::Warning);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_focus_length(1),
            KeyCode::Char('-') => self.adjust_focus_length(-1),
            KeyCode::Char('o') => {
                let mut settings = self.focus.settings().clone();
                settings.sound_enabled = !settings.sound_enabled;
                self.update_focus_settings(settings);
            }
            KeyCode::Char('b') => {
                let mut settings = self.focus.settings().clone();
                settings.auto_start_breaks = !settings.auto_start_breaks;
                self.update_focus_settings(settings);
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_input(),
            KeyCode::Enter => self.finish_input(),
            KeyCode::Tab if self.input_field == InputField::NewTodo => {
                self.new_priority = self.new_priority.next();
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input_buffer.clear();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.confirm_dialog.take() else {
            return;
        };
        if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter) {
            return;
        }
        match dialog.action {
            ConfirmAction::ClearDone(date) => {
                if self.dispatch(Command::ClearDone { date }).changed() {
                    self.set_message("Completed todos cleared", MessageType::Success);
                }
            }
        }
    }

    // Actions

    fn select_date(&mut self, date: DateKey) {
        if date != self.selected_date {
            self.selected_date = date;
            self.selected_index = 0;
        }
        self.refresh();
    }

    fn selected_id(&self) -> Option<TodoId> {
        self.selected_todo().map(|t| t.id.clone())
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible_todos().len();
        if len == 0 {
            return;
        }
        let idx = self.selected_index as isize + delta;
        self.selected_index = idx.clamp(0, len as isize - 1) as usize;
    }

    /// Keyboard equivalent of dragging the selected todo past its visible
    /// neighbour. Hidden completed todos keep their stored places.
    fn move_selected(&mut self, delta: isize) {
        let visible: Vec<TodoId> = self.visible_todos().iter().map(|t| t.id.clone()).collect();
        let Some(id) = visible.get(self.selected_index).cloned() else {
            return;
        };
        let target = (self.selected_index as isize + delta).clamp(0, visible.len() as isize - 1) as usize;
        if target == self.selected_index {
            return;
        }
        let neighbour = &visible[target];

        let date = self.selected_date;
        let mut ids: Vec<TodoId> = self
            .store
            .todos(date)
            .iter()
            .map(|t| t.id.clone())
            .filter(|i| *i != id)
            .collect();
        let Some(pos) = ids.iter().position(|i| i == neighbour) else {
            return;
        };
        let insert_at = if delta > 0 { pos + 1 } else { pos };
        ids.insert(insert_at, id.clone());

        if self.dispatch(Command::Reorder { date, ids }).changed() {
            if let Some(pos) = self.visible_todos().iter().position(|t| t.id == id) {
                self.selected_index = pos;
            }
        }
    }

    fn start_input(&mut self, field: InputField, initial: &str) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer = initial.to_string();
    }

    fn cancel_input(&mut self) {
        self.editing = false;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    fn finish_input(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        let field = std::mem::replace(&mut self.input_field, InputField::None);
        self.editing = false;
        let date = self.selected_date;

        match field {
            InputField::None => {}
            InputField::NewTodo => {
                let command = Command::AddTodo { date, text, priority: self.new_priority };
                if let Outcome::Added(item) = self.dispatch(command) {
                    self.pane = Pane::Todos;
                    self.selected_index = 0;
                    self.set_message(format!("Added: {}", item.text), MessageType::Success);
                }
            }
            InputField::EditTodo(id) => {
                if self.dispatch(Command::EditTodo { date, id, text }).changed() {
                    self.set_message("Todo updated", MessageType::Success);
                }
            }
            InputField::Note => {
                if self.dispatch(Command::SetNote { date, text }).changed() {
                    self.set_message("Note saved", MessageType::Success);
                }
            }
            InputField::Export(scope) => self.export_to(text.trim(), scope),
            InputField::Import => self.import_from(text.trim()),
        }
    }

    fn export_to(&mut self, path: &str, scope: ExportScope) {
        if path.is_empty() {
            self.set_message("Path cannot be empty", MessageType::Warning);
            return;
        }
        match write_export(&self.store, Path::new(path), scope) {
            Ok(()) => self.set_message(format!("Exported to {}", path), MessageType::Success),
            Err(e) => {
                warn!(error = %e, path, "export failed");
                self.set_message(format!("Export failed: {:#}", e), MessageType::Error);
            }
        }
    }

    fn import_from(&mut self, path: &str) {
        if path.is_empty() {
            self.set_message("Path cannot be empty", MessageType::Warning);
            return;
        }
        match read_import(&mut self.store, Path::new(path)) {
            Ok(summary) => {
                self.drain_events();
                self.refresh();
                self.set_message(summary.to_string(), MessageType::Success);
            }
            Err(e) => {
                warn!(error = %e, path, "import failed");
                self.set_message(format!("Import failed: {:#}", e), MessageType::Error);
            }
        }
    }

    fn adjust_focus_length(&mut self, delta: i32) {
        let mut settings = self.focus.settings().clone();
        let minutes = match self.focus.mode() {
            FocusMode::Focus => &mut settings.focus_mins,
            FocusMode::ShortBreak => &mut settings.short_break_mins,
            FocusMode::LongBreak => &mut settings.long_break_mins,
        };
        *minutes = (*minutes as i32 + delta).clamp(1, 180) as u32;
        self.update_focus_settings(settings);
    }

    fn update_focus_settings(&mut self, settings: FocusSettings) {
        self.focus.set_settings(settings);
        match self.focus.save_settings(&mut self.focus_storage) {
            Ok(()) => self.set_message("Settings saved", MessageType::Success),
            Err(e) => {
                warn!(error = %e, "saving focus settings failed");
                self.set_message(format!("Not saved: {}", e), MessageType::Error);
            }
        }
    }

    // Clock

    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.advance_clock(elapsed, DateKey::today());
    }

    /// Advance the focus timer and follow the date when midnight passes.
    pub fn advance_clock(&mut self, elapsed: Duration, today: DateKey) {
        if today != self.today {
            info!(%today, "day changed");
            self.today = today;
            if self.focus.roll_over(today) {
                self.save_focus_stats();
            }
            self.refresh();
            self.redraw = true;
        }

        if !self.focus.is_running() {
            return;
        }
        self.redraw = true;

        if let Some(done) = self.focus.advance(elapsed) {
            self.set_message(done.message(), MessageType::Success);
            if self.focus.settings().sound_enabled {
                self.bell = true;
            }
            self.save_focus_stats();
        }
    }

    fn save_focus_stats(&mut self) {
        if let Err(e) = self.focus.save_stats(&mut self.focus_storage) {
            warn!(error = %e, "saving focus stats failed");
            self.set_message(format!("Not saved: {}", e), MessageType::Error);
        }
    }

    /// Final flush before exit.
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        if self.store.is_dirty() {
            self.store.save().context("saving store on exit")?;
        }
        self.focus
            .save_stats(&mut self.focus_storage)
            .context("saving focus stats on exit")?;
        Ok(())
    }
}

/// Write an export file for `store`.
pub fn write_export<B: StorageBackend>(store: &Store<B>, path: &Path, scope: ExportScope) -> anyhow::Result<()> {
    let json = store.export_json(scope)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), ?scope, "exported");
    Ok(())
}

/// Read an export file and import it into `store`.
pub fn read_import<B: StorageBackend>(store: &mut Store<B>, path: &Path) -> anyhow::Result<ImportSummary> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let summary = store.import_json(&raw)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn day() -> DateKey {
        DateKey::from_ymd(2024, 6, 12).unwrap()
    }

    fn app_in(dir: &Path) -> App {
        App::with_storage(Config::default(), FileStorage::open(dir).unwrap(), day())
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add(app: &mut App, text: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, text);
        press(app, KeyCode::Enter);
    }

    fn texts(app: &App) -> Vec<String> {
        app.visible_todos().iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn test_add_todo_from_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());

        press(&mut app, KeyCode::Char('a'));
        assert!(app.editing);
        assert!(!app.can_quit());
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);

        assert!(!app.editing);
        assert_eq!(app.pane, Pane::Todos);
        let todos = app.store.todos(day());
        assert_eq!(todos[0].text, "Buy milk");
        assert_eq!(todos[0].priority, Priority::Low);
        assert!(matches!(app.message, Some((_, MessageType::Success))));
    }

    #[test]
    fn test_blank_todo_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        add(&mut app, "   ");
        assert!(app.store.todos(day()).is_empty());
        assert_eq!(
            app.message,
            Some(("Text cannot be empty".to_string(), MessageType::Warning))
        );
    }

    #[test]
    fn test_toggle_move_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        add(&mut app, "c");
        add(&mut app, "b");
        add(&mut app, "a");
        assert_eq!(texts(&app), vec!["a", "b", "c"]);

        press(&mut app, KeyCode::Char('J'));
        assert_eq!(texts(&app), vec!["b", "a", "c"]);
        assert_eq!(app.selected_index, 1);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.store.todos(day())[1].done);

        press(&mut app, KeyCode::Char('C'));
        assert!(app.confirm_dialog.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(texts(&app).len(), 3);

        press(&mut app, KeyCode::Char('C'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(texts(&app), vec!["b", "c"]);
        assert_eq!(app.selected_index, 1);
    }

    #[test]
    fn test_move_skips_hidden_completed_todos() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.calendar.show_completed = false;
        let mut app = App::with_storage(config, FileStorage::open(dir.path()).unwrap(), day());
        add(&mut app, "c");
        add(&mut app, "done");
        add(&mut app, "a");
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(texts(&app), vec!["a", "c"]);

        let before = app.store.revision();
        press(&mut app, KeyCode::Char('J'));
        assert_eq!(texts(&app), vec!["c", "a"]);
        assert_eq!(app.selected_index, 1);
        assert_eq!(app.store.revision(), before + 1);
        let stored: Vec<&str> = app.store.todos(day()).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(stored, vec!["done", "c", "a"]);

        press(&mut app, KeyCode::Char('K'));
        assert_eq!(texts(&app), vec!["a", "c"]);
        assert_eq!(app.selected_index, 0);

        let before = app.store.revision();
        press(&mut app, KeyCode::Char('K'));
        assert_eq!(app.store.revision(), before);
    }

    #[test]
    fn test_edit_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        add(&mut app, "draft");

        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.input_buffer, "draft");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "w!");
        press(&mut app, KeyCode::Enter);
        assert_eq!(texts(&app), vec!["draw!"]);

        press(&mut app, KeyCode::Char('d'));
        assert!(texts(&app).is_empty());
    }

    #[test]
    fn test_hidden_completed_todos() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.calendar.show_completed = false;
        let mut app = App::with_storage(config, FileStorage::open(dir.path()).unwrap(), day());
        add(&mut app, "b");
        add(&mut app, "a");
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(texts(&app), vec!["b"]);
        assert_eq!(app.store.todos(day()).len(), 2);
    }

    #[test]
    fn test_note_prefills_existing_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "call bank");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.note(day()), "call bank");

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.input_buffer, "call bank");
        press(&mut app, KeyCode::Esc);
        assert!(!app.editing);
    }

    #[test]
    fn test_calendar_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());

        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.selected_date.to_string(), "2024-06-13");
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_date.to_string(), "2024-06-20");
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.selected_date.to_string(), "2024-07-20");
        assert_eq!(app.grid.month, 7);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.selected_date, day());
        assert_eq!(app.grid.month, 6);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let mut app = app_in(&data);
        std::fs::remove_dir_all(&data).unwrap();

        add(&mut app, "kept in memory");
        assert_eq!(texts(&app), vec!["kept in memory"]);
        assert!(app.store.is_dirty());
        let (text, kind) = app.message.clone().unwrap();
        assert_eq!(kind, MessageType::Error);
        assert!(text.starts_with("Not saved"));
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_in(dir.path());
            add(&mut app, "persisted");
            press(&mut app, KeyCode::Char('T'));
            app.shutdown().unwrap();
        }
        let app = app_in(dir.path());
        assert_eq!(texts(&app), vec!["persisted"]);
        assert_eq!(app.store.theme(), Some(ThemePreference::Dark));
    }

    #[test]
    fn test_export_then_import_into_other_store() {
        let dir = tempfile::tempdir().unwrap();
        let export_path = dir.path().join("out.json");
        let mut source = app_in(&dir.path().join("a"));
        add(&mut source, "travel");
        press(&mut source, KeyCode::Char('B'));
        source.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(source.input_buffer.is_empty());
        type_text(&mut source, export_path.to_str().unwrap());
        press(&mut source, KeyCode::Enter);
        assert!(export_path.exists());

        let mut target = app_in(&dir.path().join("b"));
        press(&mut target, KeyCode::Char('I'));
        target.input_buffer = export_path.to_string_lossy().into_owned();
        press(&mut target, KeyCode::Enter);
        assert_eq!(texts(&target), vec!["travel"]);
        assert!(matches!(target.message, Some((_, MessageType::Success))));

        press(&mut target, KeyCode::Char('I'));
        target.input_buffer = dir.path().join("missing.json").to_string_lossy().into_owned();
        press(&mut target, KeyCode::Enter);
        assert!(matches!(target.message, Some((_, MessageType::Error))));
        assert_eq!(texts(&target), vec!["travel"]);
    }

    #[test]
    fn test_focus_completion_rings_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char(' '));
        assert!(app.focus.is_running());

        app.advance_clock(Duration::from_secs(25 * 60), day());
        assert_eq!(app.focus.mode(), FocusMode::ShortBreak);
        assert!(app.take_bell());
        assert!(!app.take_bell());
        assert_eq!(
            app.message,
            Some((
                "Focus session completed! Time for a break.".to_string(),
                MessageType::Success
            ))
        );

        let reloaded = FocusTimer::load(&FileStorage::open(dir.path()).unwrap(), day());
        assert_eq!(reloaded.stats().today_sessions, 1);
    }

    #[test]
    fn test_focus_settings_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.focus.format_remaining(), "26:00");

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.focus.mode(), FocusMode::Focus);
        assert!(matches!(app.message, Some((_, MessageType::Warning))));

        let reloaded = FocusTimer::load(&FileStorage::open(dir.path()).unwrap(), day());
        assert_eq!(reloaded.settings().focus_mins, 26);
    }

    #[test]
    fn test_day_change_rolls_focus_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.focus.start();
        app.advance_clock(Duration::from_secs(25 * 60), day());
        assert_eq!(app.focus.stats().today_sessions, 1);

        let tomorrow = day().offset_days(1);
        app.advance_clock(Duration::ZERO, tomorrow);
        assert_eq!(app.today, tomorrow);
        assert_eq!(app.focus.stats().today_sessions, 0);
        assert_eq!(app.focus.stats().total_sessions, 1);
    }

    #[test]
    fn test_redraw_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        assert!(app.needs_redraw());
        app.mark_drawn();
        assert!(!app.needs_redraw());

        app.dispatch(Command::SetNote { date: day(), text: "x".into() });
        assert!(app.needs_redraw());
        app.mark_drawn();

        app.advance_clock(Duration::from_secs(1), day());
        assert!(!app.needs_redraw());
    }
}
