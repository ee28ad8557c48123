//! Export and import of store data as user-facing JSON files.
//!
//! A todos-only export carries `version` and `todosByDate`. A full export
//! adds `notesByDate` and `theme`. Import accepts either: every section that
//! is present replaces the stored one wholesale, absent sections are kept.

use crate::backend::StorageBackend;
use crate::date_key::DateKey;
use crate::error::{StoreError, StoreResult};
use crate::models::{ThemePreference, TodoItem};
use crate::store::{Store, StoreEvent};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::info;

/// Format version written into export files.
pub const EXPORT_VERSION: &str = "1";

/// What an export contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    #[default]
    TodosOnly,
    Full,
}

/// Export file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: String,
    pub todos_by_date: BTreeMap<DateKey, Vec<TodoItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_by_date: Option<BTreeMap<DateKey, String>>,
    /// `Some(None)` is written as `"theme": null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Option<ThemePreference>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportFile {
    #[serde(default)]
    version: Option<serde_json::Value>,
    #[serde(default)]
    todos_by_date: Option<BTreeMap<DateKey, Vec<TodoItem>>>,
    #[serde(default)]
    notes_by_date: Option<BTreeMap<DateKey, String>>,
    #[serde(default, deserialize_with = "present")]
    theme: Option<Option<ThemePreference>>,
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What an import replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Number of dates and todos imported, if todos were replaced.
    pub todos: Option<(usize, usize)>,
    /// Number of notes imported, if notes were replaced.
    pub notes: Option<usize>,
    pub theme: bool,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some((dates, todos)) = self.todos {
            parts.push(format!("{} todos on {} days", todos, dates));
        }
        if let Some(notes) = self.notes {
            parts.push(format!("{} notes", notes));
        }
        if self.theme {
            parts.push("theme".to_string());
        }
        write!(f, "Imported {}", parts.join(", "))
    }
}

impl<B: StorageBackend> Store<B> {
    pub fn export(&self, scope: ExportScope) -> ExportFile {
        let snapshot = self.snapshot();
        let full = scope == ExportScope::Full;
        ExportFile {
            version: EXPORT_VERSION.to_string(),
            todos_by_date: snapshot.todos_by_date.clone(),
            notes_by_date: full.then(|| snapshot.notes_by_date.clone()),
            theme: full.then_some(snapshot.theme),
        }
    }

    pub fn export_json(&self, scope: ExportScope) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.export(scope))?)
    }

    /// Validate and apply an export file. On any error the store is left
    /// untouched.
    pub fn import_json(&mut self, raw: &str) -> StoreResult<ImportSummary> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(StoreError::invalid_import("expected a JSON object"));
        }

        let file: ImportFile =
            serde_json::from_value(value).map_err(|e| StoreError::invalid_import(e.to_string()))?;

        check_version(file.version.as_ref())?;
        if file.todos_by_date.is_none() && file.notes_by_date.is_none() && file.theme.is_none() {
            return Err(StoreError::invalid_import(
                "no todosByDate, notesByDate or theme section",
            ));
        }
        if let Some(todos) = &file.todos_by_date {
            validate_todos(todos)?;
        }

        let mut summary = ImportSummary::default();
        if let Some(todos) = file.todos_by_date {
            let count = todos.values().map(Vec::len).sum();
            summary.todos = Some((todos.len(), count));
            self.snapshot.todos_by_date = todos;
        }
        if let Some(notes) = file.notes_by_date {
            summary.notes = Some(notes.len());
            self.snapshot.notes_by_date = notes;
        }
        if let Some(theme) = file.theme {
            summary.theme = true;
            self.snapshot.theme = theme;
        }

        info!(summary = %summary, "import applied");
        self.commit(StoreEvent::Imported);
        Ok(summary)
    }
}

fn check_version(version: Option<&serde_json::Value>) -> StoreResult<()> {
    match version {
        None => Ok(()),
        Some(serde_json::Value::String(s)) if s == EXPORT_VERSION => Ok(()),
        Some(serde_json::Value::Number(n)) if n.as_u64() == Some(1) => Ok(()),
        Some(other) => Err(StoreError::UnsupportedVersion(other.to_string())),
    }
}

fn validate_todos(todos: &BTreeMap<DateKey, Vec<TodoItem>>) -> StoreResult<()> {
    for (date, items) in todos {
        let mut seen = HashSet::new();
        for item in items {
            if item.text.trim().is_empty() {
                return Err(StoreError::invalid_import(format!("empty todo text on {}", date)));
            }
            if !seen.insert(&item.id) {
                return Err(StoreError::invalid_import(format!(
                    "duplicate todo id `{}` on {}",
                    item.id, date
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;
    use crate::models::{Priority, TodoId};

    fn day(d: u32) -> DateKey {
        DateKey::from_ymd(2024, 6, d).unwrap()
    }

    fn seeded() -> Store<MemoryStorage> {
        let mut store = Store::load(MemoryStorage::new());
        store.add_todo(day(1), "existing", Priority::Normal);
        store.set_note(day(1), "keep me");
        store.set_theme(Some(ThemePreference::Dark));
        store
    }

    #[test]
    fn test_todos_only_export_format() {
        let mut store = Store::load(MemoryStorage::new());
        store.snapshot.todos_by_date.insert(
            day(1),
            vec![TodoItem {
                id: TodoId::from("t-1"),
                text: "Water plants".into(),
                done: false,
                priority: Priority::High,
            }],
        );
        store.snapshot.notes_by_date.insert(day(1), "not exported".into());

        let json = store.export_json(ExportScope::TodosOnly).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "version": "1",
          "todosByDate": {
            "2024-06-01": [
              {
                "id": "t-1",
                "text": "Water plants",
                "done": false,
                "priority": "high"
              }
            ]
          }
        }
        "#);
    }

    #[test]
    fn test_full_export_has_all_sections() {
        let store = seeded();
        let value: serde_json::Value =
            serde_json::from_str(&store.export_json(ExportScope::Full).unwrap()).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["notesByDate"]["2024-06-01"], "keep me");
        assert_eq!(value["theme"], "dark");
    }

    #[test]
    fn test_full_round_trip() {
        let source = seeded();
        let json = source.export_json(ExportScope::Full).unwrap();

        let mut target = Store::load(MemoryStorage::new());
        let summary = target.import_json(&json).unwrap();
        assert_eq!(summary.todos, Some((1, 1)));
        assert_eq!(summary.notes, Some(1));
        assert!(summary.theme);
        assert_eq!(target.snapshot(), source.snapshot());
    }

    #[test]
    fn test_todos_only_import_keeps_notes_and_theme() {
        let mut store = seeded();
        let raw = r#"{"version":"1","todosByDate":{"2024-06-02":[{"id":"x","text":"new","done":true,"priority":"low"}]}}"#;

        let summary = store.import_json(raw).unwrap();
        assert_eq!(summary.todos, Some((1, 1)));
        assert!(summary.notes.is_none());
        // Replaced wholesale, not merged per date.
        assert!(store.todos(day(1)).is_empty());
        assert_eq!(store.todos(day(2))[0].text, "new");
        assert_eq!(store.note(day(1)), "keep me");
        assert_eq!(store.theme(), Some(ThemePreference::Dark));
    }

    #[test]
    fn test_explicit_null_theme_resets_to_system() {
        let mut store = seeded();
        let summary = store.import_json(r#"{"theme": null}"#).unwrap();
        assert!(summary.theme);
        assert_eq!(store.theme(), None);
        assert_eq!(store.todos(day(1)).len(), 1);
    }

    #[test]
    fn test_import_persists() {
        let mut store = Store::load(MemoryStorage::new());
        store.import_json(r#"{"notesByDate": {"2024-06-05": "saved"}}"#).unwrap();
        let fresh = Store::load(store.into_backend());
        assert_eq!(fresh.note(day(5)), "saved");
    }

    #[test]
    fn test_invalid_imports_leave_store_unchanged() {
        let mut store = seeded();
        let before = store.snapshot().clone();
        let revision = store.revision();

        let cases = [
            "{broken",
            "[1, 2, 3]",
            r#"{"hello": "world"}"#,
            r#"{"version": "2", "todosByDate": {}}"#,
            r#"{"todosByDate": {"June 1st": []}}"#,
            r#"{"todosByDate": {"2024-06-01": [{"id": "a", "text": "  "}]}}"#,
            r#"{"todosByDate": {"2024-06-01": [{"id": "a", "text": "x"}, {"id": "a", "text": "y"}]}}"#,
            r#"{"todosByDate": {"2024-06-01": [{"text": "no id"}]}, "notesByDate": {}}"#,
        ];
        for raw in cases {
            assert!(store.import_json(raw).is_err(), "accepted {}", raw);
        }

        assert_eq!(store.snapshot(), &before);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_error_kinds() {
        let mut store = Store::load(MemoryStorage::new());
        assert!(matches!(store.import_json("nope"), Err(StoreError::Json(_))));
        assert!(matches!(
            store.import_json(r#"{"version": 3, "theme": null}"#),
            Err(StoreError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            store.import_json(r#"{"version": "1"}"#),
            Err(StoreError::InvalidImport(_))
        ));
        assert!(store.import_json(r#"{"version": 1, "theme": "light"}"#).is_ok());
    }

    #[test]
    fn test_summary_message() {
        let summary = ImportSummary {
            todos: Some((2, 5)),
            notes: Some(1),
            theme: true,
        };
        assert_eq!(summary.to_string(), "Imported 5 todos on 2 days, 1 notes, theme");
    }
}
