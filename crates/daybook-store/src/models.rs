//! Data models for the daybook store.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque todo identifier.
///
/// Fresh ids are UUID v4 strings. Ids written by older exports may be JSON
/// numbers; those are read back as their decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TodoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TodoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TodoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// Todo priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Normal => "Normal",
            Priority::Low => "Low",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Priority::High => "●",
            Priority::Normal => "◐",
            Priority::Low => "○",
        }
    }

    /// Cycle used by the priority picker.
    pub fn next(&self) -> Priority {
        match self {
            Priority::High => Priority::Normal,
            Priority::Normal => Priority::Low,
            Priority::Low => Priority::High,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A single todo on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub priority: Priority,
}

impl TodoItem {
    /// Create a new open item with a fresh id.
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: TodoId::generate(),
            text: text.into(),
            done: false,
            priority,
        }
    }

    pub fn toggle(&mut self) {
        self.done = !self.done;
    }

    pub fn checkbox(&self) -> &'static str {
        if self.done {
            "[x]"
        } else {
            "[ ]"
        }
    }
}

/// Explicit theme choice. The store keeps `Option<ThemePreference>`,
/// where `None` means follow the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Dark,
    Light,
}

impl ThemePreference {
    /// Cycle dark -> light -> system -> dark.
    pub fn cycle(current: Option<ThemePreference>) -> Option<ThemePreference> {
        match current {
            Some(ThemePreference::Dark) => Some(ThemePreference::Light),
            Some(ThemePreference::Light) => None,
            None => Some(ThemePreference::Dark),
        }
    }

    pub fn label(pref: Option<ThemePreference>) -> &'static str {
        match pref {
            Some(ThemePreference::Dark) => "dark",
            Some(ThemePreference::Light) => "light",
            None => "system",
        }
    }
}
