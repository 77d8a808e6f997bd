use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::day::Day;
use crate::error::ValidationError;

/// The task fields whose changes are recorded in the edit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskField {
    Title,
    Description,
    Day,
}

impl TaskField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Day => "day",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Day => "Day",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub timestamp: DateTime<Utc>,
    pub field: TaskField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Stored as the weekday label. Labels outside [`Day::ALL`] survive a
    /// load/save cycle untouched.
    pub day: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edit_history: Vec<EditRecord>,
}

impl Task {
    pub fn new(draft: ValidDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: draft.title,
            description: draft.description,
            day: draft.day.as_label().to_string(),
            created_at: now,
            edit_history: Vec::new(),
        }
    }

    /// The recognized weekday, if the stored label is one.
    pub fn weekday(&self) -> Option<Day> {
        Day::from_label(&self.day)
    }

    /// Most recent edits first, at most `n`.
    pub fn recent_edits(&self, n: usize) -> impl Iterator<Item = &EditRecord> {
        self.edit_history.iter().rev().take(n)
    }
}

/// Raw form input for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub day: Option<Day>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, day: Option<Day>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            day,
        }
    }

    /// Form prefilled from an existing task, as the edit form starts out.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            day: task.weekday(),
        }
    }

    /// Trim and presence-check every field.
    pub fn validate(&self) -> Result<ValidDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        let day = self.day.ok_or(ValidationError::MissingDay)?;
        Ok(ValidDraft {
            title: title.to_string(),
            description: description.to_string(),
            day,
        })
    }
}

/// A draft that passed validation: fields trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    title: String,
    description: String,
    day: Day,
}

impl ValidDraft {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn day(&self) -> Day {
        self.day
    }
}

/// Apply an edit to a task, returning the updated task and the fields that
/// changed. One history entry is appended per changed field, in the order
/// title, description, day. Identity and creation time are kept.
pub fn diff_edit(task: &Task, draft: &ValidDraft, now: DateTime<Utc>) -> (Task, Vec<TaskField>) {
    let mut changed = Vec::new();
    if task.title != draft.title {
        changed.push(TaskField::Title);
    }
    if task.description != draft.description {
        changed.push(TaskField::Description);
    }
    if task.day != draft.day.as_label() {
        changed.push(TaskField::Day);
    }

    let mut updated = task.clone();
    updated.title = draft.title.clone();
    updated.description = draft.description.clone();
    updated.day = draft.day.as_label().to_string();
    updated
        .edit_history
        .extend(changed.iter().map(|&field| EditRecord { timestamp: now, field }));

    (updated, changed)
}
