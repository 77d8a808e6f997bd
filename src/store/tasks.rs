use std::sync::{Mutex, MutexGuard};

use crate::clock::{Clock, SystemClock};
use crate::core::task::{Task, TaskDraft, TaskField, diff_edit};
use crate::error::{StoreError, TaskError};

use super::{CORRUPT_TASKS_SLOT, KeyValueStore, Loaded, TASKS_SLOT, load_json, save_json};

/// Result of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task: Task,
    pub changed: Vec<TaskField>,
}

/// CRUD over the task list. Every mutation loads the whole list, patches it
/// and writes the whole list back, holding `lock` for the full cycle.
pub struct TaskRepository<S, C = SystemClock> {
    store: S,
    clock: C,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> TaskRepository<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self) -> Result<Vec<Task>, StoreError> {
        match load_json(&self.store, TASKS_SLOT)? {
            Loaded::Absent => Ok(Vec::new()),
            Loaded::Value(tasks) => Ok(tasks),
            Loaded::Malformed { raw, error } => {
                log::warn!(
                    "Task list is unreadable ({}), starting from an empty list; original kept in {}",
                    error,
                    CORRUPT_TASKS_SLOT
                );
                if let Err(e) = self.store.set(CORRUPT_TASKS_SLOT, &raw) {
                    log::error!("Failed to keep unreadable task list: {}", e);
                }
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        save_json(&self.store, TASKS_SLOT, tasks)
    }

    pub fn list(&self) -> Result<Vec<Task>, TaskError> {
        let _guard = self.guard();
        Ok(self.load()?)
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>, TaskError> {
        let _guard = self.guard();
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    pub fn create(&self, draft: &TaskDraft) -> Result<Task, TaskError> {
        let valid = draft.validate()?;

        let _guard = self.guard();
        let mut tasks = self.load()?;
        let task = Task::new(valid, self.clock.now());
        tasks.push(task.clone());
        self.save(&tasks)?;

        log::info!("Created task {} on {}", task.id, task.day);
        Ok(task)
    }

    pub fn update(&self, id: &str, draft: &TaskDraft) -> Result<TaskUpdate, TaskError> {
        let valid = draft.validate()?;

        let _guard = self.guard();
        let mut tasks = self.load()?;
        let Some(slot) = tasks.iter_mut().find(|t| t.id == id) else {
            return Err(TaskError::NotFound(id.to_string()));
        };

        let (updated, changed) = diff_edit(slot, &valid, self.clock.now());
        *slot = updated.clone();
        self.save(&tasks)?;

        log::info!(
            "Updated task {} ({} field(s) changed)",
            id,
            changed.len()
        );
        Ok(TaskUpdate {
            task: updated,
            changed,
        })
    }

    /// Remove every task carrying `id`. Returns how many were removed.
    pub fn delete(&self, id: &str) -> Result<usize, TaskError> {
        let _guard = self.guard();
        let mut tasks = self.load()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        let removed = before - tasks.len();
        if removed == 0 {
            return Err(TaskError::NotFound(id.to_string()));
        }
        self.save(&tasks)?;

        log::info!("Deleted task {}", id);
        Ok(removed)
    }
}
