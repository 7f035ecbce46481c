// SPDX-License-Identifier: MIT OR Apache-2.0
//! The persisted task list.

use crate::storage::{JsonFileStore, TASKS_KEY};
use bubbledo_physics::{Task, TaskId};

/// Ordered list of tasks, mirrored into the store on every change
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    /// Restore the list from the store
    pub fn load(store: &mut JsonFileStore) -> Self {
        let entries = match store.get::<Vec<serde_json::Value>>(TASKS_KEY) {
            Some(entries) => entries,
            None if store.contains(TASKS_KEY) => {
                tracing::warn!("Dropping task list that is not an array");
                store.remove(TASKS_KEY);
                Vec::new()
            }
            None => Vec::new(),
        };

        // Restored entries go through the same rules as typed ones
        let mut list = Self::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let task = match serde_json::from_value::<Task>(entry) {
                Ok(task) => task,
                Err(e) => {
                    tracing::warn!("Skipping unreadable stored task #{}: {}", index, e);
                    continue;
                }
            };
            let text = task.text.trim();
            if text.is_empty() || list.contains(&task.id) {
                tracing::warn!("Skipping invalid stored task {}", task.id);
                continue;
            }
            list.tasks.push(Task::with_id(task.id, text, task.created_at));
        }

        tracing::info!("Restored {} tasks", list.tasks.len());
        list
    }

    /// Add a task from user input; `None` for blank text
    pub fn add(&mut self, text: &str, store: &mut JsonFileStore) -> Option<TaskId> {
        let task = Task::new(text)?;
        let id = task.id.clone();
        tracing::debug!("Added task {}: {:?}", id, task.text);
        self.tasks.push(task);
        self.persist(store);
        Some(id)
    }

    /// Delete a task; `false` if it was already gone
    pub fn remove(&mut self, id: &TaskId, store: &mut JsonFileStore) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            tracing::debug!("Removed task {}", id);
            self.persist(store);
        }
        removed
    }

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Whether a task exists
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.iter().any(|task| &task.id == id)
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    fn persist(&self, store: &mut JsonFileStore) {
        store.set(TASKS_KEY, &self.tasks);
    }
}
