use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::io::persisted::Persisted;
use crate::io::storage::{Storage, VISITED_KEY};
use crate::model::task::Task;
use crate::notice::{Notice, Notifier};
use crate::ops::task_ops::{Clock, IdSource, TaskCollection, TaskError, TaskInput, TaskPatch};
use crate::ops::view::{self, Counts, EmptyState, Filter};

/// The task list as one owned object: the collection, its storage, the
/// active filter and the notice sink. Views are derived on request from
/// the current list and filter, never cached.
pub struct Board {
    tasks: TaskCollection,
    visited: Persisted<bool>,
    filter: Filter,
    notifier: Box<dyn Notifier>,
}

impl Board {
    pub fn open(
        storage: Rc<dyn Storage>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdSource>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let visited = Persisted::load(storage.clone(), VISITED_KEY, false);
        let tasks = TaskCollection::open(storage, clock, ids);
        tracing::debug!(tasks = tasks.len(), "board opened");
        Board {
            tasks,
            visited,
            filter: Filter::All,
            notifier,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.tasks.now()
    }

    pub fn is_degraded(&self) -> bool {
        self.tasks.is_degraded()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Filtered, sorted view for the active filter
    pub fn view(&self) -> Vec<&Task> {
        view::derive_view(self.tasks(), self.filter)
    }

    pub fn counts(&self) -> Counts {
        view::counts(self.tasks())
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        view::empty_state(&self.view(), self.filter)
    }

    pub fn create(&mut self, input: TaskInput) -> Result<Task, TaskError> {
        let task = self.tasks.create(input)?;
        tracing::debug!(id = %task.id, "task created");
        self.notifier.notify(&Notice::created());
        Ok(task)
    }

    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>, TaskError> {
        let updated = self.tasks.update(id, patch)?;
        match &updated {
            Some(task) => {
                tracing::debug!(id = %task.id, "task updated");
                self.notifier.notify(&Notice::updated());
            }
            None => tracing::debug!(id, "update ignored, no such task"),
        }
        Ok(updated)
    }

    pub fn toggle_complete(&mut self, id: &str) -> Option<Task> {
        let toggled = self.tasks.toggle_complete(id);
        if toggled.is_none() {
            tracing::debug!(id, "toggle ignored, no such task");
        }
        toggled
    }

    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let removed = self.tasks.delete(id);
        match &removed {
            Some(task) => {
                tracing::debug!(id = %task.id, "task deleted");
                self.notifier.notify(&Notice::deleted());
            }
            None => tracing::debug!(id, "delete ignored, no such task"),
        }
        removed
    }

    /// Re-read tasks after storage changed underneath us
    pub fn reload(&mut self) -> bool {
        self.tasks.reload()
    }

    /// True exactly once per store: on the first call before the visit flag
    /// was ever set. Sets the flag.
    pub fn take_first_visit(&mut self) -> bool {
        if *self.visited.get() {
            return false;
        }
        self.visited.set(true);
        true
    }
}
