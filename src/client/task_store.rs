use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{ClientError, TaskApi};
use crate::models::{NewTask, Task, TaskChanges};

/// Snapshot of the task store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Local mirror of the caller's tasks.
///
/// Every action sets `loading`, clears `error`, calls the API and then updates the
/// collection from the server's response rather than re-fetching. On failure the
/// collection is left alone, `error` gets the server's message (or a default) and
/// the error is returned. `loading` is reset on both paths, and when the action is dropped.
///
/// Actions take `&self`, so a UI can read `loading` while a call is in flight.
/// Overlapping actions are not de-duplicated.
pub struct TaskStore<A> {
    api: Arc<A>,
    state: Mutex<TaskState>,
}

impl<A: TaskApi> TaskStore<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Mutex::new(TaskState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> TaskState {
        self.state().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.state()
            .tasks
            .iter()
            .filter(|task| task.completed)
            .cloned()
            .collect()
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.state()
            .tasks
            .iter()
            .filter(|task| !task.completed)
            .cloned()
            .collect()
    }

    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Drops the local collection, e.g. after logout.
    pub fn clear_tasks(&self) {
        self.state().tasks.clear();
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let tasks = self
            .track("Failed to fetch tasks", self.api.list_tasks())
            .await?;
        self.state().tasks = tasks.clone();
        Ok(tasks)
    }

    pub async fn create_task(&self, input: &NewTask) -> Result<Task, ClientError> {
        let task = self
            .track("Failed to create task", self.api.create_task(input))
            .await?;
        self.state().tasks.insert(0, task.clone());
        Ok(task)
    }

    pub async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<Task, ClientError> {
        let task = self
            .track("Failed to update task", self.api.update_task(id, changes))
            .await?;
        self.replace(&task);
        Ok(task)
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ClientError> {
        self.track("Failed to delete task", self.api.delete_task(id))
            .await?;
        self.state().tasks.retain(|task| task.id != id);
        Ok(())
    }

    pub async fn toggle_complete(&self, id: i64) -> Result<Task, ClientError> {
        let task = self
            .track(
                "Failed to toggle task completion",
                self.api.toggle_complete(id),
            )
            .await?;
        self.replace(&task);
        Ok(task)
    }

    // Tasks that are no longer in the local list are not re-added.
    fn replace(&self, updated: &Task) {
        let mut state = self.state();
        if let Some(slot) = state.tasks.iter_mut().find(|task| task.id == updated.id) {
            *slot = updated.clone();
        }
    }

    async fn track<T, F>(&self, fallback: &str, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let _loading = LoadingGuard::start(&self.state);

        let result = call.await;

        if let Err(err) = &result {
            let message = err.server_message().unwrap_or(fallback).to_string();
            log::warn!("{}: {}", message, err);
            self.state().error = Some(message);
        }
        result
    }
}

/// Holds `loading` up for as long as it lives, so an action that is dropped
/// mid-flight still resets the flag.
struct LoadingGuard<'a> {
    state: &'a Mutex<TaskState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a Mutex<TaskState>) -> Self {
        {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.loading = true;
            state.error = None;
        }
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = false;
    }
}
