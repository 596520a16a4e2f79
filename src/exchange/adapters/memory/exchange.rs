//! In-memory repository backing the exchange engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::exchange::{
    domain::{ListId, ListSlug, Task, TaskEvent, TaskId, TaskList},
    ports::{ExchangeRepository, ExchangeRepositoryError, ExchangeRepositoryResult},
};

/// Thread-safe in-memory exchange repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExchangeRepository {
    state: Arc<RwLock<InMemoryExchangeState>>,
}

#[derive(Debug, Default)]
struct InMemoryExchangeState {
    lists: HashMap<ListId, TaskList>,
    slug_index: HashMap<String, ListId>,
    tasks: HashMap<TaskId, Task>,
    events: HashMap<TaskId, Vec<TaskEvent>>,
}

impl InMemoryExchangeRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> ExchangeRepositoryError {
    ExchangeRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ExchangeRepository for InMemoryExchangeRepository {
    async fn store_list(&self, list: &TaskList) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.lists.contains_key(&list.id()) {
            return Err(ExchangeRepositoryError::DuplicateList(list.id()));
        }
        if state.slug_index.contains_key(list.slug().as_str()) {
            return Err(ExchangeRepositoryError::DuplicateSlug(list.slug().clone()));
        }
        state
            .slug_index
            .insert(list.slug().as_str().to_owned(), list.id());
        state.lists.insert(list.id(), list.clone());
        Ok(())
    }

    async fn update_list(&self, list: &TaskList) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let old_slug = state
            .lists
            .get(&list.id())
            .ok_or(ExchangeRepositoryError::ListNotFound(list.id()))?
            .slug()
            .clone();
        if let Some(holder) = state.slug_index.get(list.slug().as_str()) {
            if *holder != list.id() {
                return Err(ExchangeRepositoryError::DuplicateSlug(list.slug().clone()));
            }
        }
        state.slug_index.remove(old_slug.as_str());
        state
            .slug_index
            .insert(list.slug().as_str().to_owned(), list.id());
        state.lists.insert(list.id(), list.clone());
        Ok(())
    }

    async fn list(&self, id: ListId) -> ExchangeRepositoryResult<Option<TaskList>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.lists.get(&id).cloned())
    }

    async fn list_by_slug(&self, slug: &ListSlug) -> ExchangeRepositoryResult<Option<TaskList>> {
        let state = self.state.read().map_err(poisoned)?;
        let list = state
            .slug_index
            .get(slug.as_str())
            .and_then(|id| state.lists.get(id))
            .cloned();
        Ok(list)
    }

    async fn store_task(&self, task: &Task, created: &TaskEvent) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(ExchangeRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        state
            .events
            .entry(task.id())
            .or_default()
            .push(created.clone());
        Ok(())
    }

    async fn task(&self, id: TaskId) -> ExchangeRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn commit_transition(
        &self,
        task: &Task,
        event: &TaskEvent,
    ) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored_version = state
            .tasks
            .get(&task.id())
            .ok_or(ExchangeRepositoryError::TaskNotFound(task.id()))?
            .version();
        if stored_version != task.version() {
            return Err(ExchangeRepositoryError::VersionConflict {
                task_id: task.id(),
                stored: stored_version,
            });
        }
        let mut committed = task.clone();
        committed.set_version(stored_version + 1);
        state.tasks.insert(committed.id(), committed);
        state
            .events
            .entry(task.id())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn link_dependency(
        &self,
        dependent: TaskId,
        dependency: TaskId,
    ) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.tasks.contains_key(&dependency) {
            return Err(ExchangeRepositoryError::TaskNotFound(dependency));
        }
        let task = state
            .tasks
            .get_mut(&dependent)
            .ok_or(ExchangeRepositoryError::TaskNotFound(dependent))?;
        task.add_dependency(dependency);
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> ExchangeRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.remove(&id).is_none() {
            return Err(ExchangeRepositoryError::TaskNotFound(id));
        }
        state.events.remove(&id);
        // Drop the adjacency edges pointing at the deleted task.
        for task in state.tasks.values_mut() {
            task.remove_dependency(id);
        }
        Ok(())
    }

    async fn autofinish_dependents(
        &self,
        dependency: TaskId,
    ) -> ExchangeRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut dependents: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| {
                task.auto_finish() && !task.state().is_terminal() && task.depends_on(dependency)
            })
            .cloned()
            .collect();
        dependents.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(dependents)
    }

    async fn events(&self, task_id: TaskId) -> ExchangeRepositoryResult<Vec<TaskEvent>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.events.get(&task_id).cloned().unwrap_or_default())
    }
}
