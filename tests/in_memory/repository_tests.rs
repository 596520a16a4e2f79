//! Store-level guarantees of the in-memory exchange repository.

use eyre::{bail, ensure};
use mockable::{Clock, DefaultClock};
use rstest::{fixture, rstest};
use taskrelay::exchange::{
    adapters::memory::InMemoryExchangeRepository,
    domain::{ListId, ListSlug, Task, TaskEvent, TaskId, TaskList, TaskState, UserId},
    ports::{ExchangeRepository, ExchangeRepositoryError},
};

#[fixture]
fn repository() -> InMemoryExchangeRepository {
    InMemoryExchangeRepository::new()
}

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

fn sample_task(clock: &impl Clock) -> (Task, TaskEvent) {
    let incoming = ListId::new();
    let creator = UserId::new();
    let task = Task::new(Some(creator), None, incoming, clock);
    let event = TaskEvent::created(task.id(), Some(creator), None, incoming, None, clock);
    (task, event)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slug_lookups_follow_slug_changes(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let mut list = TaskList::new(UserId::new(), "Ops", &clock);
    repository.store_list(&list).await?;
    let original_slug = list.slug().clone();

    list.change_slug(ListSlug::new("ops-board")?, &clock);
    repository.update_list(&list).await?;

    ensure!(repository.list_by_slug(&original_slug).await?.is_none());
    let found = repository
        .list_by_slug(&ListSlug::new("ops-board")?)
        .await?;
    ensure!(found.map(|l| l.id()) == Some(list.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_slugs_are_rejected_across_lists(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let mut first = TaskList::new(UserId::new(), "First", &clock);
    first.change_slug(ListSlug::new("shared")?, &clock);
    repository.store_list(&first).await?;

    let mut second = TaskList::new(UserId::new(), "Second", &clock);
    second.change_slug(ListSlug::new("shared")?, &clock);
    let result = repository.store_list(&second).await;
    ensure!(matches!(
        result,
        Err(ExchangeRepositoryError::DuplicateSlug(_))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_commits_are_rejected_with_the_stored_version(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let (task, created) = sample_task(&clock);
    repository.store_task(&task, &created).await?;

    // Two writers take the same snapshot; the first commit wins.
    let mut winner = task.clone();
    winner.apply_transition(TaskState::Active, false, &clock);
    let winner_event = TaskEvent::state(
        task.id(),
        None,
        TaskState::Inbox,
        TaskState::Active,
        &clock,
    );
    repository.commit_transition(&winner, &winner_event).await?;

    let mut loser = task.clone();
    loser.apply_transition(TaskState::Closed, false, &clock);
    let loser_event = TaskEvent::state(
        task.id(),
        None,
        TaskState::Inbox,
        TaskState::Closed,
        &clock,
    );
    let result = repository.commit_transition(&loser, &loser_event).await;
    match result {
        Err(ExchangeRepositoryError::VersionConflict { task_id, stored }) => {
            ensure!(task_id == task.id());
            ensure!(stored == 1);
        }
        other => bail!("expected a version conflict, got {other:?}"),
    }

    // The losing event was not recorded.
    let events = repository.events(task.id()).await?;
    ensure!(events.len() == 2);
    let stored = repository
        .task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task vanished"))?;
    ensure!(stored.state() == TaskState::Active);
    ensure!(stored.version() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn events_are_returned_oldest_first(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let (mut task, created) = sample_task(&clock);
    repository.store_task(&task, &created).await?;

    for to in [TaskState::Active, TaskState::Finished] {
        let from = task.state();
        let event = TaskEvent::state(task.id(), None, from, to, &clock);
        task.apply_transition(to, false, &clock);
        repository.commit_transition(&task, &event).await?;
        task.set_version(task.version() + 1);
    }

    let events = repository.events(task.id()).await?;
    ensure!(events.len() == 3);
    let Some(first) = events.first() else {
        bail!("expected a creation event first");
    };
    ensure!(!first.is_state_change());
    for pair in events.windows(2) {
        let [earlier, later] = pair else {
            bail!("windows(2) yielded a malformed pair");
        };
        ensure!(earlier.created_at <= later.created_at);
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_task_removes_events_and_edges(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let (dependency, dependency_created) = sample_task(&clock);
    let (dependent, dependent_created) = sample_task(&clock);
    repository
        .store_task(&dependency, &dependency_created)
        .await?;
    repository
        .store_task(&dependent, &dependent_created)
        .await?;
    repository
        .link_dependency(dependent.id(), dependency.id())
        .await?;

    repository.delete_task(dependency.id()).await?;

    ensure!(repository.task(dependency.id()).await?.is_none());
    ensure!(repository.events(dependency.id()).await?.is_empty());
    let refreshed = repository
        .task(dependent.id())
        .await?
        .ok_or_else(|| eyre::eyre!("dependent vanished"))?;
    ensure!(!refreshed.depends_on(dependency.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn autofinish_dependents_filters_flags_and_states(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let (dependency, dependency_created) = sample_task(&clock);
    repository
        .store_task(&dependency, &dependency_created)
        .await?;

    // One flagged dependent, one unflagged, one flagged but already terminal.
    let incoming = ListId::new();
    let flagged = Task::new(None, None, incoming, &clock).with_auto_finish();
    let unflagged = Task::new(None, None, incoming, &clock);
    let mut terminal = Task::new(None, None, incoming, &clock).with_auto_finish();
    terminal.apply_transition(TaskState::Closed, false, &clock);

    for task in [&flagged, &unflagged, &terminal] {
        let created = TaskEvent::created(task.id(), None, None, incoming, None, &clock);
        repository.store_task(task, &created).await?;
        repository
            .link_dependency(task.id(), dependency.id())
            .await?;
    }

    let dependents = repository.autofinish_dependents(dependency.id()).await?;
    let ids: Vec<_> = dependents.iter().map(Task::id).collect();
    ensure!(ids == vec![flagged.id()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn linking_to_a_missing_task_fails(
    repository: InMemoryExchangeRepository,
    clock: DefaultClock,
) -> eyre::Result<()> {
    let (task, created) = sample_task(&clock);
    repository.store_task(&task, &created).await?;

    let missing = TaskId::new();
    let result = repository.link_dependency(task.id(), missing).await;
    ensure!(matches!(
        result,
        Err(ExchangeRepositoryError::TaskNotFound(_))
    ));
    Ok(())
}
