//! End-to-end exchange flows through the service against the in-memory
//! store.

use eyre::{bail, ensure};
use rstest::rstest;
use taskrelay::exchange::{
    domain::{Actor, Initiator, PermissionDenied, TaskState, TransitionTarget, UserId},
    ports::ExchangeRepository,
    services::{CreateTaskRequest, TaskExchangeError},
};

use super::helpers::{TestExchange, current_state, exchange, set_up_handoff};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn handoff_flows_from_inbox_to_closed(exchange: TestExchange) -> eyre::Result<()> {
    let setup = set_up_handoff(&exchange.service).await?;
    ensure!(setup.task.state() == TaskState::Inbox);

    for (initiator, target) in [
        (setup.receiver, TaskState::Active),
        (setup.receiver, TaskState::Finished),
        (setup.sender, TaskState::Closed),
    ] {
        exchange
            .service
            .change_state(
                setup.task.id(),
                Initiator::Actor(initiator),
                TransitionTarget::State(target),
            )
            .await?;
        ensure!(current_state(&exchange.service, &setup.task).await? == target);
    }

    let events = exchange.service.history(setup.task.id()).await?;
    ensure!(events.len() == 4);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn receiver_rejection_round_trips(exchange: TestExchange) -> eyre::Result<()> {
    let setup = set_up_handoff(&exchange.service).await?;

    exchange
        .service
        .change_state(
            setup.task.id(),
            Initiator::Actor(setup.receiver),
            TransitionTarget::State(TaskState::Closed),
        )
        .await?;
    let rejected = exchange
        .service
        .task(setup.task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task vanished"))?;
    ensure!(rejected.rejected());

    let reopen = exchange
        .service
        .change_state(
            setup.task.id(),
            Initiator::Actor(setup.sender),
            TransitionTarget::State(TaskState::Finished),
        )
        .await;
    ensure!(matches!(
        reopen,
        Err(TaskExchangeError::Permission(
            PermissionDenied::TransitionNotPermitted { .. }
        ))
    ));

    exchange
        .service
        .change_state(
            setup.task.id(),
            Initiator::Actor(setup.receiver),
            TransitionTarget::State(TaskState::Inbox),
        )
        .await?;
    let restored = exchange
        .service
        .task(setup.task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task vanished"))?;
    ensure!(!restored.rejected());
    ensure!(restored.state() == TaskState::Inbox);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn anonymous_suggestion_box_flow(exchange: TestExchange) -> eyre::Result<()> {
    let receiver = Actor::User(UserId::new());
    let suggestions = exchange.service.create_list(receiver, "Suggestions").await?;

    let task = exchange
        .service
        .create_task(
            CreateTaskRequest::new(Actor::Anonymous, suggestions.id())
                .with_title("Fix the door"),
        )
        .await?;
    ensure!(task.is_anonymous());

    // With no sender to accept the work, the receiver closes directly.
    exchange
        .service
        .change_state(
            task.id(),
            Initiator::Actor(receiver),
            TransitionTarget::State(TaskState::Closed),
        )
        .await?;
    let closed = exchange
        .service
        .task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task vanished"))?;
    ensure!(closed.state() == TaskState::Closed);
    ensure!(!closed.rejected());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dependency_chain_settles_on_final_close(exchange: TestExchange) -> eyre::Result<()> {
    let owner = Actor::User(UserId::new());
    let list = exchange.service.create_list(owner, "Release").await?;
    let request = || CreateTaskRequest::new(owner, list.id()).with_outgoing(list.id());

    let release = exchange
        .service
        .create_task(
            request()
                .with_title("Ship 2.0")
                .with_auto_finish()
                .with_auto_close(),
        )
        .await?;
    let docs = exchange
        .service
        .create_task(request().with_title("Docs").with_dependent_of(release.id()))
        .await?;
    let build = exchange
        .service
        .create_task(request().with_title("Build").with_dependent_of(release.id()))
        .await?;

    exchange
        .service
        .change_state(
            docs.id(),
            Initiator::Actor(owner),
            TransitionTarget::State(TaskState::Closed),
        )
        .await?;
    ensure!(current_state(&exchange.service, &release).await? == TaskState::Active);

    exchange
        .service
        .change_state(
            build.id(),
            Initiator::Actor(owner),
            TransitionTarget::State(TaskState::Closed),
        )
        .await?;
    // Auto-finish fires, then auto-close chains on top of it.
    ensure!(current_state(&exchange.service, &release).await? == TaskState::Closed);

    // Both of the release task's moves came from the cascade.
    let events = exchange.service.history(release.id()).await?;
    let state_changes = events
        .iter()
        .filter(|event| event.is_state_change())
        .count();
    ensure!(state_changes == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retracted_task_leaves_no_trace(exchange: TestExchange) -> eyre::Result<()> {
    let setup = set_up_handoff(&exchange.service).await?;

    exchange
        .service
        .change_state(
            setup.task.id(),
            Initiator::Actor(setup.sender),
            TransitionTarget::Delete,
        )
        .await?;

    ensure!(exchange.service.task(setup.task.id()).await?.is_none());
    let history = exchange.service.history(setup.task.id()).await;
    if !matches!(history, Err(TaskExchangeError::Repository(_))) {
        bail!("expected a repository error, got {history:?}");
    }
    // The store discarded the audit events along with the task.
    ensure!(exchange.repository.events(setup.task.id()).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn matrix_and_executor_agree(exchange: TestExchange) -> eyre::Result<()> {
    let setup = set_up_handoff(&exchange.service).await?;

    // Every option the matrix offers from the current state must execute.
    let options = exchange
        .service
        .allowed_transitions(setup.task.id(), setup.receiver)
        .await?;
    let Some(first) = options
        .iter()
        .find(|option| option.from == TaskState::Inbox)
        .copied()
    else {
        bail!("expected at least one option from the inbox");
    };

    exchange
        .service
        .change_state(
            setup.task.id(),
            Initiator::Actor(setup.receiver),
            first.to,
        )
        .await?;
    if let TransitionTarget::State(state) = first.to {
        ensure!(current_state(&exchange.service, &setup.task).await? == state);
    }
    Ok(())
}
