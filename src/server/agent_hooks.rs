//! Agent hooks — the extension points through which a host plugs agent logic
//! into the task manager.
//!
//! An implementor supplies only the hooks it needs; every method has a safe
//! default so a minimal agent can implement a single one. Hooks are handed to
//! [`TaskManager`](super::task_manager::TaskManager) once, at construction, as
//! `Arc<dyn AgentHooks>` — there is no supported way to swap hooks on a manager
//! that is already serving traffic.

use async_trait::async_trait;

use crate::error::A2AResult;
use crate::types::{AgentCard, Message, SendMessageResponse, Task};

use super::event_queue::EventQueue;

/// Extension points invoked by the task manager at well-defined points in a
/// task's lifecycle.
///
/// # Hooks
///
/// - [`on_message_received`](Self::on_message_received) runs only for a
///   message with no `taskId` — it is never consulted for a message that
///   targets an existing task, terminal or not. Returning `Some(..)`
///   short-circuits the default task-creation path entirely — useful for
///   agents that answer directly with a `Message` and never need a persisted
///   `Task` (a stateless echo, for example). Returning `None` (the default)
///   falls through to task creation.
/// - [`on_task_created`](Self::on_task_created) runs once a new task has been
///   persisted in `submitted` state. This is where most agents do their real
///   work: publish `working`, produce artifacts, and finish with a terminal
///   status update, all through the given `EventQueue`.
/// - [`on_task_updated`](Self::on_task_updated) runs when a new message is sent
///   against an existing, non-terminal task.
/// - [`on_task_cancelled`](Self::on_task_cancelled) runs when a cancellation is
///   requested for a task. The default publishes a `canceled` status update
///   with no message.
/// - [`on_agent_card_query`](Self::on_agent_card_query) runs on every agent
///   card lookup, letting a host customize the card per request (for example,
///   an authenticated extended card). The default returns the base card
///   unchanged.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    /// Called for an incoming message that carries no `taskId`, before a new
    /// task would be created for it. Never called for a message that targets
    /// an existing task (found or not, terminal or not) — those always go
    /// through the task-lookup path instead.
    ///
    /// Returning `Some(response)` answers the request immediately with that
    /// response and skips task creation. Returning `None` falls through to the
    /// default behavior of creating a task and invoking
    /// [`on_task_created`](Self::on_task_created).
    async fn on_message_received(
        &self,
        _message: &Message,
        _task: Option<&Task>,
    ) -> Option<A2AResult<SendMessageResponse>> {
        None
    }

    /// Called after a new task has been persisted in `submitted` state.
    ///
    /// Implementations do their work here, publishing status and artifact
    /// updates through `events`. The default does nothing, leaving the task
    /// in `submitted` state forever — a no-op agent.
    async fn on_task_created(&self, _task: &Task, _events: &EventQueue) -> A2AResult<()> {
        Ok(())
    }

    /// Called when a new message arrives for an existing, non-terminal task.
    ///
    /// The default does nothing.
    async fn on_task_updated(&self, _task: &Task, _events: &EventQueue) -> A2AResult<()> {
        Ok(())
    }

    /// Called when a task is cancelled.
    ///
    /// The default publishes a `canceled` status update with no message,
    /// through `events`.
    async fn on_task_cancelled(&self, task: &Task, events: &EventQueue) -> A2AResult<()> {
        use crate::types::{StreamResponse, TaskStatus, TaskState, TaskStatusUpdateEvent};

        let event = StreamResponse::StatusUpdate(TaskStatusUpdateEvent {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            kind: "status-update".to_string(),
            status: TaskStatus {
                state: TaskState::Canceled,
                message: None,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
            r#final: true,
            metadata: None,
        });
        events.enqueue_event(event).await
    }

    /// Called on every agent-card lookup, letting a host return a customized
    /// card for the requesting caller (for example, an authenticated extended
    /// card with additional skills). The default returns `base_card` unchanged.
    async fn on_agent_card_query(&self, base_card: &AgentCard) -> AgentCard {
        base_card.clone()
    }
}

/// An [`AgentHooks`] implementation that accepts every hook's default.
///
/// Useful as a placeholder, or as a base when only one or two hooks need
/// overriding via composition.
pub struct NoopHooks;

#[async_trait]
impl AgentHooks for NoopHooks {}
