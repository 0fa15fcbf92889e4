//! Task manager — the central coordinator of task lifecycle, agent hooks,
//! persistence, and event delivery.
//!
//! The manager owns no transport concerns; it is called directly by the
//! JSON-RPC and REST processors. Every operation here corresponds to a
//! JSON-RPC method or REST endpoint in the protocol surface.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    AgentCard, Message, Part, PushNotificationConfig, Role, SendMessageConfiguration,
    SendMessageResponse, StreamResponse, Task, TaskPushNotificationConfig, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};

use super::agent_hooks::AgentHooks;
use super::event_queue::{EventConsumer, EventQueue, InMemoryQueueManager, QueueManager};
use super::task_store::TaskStore;

/// Parameters for `message/send` and `message/stream`.
#[derive(Debug, Clone)]
pub struct SendMessageParams {
    /// The message to send to the agent.
    pub message: Message,

    /// Optional configuration for the send operation.
    pub configuration: Option<SendMessageConfiguration>,

    /// Optional metadata attached to the request.
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone)]
pub struct GetTaskParams {
    /// The task ID to retrieve.
    pub id: String,

    /// Maximum number of history messages to include.
    pub history_length: Option<i32>,
}

/// Parameters for `tasks/cancel`.
#[derive(Debug, Clone)]
pub struct CancelTaskParams {
    /// The task ID to cancel.
    pub id: String,
}

/// Parameters for `tasks/subscribe` and `tasks/resubscribe` (treated as aliases).
#[derive(Debug, Clone)]
pub struct SubscribeToTaskParams {
    /// The task ID to subscribe to.
    pub id: String,
}

/// Outcome of resolving an incoming message, before the caller decides how
/// to wait on it (synchronously, or by streaming).
enum Resolved {
    /// A hook answered the message directly; no task was created.
    Responded(SendMessageResponse),
    /// A task now exists (new or updated) and is running against `events`.
    /// The `on_task_created`/`on_task_updated` hook has *not* been spawned
    /// yet — the caller must subscribe (and, for streaming, publish the
    /// initial `Task` snapshot) before spawning it, so the hook can never
    /// publish ahead of that first subscription.
    Running {
        task: Task,
        events: EventQueue,
        updated: bool,
    },
}

fn is_terminal(state: &TaskState) -> bool {
    matches!(
        state,
        TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
    )
}

/// Trim a task's history to the requested length.
///
/// - `None` — leave the history untouched.
/// - `Some(0)` — clear the history entirely.
/// - `Some(n)` with `n >= history.len()` — leave the history untouched.
/// - otherwise — keep the most recent `n` entries.
///
/// Negative values must be rejected by the caller via [`validate_history_length`]
/// before this runs.
fn trim_history(task: &mut Task, max_length: Option<i32>) {
    let Some(max) = max_length else { return };
    let max = max.max(0) as usize;

    if let Some(ref mut history) = task.history {
        if max == 0 {
            history.clear();
        } else if history.len() > max {
            let start = history.len() - max;
            *history = history.split_off(start);
        }
    }
}

fn validate_history_length(history_length: Option<i32>) -> A2AResult<()> {
    if let Some(n) = history_length {
        if n < 0 {
            return Err(A2AError::invalid_params(
                "historyLength must not be negative",
            ));
        }
    }
    Ok(())
}

fn agent_text_message(task_id: &str, context_id: &str, text: String) -> Message {
    Message {
        message_id: Uuid::new_v4().to_string(),
        role: Role::Agent,
        kind: "message".to_string(),
        parts: vec![Part::text(text)],
        context_id: Some(context_id.to_string()),
        task_id: Some(task_id.to_string()),
        metadata: None,
        extensions: None,
        reference_task_ids: None,
    }
}

/// Coordinates task lifecycle, agent hooks, persistence, and event delivery.
///
/// Constructed once per server with a [`TaskStore`] and a set of
/// [`AgentHooks`]; the hooks are not reassignable afterward.
pub struct TaskManager {
    task_store: Arc<dyn TaskStore>,
    queue_manager: Arc<dyn QueueManager>,
    hooks: Arc<dyn AgentHooks>,
}

impl TaskManager {
    /// Create a new task manager backed by the given store and hooks, using
    /// the default in-memory queue manager.
    pub fn new(task_store: Arc<dyn TaskStore>, hooks: Arc<dyn AgentHooks>) -> Self {
        Self::with_queue_manager(task_store, hooks, Arc::new(InMemoryQueueManager::new()))
    }

    /// Create a new task manager with an explicit queue manager — useful when
    /// multiple manager instances must share queue visibility.
    pub fn with_queue_manager(
        task_store: Arc<dyn TaskStore>,
        hooks: Arc<dyn AgentHooks>,
        queue_manager: Arc<dyn QueueManager>,
    ) -> Self {
        Self {
            task_store,
            queue_manager,
            hooks,
        }
    }

    /// Handle `message/send`: run the message to completion and return the
    /// resulting task or message.
    pub async fn send_message(&self, params: SendMessageParams) -> A2AResult<SendMessageResponse> {
        let history_length = params.configuration.as_ref().and_then(|c| c.history_length);
        validate_history_length(history_length)?;

        match self.resolve_message(params).await? {
            Resolved::Responded(response) => Ok(response),
            Resolved::Running {
                task,
                events,
                updated,
            } => {
                // Subscribe before spawning the hook so nothing it publishes
                // can be missed between queue creation and consumption.
                let mut consumer = EventConsumer::new(events.clone());
                self.spawn_hook(task.clone(), events, updated);

                let mut final_task = self.drain_until_terminal(&task.id, &mut consumer).await?;
                trim_history(&mut final_task, history_length);
                Ok(SendMessageResponse::Task(final_task))
            }
        }
    }

    /// Handle `message/stream`: run the message and return its event stream.
    ///
    /// The first event delivered is always a `Task` snapshot (or, if a hook
    /// short-circuited, the hook's `Message`), matching the synchronous
    /// response shape one would get from `message/send`.
    pub async fn send_message_streaming(
        &self,
        params: SendMessageParams,
    ) -> A2AResult<broadcast::Receiver<StreamResponse>> {
        let history_length = params.configuration.as_ref().and_then(|c| c.history_length);
        validate_history_length(history_length)?;

        match self.resolve_message(params).await? {
            Resolved::Responded(response) => {
                let relay = EventQueue::with_default_capacity();
                let rx = relay.subscribe();
                let event = match response {
                    SendMessageResponse::Task(t) => StreamResponse::Task(t),
                    SendMessageResponse::Message(m) => StreamResponse::Message(m),
                };
                relay.publish(event)?;
                relay.close().await;
                Ok(rx)
            }
            Resolved::Running {
                task,
                events,
                updated,
            } => {
                // Subscribe and publish the initial Task snapshot *before*
                // spawning the hook, guaranteeing it's the first event any
                // subscriber observes even if the hook runs immediately on
                // another worker thread.
                let rx = events.subscribe();
                events.publish(StreamResponse::Task(task.clone()))?;
                self.spawn_hook(task, events, updated);
                Ok(rx)
            }
        }
    }

    /// Handle `tasks/get`: retrieve a task by ID, with optional history
    /// trimming.
    pub async fn get_task(&self, params: GetTaskParams) -> A2AResult<Task> {
        validate_history_length(params.history_length)?;

        let mut task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", params.id)))?;

        trim_history(&mut task, params.history_length);
        Ok(task)
    }

    /// Handle `tasks/cancel`: request cancellation of a running task and wait
    /// for it to reach the `canceled` state.
    pub async fn cancel_task(&self, params: CancelTaskParams) -> A2AResult<Task> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", params.id)))?;

        if is_terminal(&task.status.state) {
            return Err(A2AError::task_not_cancelable(format!(
                "task '{}' is already in terminal state {}",
                params.id, task.status.state
            )));
        }

        let events = self.queue_for_task(&params.id).await;
        // Subscribe before invoking the hook so its publish isn't missed.
        let mut consumer = EventConsumer::new(events.clone());

        if let Err(e) = self.hooks.on_task_cancelled(&task, &events).await {
            error!(task_id = %params.id, error = %e, "on_task_cancelled hook failed");
            return Err(e);
        }

        let final_task = self.drain_until_terminal(&params.id, &mut consumer).await?;

        if final_task.status.state != TaskState::Canceled {
            return Err(A2AError::task_not_cancelable(format!(
                "task '{}' did not reach canceled state, got {}",
                params.id, final_task.status.state
            )));
        }

        Ok(final_task)
    }

    /// Handle `tasks/subscribe` and `tasks/resubscribe` — both are aliases of
    /// the same operation: attach to the live event stream of a non-terminal
    /// task.
    pub async fn subscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<broadcast::Receiver<StreamResponse>> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", params.id)))?;

        if is_terminal(&task.status.state) {
            return Err(A2AError::invalid_request(format!(
                "task '{}' is in terminal state {} — nothing left to subscribe to",
                params.id, task.status.state
            )));
        }

        match self.queue_manager.tap(&params.id).await {
            Some(queue) => Ok(queue.subscribe()),
            None => Err(A2AError::task_not_found(format!(
                "task '{}' has no active event stream",
                params.id
            ))),
        }
    }

    /// Handle `tasks/pushNotificationConfig/get`.
    ///
    /// If `config_id` is `None`, the oldest registered config is returned.
    pub async fn get_push_notification_config(
        &self,
        task_id: &str,
        config_id: Option<&str>,
    ) -> A2AResult<Option<PushNotificationConfig>> {
        self.ensure_task_exists(task_id).await?;

        match config_id {
            Some(id) => self.task_store.get_push_notification(task_id, id).await,
            None => Ok(self
                .task_store
                .get_push_notifications(task_id)
                .await?
                .into_iter()
                .next()),
        }
    }

    /// Handle `tasks/pushNotificationConfig/set`.
    pub async fn set_push_notification_config(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig> {
        self.ensure_task_exists(&config.task_id).await?;
        self.task_store.set_push_notification_config(config).await
    }

    /// Handle an agent-card lookup, applying the `on_agent_card_query` hook.
    pub async fn resolve_agent_card(&self, base_card: &AgentCard) -> AgentCard {
        self.hooks.on_agent_card_query(base_card).await
    }

    async fn ensure_task_exists(&self, task_id: &str) -> A2AResult<()> {
        self.task_store
            .get(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", task_id)))?;
        Ok(())
    }

    async fn queue_for_task(&self, task_id: &str) -> EventQueue {
        if let Some(queue) = self.queue_manager.get(task_id).await {
            queue
        } else {
            let queue = EventQueue::with_default_capacity();
            let _ = self.queue_manager.add(task_id, queue.clone()).await;
            queue
        }
    }

    /// Resolve an incoming message to either a direct hook response, or a
    /// running task with its event queue.
    async fn resolve_message(&self, params: SendMessageParams) -> A2AResult<Resolved> {
        let SendMessageParams {
            message, metadata, ..
        } = params;

        let existing_task = match message.task_id.as_deref() {
            Some(task_id) => Some(self.task_store.get(task_id).await?.ok_or_else(|| {
                A2AError::task_not_found(format!("task '{}' not found", task_id))
            })?),
            None => {
                if let Some(response) = self.hooks.on_message_received(&message, None).await {
                    return response.map(Resolved::Responded);
                }
                None
            }
        };

        match existing_task {
            Some(task) => {
                if is_terminal(&task.status.state) {
                    return Err(A2AError::invalid_request(format!(
                        "task '{}' is in terminal state {} — cannot accept new messages",
                        task.id, task.status.state
                    )));
                }

                let mut updated = task;
                if let Some(status_msg) = updated.status.message.take() {
                    updated.history.get_or_insert_with(Vec::new).push(status_msg);
                }
                updated.history.get_or_insert_with(Vec::new).push(message);
                self.task_store.save(updated.clone()).await?;

                let events = self.queue_for_task(&updated.id).await;
                Ok(Resolved::Running {
                    task: updated,
                    events,
                    updated: true,
                })
            }
            None => {
                let task_id = Uuid::new_v4().to_string();
                let context_id = message
                    .context_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());

                let task = Task {
                    id: task_id.clone(),
                    context_id,
                    kind: "task".to_string(),
                    status: TaskStatus {
                        state: TaskState::Submitted,
                        message: None,
                        timestamp: Some(chrono::Utc::now().to_rfc3339()),
                    },
                    artifacts: None,
                    history: Some(vec![message]),
                    metadata,
                };

                self.task_store.save(task.clone()).await?;
                info!(task_id = %task_id, "task created");

                let events = self.queue_for_task(&task_id).await;
                Ok(Resolved::Running {
                    task,
                    events,
                    updated: false,
                })
            }
        }
    }

    /// Spawn the `on_task_created`/`on_task_updated` hook in the background.
    /// On error, publishes a synthetic `failed` status update so streaming
    /// and synchronous callers alike observe a terminal outcome.
    fn spawn_hook(&self, task: Task, events: EventQueue, updated: bool) {
        let hooks = Arc::clone(&self.hooks);
        let task_store = Arc::clone(&self.task_store);
        let queue_manager = Arc::clone(&self.queue_manager);

        tokio::spawn(async move {
            let result = if updated {
                hooks.on_task_updated(&task, &events).await
            } else {
                hooks.on_task_created(&task, &events).await
            };

            if let Err(e) = result {
                error!(task_id = %task.id, error = %e, "agent hook failed");

                let message = agent_text_message(
                    &task.id,
                    &task.context_id,
                    format!("agent hook failed: {}", e),
                );
                let status = TaskStatus {
                    state: TaskState::Failed,
                    message: Some(message),
                    timestamp: Some(chrono::Utc::now().to_rfc3339()),
                };
                let failed = StreamResponse::StatusUpdate(TaskStatusUpdateEvent {
                    task_id: task.id.clone(),
                    context_id: task.context_id.clone(),
                    kind: "status-update".to_string(),
                    status: status.clone(),
                    r#final: true,
                    metadata: None,
                });

                let _ = events.publish(failed);
                let _ = task_store
                    .update_status(&task.id, status.state, status.message)
                    .await;
            }

            let _ = queue_manager.close(&task.id).await;
        });
    }

    /// Consume from `consumer` — applying each event to the persisted task —
    /// until a terminal status update arrives, then return the final task.
    /// Takes an already-subscribed consumer so no events published between
    /// queue creation and the start of draining are lost.
    async fn drain_until_terminal(
        &self,
        task_id: &str,
        consumer: &mut EventConsumer,
    ) -> A2AResult<Task> {
        loop {
            let Some(event) = consumer.next_event().await else {
                break;
            };

            self.apply_event(task_id, &event).await?;

            if let StreamResponse::StatusUpdate(ref update) = event {
                if is_terminal(&update.status.state) || update.r#final {
                    break;
                }
            }
        }

        self.task_store
            .get(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", task_id)))
    }

    /// Apply a stream event to the persisted task state.
    async fn apply_event(&self, task_id: &str, event: &StreamResponse) -> A2AResult<()> {
        let mut task = self
            .task_store
            .get(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", task_id)))?;

        match event {
            StreamResponse::StatusUpdate(update) => {
                if let Some(current_msg) = task.status.message.take() {
                    task.history.get_or_insert_with(Vec::new).push(current_msg);
                }

                if let Some(ref event_meta) = update.metadata {
                    match task.metadata.as_mut() {
                        Some(task_meta) => {
                            if let (Some(task_obj), Some(event_obj)) =
                                (task_meta.as_object_mut(), event_meta.as_object())
                            {
                                for (k, v) in event_obj {
                                    task_obj.insert(k.clone(), v.clone());
                                }
                            }
                        }
                        None => task.metadata = Some(event_meta.clone()),
                    }
                }

                task.status = update.status.clone();
            }
            StreamResponse::ArtifactUpdate(update) => {
                let artifacts = task.artifacts.get_or_insert_with(Vec::new);
                let append = update.append.unwrap_or(false);
                let artifact_id = &update.artifact.artifact_id;
                let existing_idx = artifacts.iter().position(|a| &a.artifact_id == artifact_id);

                if !append {
                    match existing_idx {
                        Some(idx) => artifacts[idx] = update.artifact.clone(),
                        None => artifacts.push(update.artifact.clone()),
                    }
                } else if let Some(idx) = existing_idx {
                    artifacts[idx].parts.extend(update.artifact.parts.clone());
                } else {
                    warn!(
                        task_id = %task_id,
                        artifact_id = %artifact_id,
                        "received append=true for nonexistent artifact, ignoring chunk"
                    );
                }
            }
            StreamResponse::Task(updated_task) => {
                task = updated_task.clone();
            }
            StreamResponse::Message(msg) => {
                task.history.get_or_insert_with(Vec::new).push(msg.clone());
            }
        }

        debug!(task_id = %task_id, "task state applied");
        self.task_store.save(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::agent_hooks::NoopHooks;
    use crate::server::task_store::InMemoryTaskStore;
    use async_trait::async_trait;

    fn user_message(text: &str) -> Message {
        Message {
            message_id: Uuid::new_v4().to_string(),
            role: Role::User,
            kind: "message".to_string(),
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            metadata: None,
            extensions: None,
            reference_task_ids: None,
        }
    }

    fn base_task(id: &str, ctx: &str, state: TaskState) -> Task {
        Task {
            id: id.to_string(),
            context_id: ctx.to_string(),
            kind: "task".to_string(),
            status: TaskStatus {
                state,
                message: None,
                timestamp: None,
            },
            artifacts: None,
            history: Some(vec![user_message("a"), user_message("b"), user_message("c")]),
            metadata: None,
        }
    }

    /// A hook that completes every task it sees, immediately.
    struct CompletingHooks;

    #[async_trait]
    impl AgentHooks for CompletingHooks {
        async fn on_task_created(&self, task: &Task, events: &EventQueue) -> A2AResult<()> {
            let event = StreamResponse::StatusUpdate(TaskStatusUpdateEvent {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                kind: "status-update".to_string(),
                status: TaskStatus {
                    state: TaskState::Completed,
                    message: None,
                    timestamp: Some(chrono::Utc::now().to_rfc3339()),
                },
                r#final: true,
                metadata: None,
            });
            events.enqueue_event(event).await
        }
    }

    fn manager_with(hooks: Arc<dyn AgentHooks>) -> TaskManager {
        TaskManager::new(Arc::new(InMemoryTaskStore::new()), hooks)
    }

    #[test]
    fn trims_history_to_zero() {
        let mut task = base_task("t1", "c1", TaskState::Completed);
        trim_history(&mut task, Some(0));
        assert!(task.history.as_ref().unwrap().is_empty());
    }

    #[test]
    fn trims_history_keeps_tail() {
        let mut task = base_task("t1", "c1", TaskState::Completed);
        trim_history(&mut task, Some(2));
        let history = task.history.unwrap();
        assert_eq!(history.len(), 2);
        match &history[0].parts[0] {
            Part::Text { text, .. } => assert_eq!(text, "b"),
            _ => panic!("expected text part"),
        }
    }

    #[test]
    fn trims_history_leaves_untouched_when_n_exceeds_len() {
        let mut task = base_task("t1", "c1", TaskState::Completed);
        trim_history(&mut task, Some(100));
        assert_eq!(task.history.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn negative_history_length_is_rejected() {
        let mgr = manager_with(Arc::new(NoopHooks));
        let err = mgr
            .get_task(GetTaskParams {
                id: "missing".into(),
                history_length: Some(-1),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), A2AError::invalid_params("x").code());
    }

    #[tokio::test]
    async fn send_message_creates_and_completes_a_task() {
        let mgr = manager_with(Arc::new(CompletingHooks));
        let response = mgr
            .send_message(SendMessageParams {
                message: user_message("hi"),
                configuration: None,
                metadata: None,
            })
            .await
            .unwrap();

        match response {
            SendMessageResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::Completed);
            }
            SendMessageResponse::Message(_) => panic!("expected a task"),
        }
    }

    #[tokio::test]
    async fn cancel_task_moves_to_canceled() {
        let mgr = manager_with(Arc::new(NoopHooks));
        mgr.task_store.save(base_task("t1", "c1", TaskState::Submitted)).await.unwrap();

        let cancelled = mgr
            .cancel_task(CancelTaskParams { id: "t1".into() })
            .await
            .unwrap();
        assert_eq!(cancelled.status.state, TaskState::Canceled);
    }

    #[tokio::test]
    async fn cancel_task_rejects_already_terminal() {
        let mgr = manager_with(Arc::new(NoopHooks));
        mgr.task_store.save(base_task("t1", "c1", TaskState::Completed)).await.unwrap();

        let err = mgr
            .cancel_task(CancelTaskParams { id: "t1".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), A2AError::task_not_cancelable("x").code());
    }

    #[tokio::test]
    async fn get_task_not_found() {
        let mgr = manager_with(Arc::new(NoopHooks));
        let err = mgr
            .get_task(GetTaskParams {
                id: "nope".into(),
                history_length: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), A2AError::task_not_found("x").code());
    }

    #[tokio::test]
    async fn sending_to_a_terminal_task_is_rejected() {
        let mgr = manager_with(Arc::new(NoopHooks));
        mgr.task_store.save(base_task("t1", "c1", TaskState::Completed)).await.unwrap();

        let mut message = user_message("more");
        message.task_id = Some("t1".to_string());

        let err = mgr
            .send_message(SendMessageParams {
                message,
                configuration: None,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), A2AError::invalid_request("x").code());
    }
}
