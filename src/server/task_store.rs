//! Task store — persistence layer for A2A tasks and their push-notification configs.
//!
//! The task store is responsible for persisting and retrieving [`Task`] objects
//! and the [`PushNotificationConfig`]s registered against them. Two reference
//! implementations are provided:
//!
//! - [`InMemoryTaskStore`] — concurrent in-process maps, for development, testing,
//!   and single-node deployments.
//! - [`DistributedCacheTaskStore`] — serializes tasks and configs to bytes and reads
//!   them through a [`CacheBackend`], the shape any networked cache client (Redis,
//!   memcached, a KV object store) exposes. No cross-process lock is taken; callers
//!   must tolerate last-writer-wins under concurrent updates to the same task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{Message, PushNotificationConfig, Task, TaskPushNotificationConfig, TaskState, TaskStatus};

/// Parameters for listing tasks with optional filtering and pagination.
#[derive(Debug, Clone, Default)]
pub struct TaskListParams {
    /// Filter tasks by context ID.
    pub context_id: Option<String>,

    /// Filter tasks by state.
    pub status: Option<Vec<TaskState>>,

    /// Maximum number of tasks to return per page.
    pub page_size: Option<usize>,

    /// Opaque token for pagination — the task ID to start after.
    pub page_token: Option<String>,
}

/// Response for a task listing request.
#[derive(Debug, Clone)]
pub struct TaskListResponse {
    /// The tasks matching the query.
    pub tasks: Vec<Task>,

    /// Token for the next page, if more results are available.
    pub next_page_token: Option<String>,
}

/// Trait for persisting and retrieving A2A tasks and their push-notification configs.
///
/// Implementations must be `Send + Sync` for use in async server contexts.
///
/// # Provided implementations
///
/// - [`InMemoryTaskStore`]
/// - [`DistributedCacheTaskStore`]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Save or update a task in the store. Fails `InvalidParams` if `task.id` is empty.
    async fn save(&self, task: Task) -> A2AResult<()>;

    /// Retrieve a task by its ID. Fails `InvalidParams` if `task_id` is empty.
    /// Returns `None` if the task does not exist.
    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// Delete a task by its ID. Silently succeeds if the task does not exist.
    async fn delete(&self, task_id: &str) -> A2AResult<()>;

    /// List tasks matching the given parameters.
    async fn list(&self, params: &TaskListParams) -> A2AResult<TaskListResponse>;

    /// Atomically read-modify-write a task's status. Fails `TaskNotFound` if the
    /// task is absent. Sets `timestamp` to now.
    async fn update_status(
        &self,
        task_id: &str,
        state: TaskState,
        message: Option<Message>,
    ) -> A2AResult<TaskStatus>;

    /// Fetch a single push-notification config by `(task_id, config_id)`.
    async fn get_push_notification(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<PushNotificationConfig>>;

    /// Fetch all push-notification configs for a task, in insertion order.
    async fn get_push_notifications(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>>;

    /// Append or replace (by `(task_id, config.id)`) a push-notification config.
    /// Fails `InvalidParams` if `task_id` is empty. A `None` id is itself a valid
    /// matching key — at most one config with a given id (including `None`) is
    /// kept per task.
    async fn set_push_notification_config(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig>;
}

/// In-memory task store backed by concurrent maps.
///
/// Suitable for development, testing, and single-node deployments. All data is
/// lost when the process exits. Disjoint tasks don't contend on the same lock
/// since each map guards only its own bucket.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    insertion_order: Arc<RwLock<Vec<String>>>,
    push_configs: Arc<RwLock<HashMap<String, Vec<PushNotificationConfig>>>>,
}

impl InMemoryTaskStore {
    /// Create a new empty in-memory task store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> A2AResult<()> {
        if task.id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        let task_id = task.id.clone();
        let mut tasks = self.tasks.write().await;
        let is_new = !tasks.contains_key(&task_id);
        tasks.insert(task_id.clone(), task);

        if is_new {
            let mut order = self.insertion_order.write().await;
            order.push(task_id.clone());
        }

        debug!(task_id = %task_id, is_new = is_new, "Task saved");
        Ok(())
    }

    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>> {
        if task_id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        let tasks = self.tasks.read().await;
        let task = tasks.get(task_id).cloned();
        debug!(task_id = %task_id, found = task.is_some(), "Task lookup");
        Ok(task)
    }

    async fn delete(&self, task_id: &str) -> A2AResult<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.remove(task_id).is_some() {
            let mut order = self.insertion_order.write().await;
            order.retain(|id| id != task_id);
            debug!(task_id = %task_id, "Task deleted");
        } else {
            warn!(task_id = %task_id, "Attempted to delete non-existent task");
        }
        self.push_configs.write().await.remove(task_id);
        Ok(())
    }

    async fn list(&self, params: &TaskListParams) -> A2AResult<TaskListResponse> {
        let tasks = self.tasks.read().await;
        let order = self.insertion_order.read().await;

        let start_idx = if let Some(ref token) = params.page_token {
            match order.iter().position(|id| id == token) {
                Some(pos) => pos + 1,
                None => {
                    warn!(page_token = %token, "Invalid page token, starting from beginning");
                    0
                }
            }
        } else {
            0
        };

        let page_size = params.page_size.unwrap_or(usize::MAX);
        let mut result_tasks = Vec::new();
        let mut last_id: Option<String> = None;

        for id in order.iter().skip(start_idx) {
            if result_tasks.len() >= page_size {
                break;
            }

            if let Some(task) = tasks.get(id) {
                if let Some(ref ctx_id) = params.context_id {
                    if task.context_id != *ctx_id {
                        continue;
                    }
                }

                if let Some(ref statuses) = params.status {
                    if !statuses.contains(&task.status.state) {
                        continue;
                    }
                }

                last_id = Some(id.clone());
                result_tasks.push(task.clone());
            }
        }

        let next_page_token = if result_tasks.len() == page_size {
            if let Some(ref last) = last_id {
                let last_pos = order.iter().position(|id| id == last).unwrap_or(0);
                if last_pos + 1 < order.len() {
                    Some(last.clone())
                } else {
                    None
                }
            } else {
                None
            }
        } else {
            None
        };

        Ok(TaskListResponse {
            tasks: result_tasks,
            next_page_token,
        })
    }

    async fn update_status(
        &self,
        task_id: &str,
        state: TaskState,
        message: Option<Message>,
    ) -> A2AResult<TaskStatus> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", task_id)))?;

        let status = TaskStatus {
            state,
            message,
            timestamp: Some(Utc::now().to_rfc3339()),
        };
        task.status = status.clone();
        debug!(task_id = %task_id, ?state, "Task status updated");
        Ok(status)
    }

    async fn get_push_notification(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<PushNotificationConfig>> {
        let configs = self.push_configs.read().await;
        Ok(configs
            .get(task_id)
            .and_then(|list| list.iter().find(|c| c.id.as_deref() == Some(config_id)))
            .cloned())
    }

    async fn get_push_notifications(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>> {
        let configs = self.push_configs.read().await;
        Ok(configs.get(task_id).cloned().unwrap_or_default())
    }

    async fn set_push_notification_config(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig> {
        if config.task_id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        let mut configs = self.push_configs.write().await;
        let list = configs.entry(config.task_id.clone()).or_default();
        let new_id = config.push_notification_config.id.clone();
        list.retain(|c| c.id != new_id);
        list.push(config.push_notification_config.clone());
        debug!(task_id = %config.task_id, config_id = ?new_id, "Push notification config set");
        Ok(config.push_notification_config)
    }
}

// ---------------------------------------------------------------------------
// Distributed cache store
// ---------------------------------------------------------------------------

/// A keyed-bytes backend — the minimal shape any networked cache client exposes.
///
/// [`DistributedCacheTaskStore`] is generic over this trait so a real client
/// (Redis, memcached, an object store) can be swapped in without touching the
/// store's serialization or read-modify-write logic.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw bytes stored under `key`, if any.
    async fn get(&self, key: &str) -> A2AResult<Option<Vec<u8>>>;

    /// Overwrite the bytes stored under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> A2AResult<()>;

    /// Remove the entry stored under `key`, if any.
    async fn delete(&self, key: &str) -> A2AResult<()>;
}

/// An in-process [`CacheBackend`] — a stand-in for a networked cache client,
/// used for tests and single-node deployments. Exercises the exact same
/// serialize / read-modify-write / write-back path a real cache client would.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryCacheBackend {
    /// Create a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> A2AResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> A2AResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> A2AResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

fn task_key(task_id: &str) -> String {
    format!("task:{}", task_id)
}

fn push_config_key(task_id: &str) -> String {
    format!("task-push-notification:{}", task_id)
}

/// Task store backed by a [`CacheBackend`] — tasks and push-notification configs
/// are serialized to JSON bytes under keys `task:<id>` and
/// `task-push-notification:<id>` respectively.
///
/// No cross-process lock is held: `update_status` and `set_push_notification_config`
/// read the current bytes, apply the mutation, and write back. Under concurrent
/// writers to the same key this is last-writer-wins, matching the source
/// contract for distributed-cache-backed stores.
pub struct DistributedCacheTaskStore<B: CacheBackend> {
    backend: B,
    /// Insertion order, tracked locally since a plain keyed-bytes backend has no
    /// native listing operation.
    insertion_order: RwLock<Vec<String>>,
}

impl<B: CacheBackend> DistributedCacheTaskStore<B> {
    /// Wrap a [`CacheBackend`] as a task store.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            insertion_order: RwLock::new(Vec::new()),
        }
    }

    async fn read_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        match self.backend.get(&task_key(task_id)).await? {
            Some(bytes) => {
                let task: Task = serde_json::from_slice(&bytes).map_err(|e| {
                    A2AError::internal_error(format!("corrupt task bytes for '{}': {}", task_id, e))
                })?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn write_task(&self, task: &Task) -> A2AResult<()> {
        let bytes = serde_json::to_vec(task)
            .map_err(|e| A2AError::internal_error(format!("failed to serialize task: {}", e)))?;
        self.backend.set(&task_key(&task.id), bytes).await
    }

    async fn read_push_configs(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>> {
        match self.backend.get(&push_config_key(task_id)).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                A2AError::internal_error(format!(
                    "corrupt push-notification bytes for '{}': {}",
                    task_id, e
                ))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_push_configs(
        &self,
        task_id: &str,
        configs: &[PushNotificationConfig],
    ) -> A2AResult<()> {
        let bytes = serde_json::to_vec(configs).map_err(|e| {
            A2AError::internal_error(format!("failed to serialize push-notification configs: {}", e))
        })?;
        self.backend.set(&push_config_key(task_id), bytes).await
    }
}

#[async_trait]
impl<B: CacheBackend> TaskStore for DistributedCacheTaskStore<B> {
    async fn save(&self, task: Task) -> A2AResult<()> {
        if task.id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        let is_new = self.read_task(&task.id).await?.is_none();
        self.write_task(&task).await?;
        if is_new {
            self.insertion_order.write().await.push(task.id.clone());
        }
        Ok(())
    }

    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>> {
        if task_id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        self.read_task(task_id).await
    }

    async fn delete(&self, task_id: &str) -> A2AResult<()> {
        self.backend.delete(&task_key(task_id)).await?;
        self.backend.delete(&push_config_key(task_id)).await?;
        self.insertion_order.write().await.retain(|id| id != task_id);
        Ok(())
    }

    async fn list(&self, params: &TaskListParams) -> A2AResult<TaskListResponse> {
        let order = self.insertion_order.read().await.clone();

        let start_idx = match &params.page_token {
            Some(token) => order.iter().position(|id| id == token).map(|p| p + 1).unwrap_or(0),
            None => 0,
        };

        let page_size = params.page_size.unwrap_or(usize::MAX);
        let mut result_tasks = Vec::new();
        let mut last_id: Option<String> = None;

        for id in order.iter().skip(start_idx) {
            if result_tasks.len() >= page_size {
                break;
            }
            if let Some(task) = self.read_task(id).await? {
                if let Some(ref ctx_id) = params.context_id {
                    if task.context_id != *ctx_id {
                        continue;
                    }
                }
                if let Some(ref statuses) = params.status {
                    if !statuses.contains(&task.status.state) {
                        continue;
                    }
                }
                last_id = Some(id.clone());
                result_tasks.push(task);
            }
        }

        let next_page_token = if result_tasks.len() == page_size {
            last_id.filter(|last| {
                order.iter().position(|id| id == last).map(|p| p + 1 < order.len()).unwrap_or(false)
            })
        } else {
            None
        };

        Ok(TaskListResponse {
            tasks: result_tasks,
            next_page_token,
        })
    }

    async fn update_status(
        &self,
        task_id: &str,
        state: TaskState,
        message: Option<Message>,
    ) -> A2AResult<TaskStatus> {
        let mut task = self
            .read_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(format!("task '{}' not found", task_id)))?;

        let status = TaskStatus {
            state,
            message,
            timestamp: Some(Utc::now().to_rfc3339()),
        };
        task.status = status.clone();
        self.write_task(&task).await?;
        Ok(status)
    }

    async fn get_push_notification(
        &self,
        task_id: &str,
        config_id: &str,
    ) -> A2AResult<Option<PushNotificationConfig>> {
        let configs = self.read_push_configs(task_id).await?;
        Ok(configs.into_iter().find(|c| c.id.as_deref() == Some(config_id)))
    }

    async fn get_push_notifications(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>> {
        self.read_push_configs(task_id).await
    }

    async fn set_push_notification_config(
        &self,
        config: TaskPushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig> {
        if config.task_id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        let mut configs = self.read_push_configs(&config.task_id).await?;
        let new_id = config.push_notification_config.id.clone();
        configs.retain(|c| c.id != new_id);
        configs.push(config.push_notification_config.clone());
        self.write_push_configs(&config.task_id, &configs).await?;
        Ok(config.push_notification_config)
    }
}
