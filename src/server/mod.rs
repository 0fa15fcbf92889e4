//! A2A server framework — traits and implementations for building A2A agents.
//!
//! - [`AgentHooks`] trait + [`NoopHooks`] — the extension points a host
//!   implements to plug agent logic into the task manager
//! - [`TaskStore`] trait + [`InMemoryTaskStore`] / [`DistributedCacheTaskStore`]
//!   — task persistence
//! - [`TaskUpdater`] — thread-safe task state transition helper
//! - [`EventQueue`] — broadcast channel for streaming events
//! - [`QueueManager`] trait + [`InMemoryQueueManager`] — per-task queue management
//! - [`EventConsumer`] — consumes events from a queue (one-shot or streaming)
//! - [`TaskManager`] — task lifecycle coordinator, called directly by both
//!   protocol surfaces
//! - [`a2a_router`] — ready-made axum routes (JSON-RPC + REST) for A2A servers
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_rs::server::*;
//! use a2a_rs::types::AgentCard;
//!
//! // 1. Implement your agent logic as hooks.
//! struct EchoAgent;
//!
//! #[async_trait::async_trait]
//! impl AgentHooks for EchoAgent {
//!     async fn on_task_created(&self, task: &Task, events: &EventQueue) -> a2a_rs::A2AResult<()> {
//!         let updater = TaskUpdater::new(events.clone(), task.id.clone(), task.context_id.clone());
//!         updater.start_work(Some("Processing...")).await?;
//!         updater.complete(Some("Done!")).await?;
//!         Ok(())
//!     }
//! }
//!
//! // 2. Wire up the server.
//! let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
//! let hooks: Arc<dyn AgentHooks> = Arc::new(EchoAgent);
//! let manager = Arc::new(TaskManager::new(store, hooks));
//!
//! // 3. Create the router and serve.
//! let app = a2a_router(manager, agent_card);
//! ```

pub mod agent_hooks;
pub mod axum_integration;
pub mod event_queue;
pub mod rest;
pub mod task_manager;
pub mod task_store;
pub mod task_updater;

// Re-export key types at the server module level for convenience.
pub use crate::types::SendMessageResponse;
pub use agent_hooks::{AgentHooks, NoopHooks};
pub use axum_integration::a2a_router;
pub use event_queue::{
    EventConsumer, EventQueue, InMemoryQueueManager, NoTaskQueue, QueueManager, TaskQueueExists,
};
pub use task_manager::{
    CancelTaskParams, GetTaskParams, SendMessageParams, SubscribeToTaskParams, TaskManager,
};
pub use task_store::{
    CacheBackend, DistributedCacheTaskStore, InMemoryCacheBackend, InMemoryTaskStore,
    TaskListParams, TaskListResponse, TaskStore,
};
pub use task_updater::TaskUpdater;
