//! # a2a-rs — Rust SDK for the Agent-to-Agent (A2A) Protocol v0.3
//!
//! This crate provides a Rust implementation of the server-side
//! [A2A protocol](https://a2a-protocol.org/latest/specification/) runtime,
//! letting a host application expose an agent over JSON-RPC 2.0 and a REST
//! mirror, with real-time streaming via Server-Sent Events (SSE).
//!
//! ## Overview
//!
//! The A2A protocol lets agents:
//! - Receive messages and respond with task-based results
//! - Stream real-time status and artifact updates via SSE
//! - Maintain multi-turn conversations with context tracking
//! - Cancel running tasks
//! - Register push notification configs for out-of-band task updates
//!
//! This crate provides:
//! - **Complete type definitions** matching the A2A v0.3 protobuf specification
//! - **Task manager** coordinating task lifecycle, persistence, and event fan-out ([`server::TaskManager`])
//! - **Agent hooks** — the extension points a host implements to plug in agent logic ([`server::AgentHooks`])
//! - **Ready-made HTTP routes** for both JSON-RPC and REST surfaces ([`server::a2a_router`])
//! - **Ergonomic builders** for constructing complex types ([`AgentCardBuilder`], [`ServerBuilder`])
//!
//! ## Quick Start
//!
//! Implement [`server::AgentHooks`] to define your agent's behavior:
//!
//! ```rust,ignore
//! use a2a_rs::server::{AgentHooks, EventQueue, TaskUpdater};
//! use a2a_rs::types::{Part, Task};
//! use a2a_rs::error::A2AResult;
//! use async_trait::async_trait;
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl AgentHooks for EchoAgent {
//!     async fn on_task_created(&self, task: &Task, events: &EventQueue) -> A2AResult<()> {
//!         let updater = TaskUpdater::new(events.clone(), task.id.clone(), task.context_id.clone());
//!
//!         let text = task
//!             .status
//!             .message
//!             .as_ref()
//!             .and_then(|m| m.parts.iter().find_map(|p| match p {
//!                 Part::Text { text, .. } => Some(text.clone()),
//!                 _ => None,
//!             }))
//!             .unwrap_or_else(|| "No text received".to_string());
//!
//!         updater.complete(Some(&format!("Echo: {}", text))).await?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Then wire up the HTTP server:
//!
//! ```rust,ignore
//! use a2a_rs::server::{a2a_router, InMemoryTaskStore, TaskManager};
//! use a2a_rs::AgentCardBuilder;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent_card = AgentCardBuilder::new("Echo Agent", "Echoes back your messages", "1.0.0")
//!         .with_jsonrpc_interface("http://localhost:3000/a2a")
//!         .with_streaming(true)
//!         .build();
//!
//!     let hooks = Arc::new(EchoAgent);
//!     let store = Arc::new(InMemoryTaskStore::new());
//!     let manager = Arc::new(TaskManager::new(store, hooks));
//!
//!     let app = a2a_router(manager, agent_card);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! The router provides:
//! - `POST /a2a` — JSON-RPC 2.0 endpoint for all A2A methods
//! - `GET /.well-known/agent.json` — Agent card discovery
//! - `/v1/...` — REST mirror of the same operations
//!
//! ## Protocol Compliance
//!
//! This crate implements **A2A protocol v0.3** as defined in the
//! [official specification](https://a2a-protocol.org/latest/specification/).
//!
//! All types match the protobuf definitions at
//! [`a2a.proto`](https://github.com/a2aproject/A2A/blob/main/specification/a2a.proto).
//!
//! Supported JSON-RPC methods:
//! - `message/send` — Send a message and get a task or direct reply
//! - `message/stream` — Send a message with SSE streaming
//! - `tasks/get` — Retrieve a task by ID
//! - `tasks/cancel` — Cancel a running task
//! - `tasks/subscribe` / `tasks/resubscribe` — Subscribe to task updates (SSE)
//! - `tasks/pushNotificationConfig/set` — Register a push notification config
//! - `tasks/pushNotificationConfig/get` — Retrieve a push notification config
//!
//! ## Architecture
//!
//! - [`server::AgentHooks`] — Trait for plugging agent logic into the task lifecycle
//! - [`server::TaskManager`] — Coordinates task lifecycle, persistence, and event fan-out
//! - [`server::TaskStore`] — Trait for task persistence
//! - [`server::InMemoryTaskStore`] / [`server::DistributedCacheTaskStore`] — Task store implementations
//! - [`server::EventQueue`] — Broadcast channel for SSE events
//! - [`server::TaskUpdater`] — Helper for publishing task status/artifact updates
//! - [`server::a2a_router`] — Creates an axum `Router` with the JSON-RPC and REST routes
//!
//! ### Core Types
//!
//! - [`types::Task`] — A2A task with status, history, and artifacts
//! - [`types::Message`] — A message with text/file/data parts
//! - [`types::Part`] — Content part (text, file, or structured data)
//! - [`types::TaskState`] — Task lifecycle state machine
//! - [`types::StreamResponse`] — SSE event types (status updates, artifact updates)
//! - [`types::AgentCard`] — Agent metadata and capabilities
//! - [`error::A2AError`] — Error types with JSON-RPC error codes

pub mod builders;
pub mod error;
pub mod server;
pub mod types;
pub mod utils;

/// Prelude module that re-exports commonly used types and traits.
///
/// Import this module with `use a2a_rs::prelude::*;` to get access to the most
/// frequently used types without having to import them individually.
///
/// # Example
///
/// ```
/// use a2a_rs::prelude::*;
///
/// // Now you have access to common types like:
/// // - Message, Part, Task, TaskState, Role
/// // - AgentCard, AgentSkill, AgentCapabilities
/// // - A2AError, A2AResult
/// // - builders like AgentCardBuilder, ServerBuilder
/// ```
pub mod prelude {
    // Core types
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentInterface, AgentSkill, Artifact, FileContent,
        FileWithBytes, FileWithUri, Message, Part, Role, SendMessageConfiguration,
        SendMessageParams, StreamResponse, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus,
        TaskStatusUpdateEvent,
    };

    // Error types
    pub use crate::error::{A2AError, A2AResult};

    // Builders
    pub use crate::builders::{AgentCardBuilder, ServerBuilder};

    // Server framework
    pub use crate::server::{
        a2a_router, AgentHooks, EventConsumer, EventQueue, InMemoryQueueManager,
        InMemoryTaskStore, NoopHooks, QueueManager, TaskManager, TaskStore, TaskUpdater,
    };
}

// Re-export core types at crate root for convenience.
pub use builders::{AgentCardBuilder, ServerBuilder};
pub use error::{A2AError, A2AResult};
pub use types::*;
