//! Axum integration — ready-made HTTP routes for A2A servers.
//!
//! Provides an [`a2a_router`] function that creates an axum `Router` wiring
//! both the JSON-RPC surface (§4.4) and the REST mirror surface (§4.5, see
//! [`super::rest`]) onto a single [`TaskManager`].
//!
//! # Supported JSON-RPC Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | `message/send` | Send a message and get a task or message |
//! | `message/stream` | Send a message with SSE streaming |
//! | `tasks/get` | Retrieve a task by ID |
//! | `tasks/cancel` | Cancel a running task |
//! | `tasks/subscribe` | Subscribe to task updates (SSE) |
//! | `tasks/resubscribe` | Re-subscribe to a running task's stream (alias of subscribe) |
//! | `tasks/pushNotificationConfig/set` | Set push notification config |
//! | `tasks/pushNotificationConfig/get` | Get push notification config |
//!
//! JSON-RPC responses are always returned with HTTP status 200, even when
//! the envelope carries an `error` — malformed JSON and schema mismatches
//! are caught inside [`handle_jsonrpc`] itself (it takes the raw request
//! body rather than an axum `Json` extractor) so they produce a JSON-RPC
//! `error` envelope rather than a bare transport-level rejection. The one
//! exception is a request whose `Content-Type` is not `application/json`,
//! which is rejected with a bare 415 ahead of any JSON-RPC parsing.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::error::{self, A2AError};
use crate::types::{
    AgentCard, JsonRpcError as A2AJsonRpcError, PushNotificationConfig, SendMessageConfiguration,
    StreamResponse, TaskPushNotificationConfig,
};

use super::task_manager::{
    CancelTaskParams, GetTaskParams, SendMessageParams, SubscribeToTaskParams, TaskManager,
};

/// Shared state for the axum routes.
pub(super) struct AppState {
    pub(super) task_manager: Arc<TaskManager>,
    pub(super) agent_card: AgentCard,
}

/// Create an axum Router with the full A2A protocol surface: JSON-RPC
/// dispatch, the REST mirror, and agent card discovery.
///
/// # Routes
///
/// - `POST /a2a` — JSON-RPC 2.0 dispatch for all A2A methods
/// - `GET /.well-known/agent.json` — agent card discovery endpoint
/// - `GET /.well-known/agent` — deprecated agent card path (with warning)
/// - `/v1/...` — REST mirror surface, see [`super::rest`]
pub fn a2a_router(task_manager: Arc<TaskManager>, agent_card: AgentCard) -> Router {
    let state = Arc::new(AppState {
        task_manager,
        agent_card,
    });

    Router::new()
        .route("/.well-known/agent.json", get(handle_agent_card))
        .route("/.well-known/agent", get(handle_agent_card_deprecated))
        .route("/a2a", post(handle_jsonrpc))
        .merge(super::rest::rest_router())
        .with_state(state)
}

/// Serve the agent card at the well-known endpoint.
async fn handle_agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let card = state.task_manager.resolve_agent_card(&state.agent_card).await;
    Json(card).into_response()
}

/// Serve the agent card at the deprecated path (with warning).
async fn handle_agent_card_deprecated(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!(
        "Deprecated agent card endpoint '/.well-known/agent' accessed. \
         Please use '/.well-known/agent.json' instead."
    );
    let card = state.task_manager.resolve_agent_card(&state.agent_card).await;
    Json(card).into_response()
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, serde::Deserialize)]
pub(super) struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, serde::Serialize)]
pub(super) struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<A2AJsonRpcError>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(A2AJsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    fn from_a2a_error(id: Option<Value>, err: A2AError) -> Self {
        let rpc_err: A2AJsonRpcError = err.into();
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(rpc_err),
        }
    }
}

/// Main JSON-RPC dispatch handler.
///
/// Parses the incoming JSON-RPC request, routes to the appropriate task
/// manager call, and returns either a JSON response or an SSE stream.
///
/// Takes the raw body instead of an axum `Json` extractor so that malformed
/// JSON produces a JSON-RPC `ParseError` envelope (HTTP 200) rather than a
/// bare axum rejection, and so the request `id`'s JSON type can be checked
/// before anything is dispatched.
async fn handle_jsonrpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
        )
            .into_response();
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                error::PARSE_ERROR,
                format!("Invalid JSON: {}", e),
            ))
            .into_response();
        }
    };

    let raw_id = value.get("id").cloned().unwrap_or(Value::Null);
    let id = match raw_id {
        Value::Null => None,
        Value::String(_) | Value::Number(_) => Some(raw_id),
        _ => {
            return Json(JsonRpcResponse::error(
                None,
                error::INVALID_REQUEST,
                "'id' must be a string, number, or null".to_string(),
            ))
            .into_response();
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                id,
                error::INVALID_REQUEST,
                format!("Invalid JSON-RPC request: {}", e),
            ))
            .into_response();
        }
    };

    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::error(
            request.id,
            error::INVALID_REQUEST,
            "Invalid JSON-RPC version — must be \"2.0\"".to_string(),
        ))
        .into_response();
    }

    debug!(method = %request.method, "JSON-RPC request received");

    match request.method.as_str() {
        "message/send" => handle_message_send(state, request).await,
        "message/stream" => handle_message_stream(state, request).await,
        "tasks/get" => handle_tasks_get(state, request).await,
        "tasks/cancel" => handle_tasks_cancel(state, request).await,
        "tasks/subscribe" | "tasks/resubscribe" => handle_tasks_subscribe(state, request).await,
        "tasks/pushNotificationConfig/set" => {
            handle_push_notification_config_set(state, request).await
        }
        "tasks/pushNotificationConfig/get" => {
            handle_push_notification_config_get(state, request).await
        }
        method => {
            warn!(method = %method, "Unknown JSON-RPC method");
            Json(JsonRpcResponse::error(
                request.id,
                error::METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ))
            .into_response()
        }
    }
}

/// Parse `SendMessageParams` from JSON-RPC params.
fn parse_send_message_params(params: Value) -> Result<SendMessageParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;

    let message: crate::types::Message = serde_json::from_value(
        obj.get("message")
            .cloned()
            .ok_or("missing 'message' field")?,
    )
    .map_err(|e| format!("invalid message: {}", e))?;

    let configuration = obj
        .get("configuration")
        .and_then(|v| {
            if v.is_null() {
                None
            } else {
                Some(parse_send_config(v.clone()))
            }
        })
        .transpose()?;

    let metadata = obj
        .get("metadata")
        .and_then(|v| if v.is_null() { None } else { Some(v.clone()) });

    Ok(SendMessageParams {
        message,
        configuration,
        metadata,
    })
}

/// Parse `SendMessageConfiguration` from a JSON value.
fn parse_send_config(value: Value) -> Result<SendMessageConfiguration, String> {
    let obj = value.as_object().ok_or("configuration must be an object")?;

    Ok(SendMessageConfiguration {
        accepted_output_modes: obj.get("acceptedOutputModes").and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
        }),
        blocking: obj.get("blocking").and_then(|v| v.as_bool()),
        history_length: obj.get("historyLength").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                .map(|n| n as i32)
        }),
        push_notification_config: obj
            .get("pushNotificationConfig")
            .and_then(|v| {
                if v.is_null() {
                    None
                } else {
                    serde_json::from_value(v.clone()).ok()
                }
            }),
    })
}

/// Handle `message/send` — synchronous execution.
async fn handle_message_send(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_send_message_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.send_message(params).await {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                Json(JsonRpcResponse::error(
                    request.id,
                    error::INTERNAL_ERROR,
                    format!("Internal error: {}", e),
                ))
                .into_response()
            }
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `message/stream` — SSE streaming.
async fn handle_message_stream(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    if !state.agent_card.capabilities.streaming.unwrap_or(false) {
        return Json(JsonRpcResponse::error(
            request.id,
            error::UNSUPPORTED_OPERATION,
            "Streaming is not supported by the agent".to_string(),
        ))
        .into_response();
    }

    let params = match parse_send_message_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.send_message_streaming(params).await {
        Ok(rx) => {
            let stream = make_sse_stream(request.id, rx);
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/get`.
async fn handle_tasks_get(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_get_task_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.get_task(params).await {
        Ok(task) => match serde_json::to_value(&task) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/cancel`.
async fn handle_tasks_cancel(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_cancel_task_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.cancel_task(params).await {
        Ok(task) => match serde_json::to_value(&task) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/subscribe` and `tasks/resubscribe` — SSE streaming for an
/// existing task. Both methods are treated as aliases of the same operation.
async fn handle_tasks_subscribe(state: Arc<AppState>, request: JsonRpcRequest) -> Response {
    let params = match parse_subscribe_params(request.params) {
        Ok(p) => p,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.subscribe_to_task(params).await {
        Ok(rx) => {
            let stream = make_sse_stream(request.id, rx);
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/set`.
async fn handle_push_notification_config_set(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    let config: TaskPushNotificationConfig = match serde_json::from_value(request.params) {
        Ok(c) => c,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                format!("Invalid params: {}", e),
            ))
            .into_response();
        }
    };

    match state.task_manager.set_push_notification_config(config).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::error(
                request.id,
                error::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

/// Handle `tasks/pushNotificationConfig/get`.
async fn handle_push_notification_config_get(
    state: Arc<AppState>,
    request: JsonRpcRequest,
) -> Response {
    let obj = match request.params.as_object() {
        Some(o) => o,
        None => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                "params must be an object".to_string(),
            ))
            .into_response();
        }
    };

    let task_id = match obj.get("id").and_then(|v| v.as_str()) {
        Some(id) => id.to_string(),
        None => {
            return Json(JsonRpcResponse::error(
                request.id,
                error::INVALID_PARAMS,
                "missing 'id' field".to_string(),
            ))
            .into_response();
        }
    };
    let config_id = obj
        .get("pushNotificationConfigId")
        .and_then(|v| v.as_str())
        .map(String::from);

    match state
        .task_manager
        .get_push_notification_config(&task_id, config_id.as_deref())
        .await
    {
        Ok(config) => {
            let result: Option<PushNotificationConfig> = config;
            match serde_json::to_value(&result) {
                Ok(v) => Json(JsonRpcResponse::success(request.id, v)).into_response(),
                Err(e) => Json(JsonRpcResponse::error(
                    request.id,
                    error::INTERNAL_ERROR,
                    format!("Internal error: {}", e),
                ))
                .into_response(),
            }
        }
        Err(e) => Json(JsonRpcResponse::from_a2a_error(request.id, e)).into_response(),
    }
}

// ---- Parameter parsing helpers ----

fn parse_get_task_params(params: Value) -> Result<GetTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();
    let history_length = obj.get("historyLength").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .map(|n| n as i32)
    });

    Ok(GetTaskParams { id, history_length })
}

fn parse_cancel_task_params(params: Value) -> Result<CancelTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();

    Ok(CancelTaskParams { id })
}

fn parse_subscribe_params(params: Value) -> Result<SubscribeToTaskParams, String> {
    let obj = params.as_object().ok_or("params must be an object")?;
    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or("missing 'id' field")?
        .to_string();

    Ok(SubscribeToTaskParams { id })
}

// ---- SSE streaming ----

/// Create an SSE stream from a broadcast receiver, wrapping each event in a
/// JSON-RPC 2.0 success response envelope (per §4.4's streaming framing).
///
/// The stream ends when the channel is closed or a terminal status update is
/// received.
pub(super) fn make_sse_stream(
    request_id: Option<Value>,
    mut rx: broadcast::Receiver<StreamResponse>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let is_terminal = match &event {
                        StreamResponse::StatusUpdate(update) => update.r#final,
                        _ => false,
                    };

                    let event_type = match &event {
                        StreamResponse::StatusUpdate(_) => "statusUpdate",
                        StreamResponse::ArtifactUpdate(_) => "artifactUpdate",
                        StreamResponse::Task(_) => "task",
                        StreamResponse::Message(_) => "message",
                    };

                    match serde_json::to_value(&event) {
                        Ok(result_value) => {
                            let rpc_response = JsonRpcResponse::success(
                                request_id.clone(),
                                result_value,
                            );
                            match serde_json::to_string(&rpc_response) {
                                Ok(json) => {
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(json));
                                }
                                Err(e) => {
                                    error!(error = %e, "Failed to serialize SSE JSON-RPC response");
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to serialize SSE event");
                        }
                    }

                    if is_terminal {
                        yield Ok(Event::default().event("done").data(""));
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    yield Ok(Event::default().event("done").data(""));
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "SSE stream lagged — some events were missed");
                }
            }
        }
    }
}
