//! REST mirror surface — the HTTP+JSON alternative to the JSON-RPC endpoint.
//!
//! Every route here forwards to the same [`TaskManager`] used by
//! [`super::axum_integration`]; this module only owns request parsing,
//! response shaping, and the REST-specific error→status mapping.
//!
//! Colon-suffixed "custom methods" (`:cancel`, `:subscribe`, `:send`,
//! `:stream`) that fall on a *static* path segment (`message:send`,
//! `message:stream`) are registered as literal routes. Those that fall on a
//! *dynamic* segment (`tasks/{id}:cancel`, `tasks/{id}:subscribe`) can't be
//! expressed as two colliding axum routes on the same method + pattern, so
//! the single `{id}` capture is split on `:` by the handler instead.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::A2AError;
use crate::types::{Message, PushNotificationConfig, SendMessageConfiguration, StreamResponse, TaskPushNotificationConfig};

use super::axum_integration::AppState;
use super::task_manager::{CancelTaskParams, GetTaskParams, SendMessageParams, SubscribeToTaskParams};

/// Build the `/v1/...` REST routes. Merged into [`super::axum_integration::a2a_router`].
pub(super) fn rest_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/card", get(get_card))
        .route("/v1/message:send", post(post_message_send))
        .route("/v1/message:stream", post(post_message_stream))
        .route(
            "/v1/tasks/{id}",
            get(get_task_or_subscribe).post(post_task_action),
        )
        .route(
            "/v1/tasks/{id}/pushNotificationConfigs",
            post(post_push_notification_config).get(get_push_notification_config_default),
        )
        .route(
            "/v1/tasks/{id}/pushNotificationConfigs/{config_id}",
            get(get_push_notification_config),
        )
}

/// Maps an [`A2AError`] to its REST status code per the error taxonomy.
fn status_for(err: &A2AError) -> StatusCode {
    match err {
        A2AError::TaskNotFound { .. } | A2AError::MethodNotFound { .. } => StatusCode::NOT_FOUND,
        A2AError::InvalidRequest { .. }
        | A2AError::InvalidParams { .. }
        | A2AError::TaskNotCancelable { .. }
        | A2AError::UnsupportedOperation { .. }
        | A2AError::PushNotificationNotSupported { .. }
        | A2AError::ParseError { .. } => StatusCode::BAD_REQUEST,
        A2AError::ContentTypeNotSupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: A2AError) -> Response {
    let status = status_for(&err);
    let code = err.code();
    let message = err.to_string();
    (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
}

fn ok_json<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(v) => Json(v).into_response(),
        Err(e) => error_response(A2AError::internal_error(e.to_string())),
    }
}

async fn get_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let card = state.task_manager.resolve_agent_card(&state.agent_card).await;
    Json(card)
}

#[derive(Debug, serde::Deserialize)]
struct SendMessageBody {
    message: Message,
    #[serde(default)]
    configuration: Option<SendMessageConfiguration>,
    #[serde(default)]
    metadata: Option<Value>,
}

async fn post_message_send(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendMessageBody>,
) -> Response {
    let params = SendMessageParams {
        message: body.message,
        configuration: body.configuration,
        metadata: body.metadata,
    };

    match state.task_manager.send_message(params).await {
        Ok(response) => ok_json(&response),
        Err(e) => error_response(e),
    }
}

async fn post_message_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendMessageBody>,
) -> Response {
    if !state.agent_card.capabilities.streaming.unwrap_or(false) {
        return error_response(A2AError::unsupported_operation(
            "Streaming is not supported by the agent",
        ));
    }

    let params = SendMessageParams {
        message: body.message,
        configuration: body.configuration,
        metadata: body.metadata,
    };

    match state.task_manager.send_message_streaming(params).await {
        Ok(rx) => Sse::new(rest_sse_stream(rx))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Splits a path segment on the last `:`, returning `(id, Some(action))` if
/// a colon-suffixed custom method is present, else `(id, None)`.
fn split_action(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once(':') {
        Some((id, action)) => (id, Some(action)),
        None => (raw, None),
    }
}

async fn get_task_or_subscribe(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let (id, action) = split_action(&raw_id);

    match action {
        Some("subscribe") => {
            let params = SubscribeToTaskParams { id: id.to_string() };
            match state.task_manager.subscribe_to_task(params).await {
                Ok(rx) => Sse::new(rest_sse_stream(rx))
                    .keep_alive(KeepAlive::default())
                    .into_response(),
                Err(e) => error_response(e),
            }
        }
        Some(other) => error_response(A2AError::invalid_request(format!(
            "unknown task action '{}'",
            other
        ))),
        None => {
            let history_length = query
                .get("historyLength")
                .and_then(|s| s.parse::<i32>().ok());
            let params = GetTaskParams {
                id: id.to_string(),
                history_length,
            };
            match state.task_manager.get_task(params).await {
                Ok(task) => ok_json(&task),
                Err(e) => error_response(e),
            }
        }
    }
}

async fn post_task_action(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let (id, action) = split_action(&raw_id);

    match action {
        Some("cancel") => {
            let params = CancelTaskParams { id: id.to_string() };
            match state.task_manager.cancel_task(params).await {
                Ok(task) => ok_json(&task),
                Err(e) => error_response(e),
            }
        }
        _ => error_response(A2AError::invalid_request(
            "expected 'tasks/{id}:cancel'",
        )),
    }
}

async fn post_push_notification_config(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(config): Json<PushNotificationConfig>,
) -> Response {
    let wrapped = TaskPushNotificationConfig {
        id: config.id.clone(),
        task_id,
        push_notification_config: config,
        tenant: None,
    };

    match state.task_manager.set_push_notification_config(wrapped).await {
        Ok(result) => ok_json(&result),
        Err(e) => error_response(e),
    }
}

async fn get_push_notification_config_default(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Response {
    match state
        .task_manager
        .get_push_notification_config(&task_id, None)
        .await
    {
        Ok(config) => ok_json(&config),
        Err(e) => error_response(e),
    }
}

async fn get_push_notification_config(
    State(state): State<Arc<AppState>>,
    Path((task_id, config_id)): Path<(String, String)>,
) -> Response {
    match state
        .task_manager
        .get_push_notification_config(&task_id, Some(&config_id))
        .await
    {
        Ok(Some(config)) => ok_json(&config),
        Ok(None) => error_response(A2AError::task_not_found(format!(
            "no push notification config '{}' for task '{}'",
            config_id, task_id
        ))),
        Err(e) => error_response(e),
    }
}

/// Plain `data: <json>\n\n` SSE framing — the `A2AEvent` itself, with no
/// JSON-RPC envelope (unlike the JSON-RPC endpoint's streams).
fn rest_sse_stream(
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

                    match serde_json::to_string(&event) {
                        Ok(json) => yield Ok(Event::default().data(json)),
                        Err(e) => tracing::error!(error = %e, "Failed to serialize REST SSE event"),
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
                    warn!(missed = n, "REST SSE stream lagged — some events were missed");
                }
            }
        }
    }
}
