//! Integration tests for the full task lifecycle.
//!
//! Tests cover: create -> get -> push notification config -> cancel ->
//! verify state transitions, across both the JSON-RPC and REST surfaces.

mod common;

use a2a_rs::server::InMemoryTaskStore;
use common::{
    message_send_request, message_send_with_context, start_test_server,
    start_test_server_with_store, EchoAgent,
};
use std::sync::Arc;

/// Test that a task created via message/send can be fetched again via the
/// REST mirror at GET /v1/tasks/{id}.
#[tokio::test]
async fn rest_get_task_mirrors_jsonrpc_tasks_get() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let body = message_send_request(1, "Hello via REST");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let task_id = resp["result"]["id"].as_str().unwrap();

    let rest_resp: serde_json::Value = client
        .get(format!("{}/v1/tasks/{}", base_url, task_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(rest_resp["id"], task_id);
    assert_eq!(rest_resp["status"]["state"], "completed");
}

/// Test that push notification configs can be registered and retrieved for a
/// task through the JSON-RPC surface.
#[tokio::test]
async fn push_notification_config_set_then_get_over_jsonrpc() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle) =
        start_test_server_with_store(Arc::new(EchoAgent), store.clone()).await;
    let client = reqwest::Client::new();

    let body = message_send_request(1, "Needs a webhook");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let task_id = resp["result"]["id"].as_str().unwrap().to_string();

    let set_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tasks/pushNotificationConfig/set",
        "params": {
            "id": task_id,
            "taskId": task_id,
            "pushNotificationConfig": { "url": "https://example.com/hook" }
        }
    });
    let set_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&set_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(set_resp.get("error").is_none());
    assert_eq!(set_resp["result"]["url"], "https://example.com/hook");

    let get_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tasks/pushNotificationConfig/get",
        "params": { "id": task_id }
    });
    let get_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&get_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(get_resp["result"]["url"], "https://example.com/hook");
}

/// `message_send_with_context` still threads contextId through created tasks
/// even though list-by-context is no longer exposed as a protocol method.
#[tokio::test]
async fn tasks_created_in_same_context_share_context_id() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle) =
        start_test_server_with_store(Arc::new(EchoAgent), store.clone()).await;
    let client = reqwest::Client::new();

    let ctx = "context-shared";
    let body1 = message_send_with_context(1, "Msg 1", ctx, None);
    let resp1: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body1)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let body2 = message_send_with_context(2, "Msg 2", ctx, None);
    let resp2: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body2)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp1["result"]["contextId"], ctx);
    assert_eq!(resp2["result"]["contextId"], ctx);
}

/// Test that tasks/get returns task with history.
#[tokio::test]
async fn tasks_get_includes_history() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    // Create a task
    let body = message_send_request(1, "Hello history");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Python SDK flat format: result is the task directly
    let task_id = resp["result"]["id"].as_str().unwrap();

    // Get the task
    let get_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tasks/get",
        "params": { "id": task_id }
    });

    let get_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&get_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let task = &get_resp["result"];
    // Should have history with at least the original user message
    let history = task["history"].as_array().unwrap();
    assert!(!history.is_empty(), "Expected non-empty history");

    // First message should be the user's message
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["parts"][0]["text"], "Hello history");
}

/// Test that tasks/get with historyLength trims history.
#[tokio::test]
async fn tasks_get_trims_history_by_length() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    // Create a task
    let body = message_send_request(1, "Hello");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Python SDK flat format
    let task_id = resp["result"]["id"].as_str().unwrap();

    // Get with historyLength=1
    let get_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tasks/get",
        "params": { "id": task_id, "historyLength": 1 }
    });

    let get_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&get_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let history = get_resp["result"]["history"].as_array().unwrap();
    assert!(
        history.len() <= 1,
        "Expected at most 1 history entry, got {}",
        history.len()
    );
}

/// Test that tasks/get for non-existent task returns TaskNotFound error.
#[tokio::test]
async fn tasks_get_not_found() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let get_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tasks/get",
        "params": { "id": "nonexistent-task-id" }
    });

    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&get_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(resp.get("error").is_some());
    assert_eq!(resp["error"]["code"], -32001); // TaskNotFound
}

/// Test that completed tasks cannot be canceled.
#[tokio::test]
async fn cancel_completed_task_returns_error() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    // Create and complete a task
    let body = message_send_request(1, "Complete me");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Python SDK flat format
    let task_id = resp["result"]["id"].as_str().unwrap();
    assert_eq!(resp["result"]["status"]["state"], "completed");

    // Try to cancel the completed task
    let cancel_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tasks/cancel",
        "params": { "id": task_id }
    });

    let cancel_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&cancel_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(cancel_resp.get("error").is_some());
    assert_eq!(cancel_resp["error"]["code"], -32002); // TaskNotCancelable
}

/// Test tasks/cancel for a non-existent task returns TaskNotFound.
#[tokio::test]
async fn cancel_nonexistent_task_returns_error() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let cancel_body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tasks/cancel",
        "params": { "id": "does-not-exist" }
    });

    let cancel_resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&cancel_body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(cancel_resp.get("error").is_some());
    assert_eq!(cancel_resp["error"]["code"], -32001); // TaskNotFound
}

/// Test that the result uses Python SDK flat kind-based format.
#[tokio::test]
async fn result_uses_flat_kind_format() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let body = message_send_request(1, "Check format");
    let resp: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Python SDK: SendMessageResponse serializes flat with "kind" discriminator
    assert_eq!(
        resp["result"]["kind"], "task",
        "Expected flat 'kind': 'task' in result"
    );
    assert!(
        resp["result"]["id"].is_string(),
        "Task id should be at top level of result"
    );
}
