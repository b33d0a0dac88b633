//! End-to-end request/response over Zenoh.
//!
//! Note: Zenoh requires multi-thread tokio runtime.
//! Each test uses a unique key prefix to avoid interference.

mod common;

use std::sync::Arc;
use std::time::Duration;

use zenoh_bridge_ethernetip::messages::{ReadResponse, WriteResponse};
use zenoh_bridge_ethernetip::router::{self, Router};
use zensight_bridge_framework::{BridgeError, Publisher};

/// Generate a unique test prefix to avoid test interference.
fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}/ethernetip", nanos)
}

/// Start a listener and two workers on `prefix` backed by the in-memory plant.
async fn start_bridge(session: Arc<zenoh::Session>, prefix: &str) -> common::MockDevice {
    let (device, ctx) = common::plant();
    let (queue, jobs) = router::job_queue(8);
    let publisher = Publisher::new(session.clone(), prefix);

    for id in 0..2 {
        tokio::spawn(router::run_worker(
            id,
            ctx.clone(),
            jobs.clone(),
            publisher.clone(),
        ));
    }
    let request_router = Router::new(prefix, queue);
    let subscriber = request_router
        .listen(&session)
        .await
        .expect("Failed to subscribe to requests");
    tokio::spawn(router::run_listener(subscriber, request_router));

    // Give the subscriber time to set up
    tokio::time::sleep(Duration::from_millis(200)).await;
    device
}

async fn request<T: serde::de::DeserializeOwned>(
    session: &zenoh::Session,
    prefix: &str,
    category: &str,
    body: &str,
) -> T {
    let subscriber = session
        .declare_subscriber(format!("{}/{}/response", prefix, category))
        .await
        .expect("Failed to create subscriber");
    tokio::time::sleep(Duration::from_millis(100)).await;

    session
        .put(format!("{}/{}", prefix, category), body.as_bytes().to_vec())
        .await
        .expect("Failed to publish");

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
        .await
        .expect("Timeout waiting for response")
        .expect("Failed to receive response");

    let payload = received.payload().to_bytes();
    serde_json::from_slice(&payload).expect("Failed to decode response")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_read_request_round_trip() {
    let prefix = unique_prefix();
    let session = Arc::new(
        zenoh::open(zenoh::Config::default())
            .await
            .expect("Failed to open Zenoh session"),
    );
    start_bridge(session.clone(), &prefix).await;

    let response: ReadResponse =
        request(&session, &prefix, "read", r#"{"tags":["Temperature"]}"#).await;

    assert!(response.success);
    assert_eq!(response.error_message, "");
    assert_eq!(
        serde_json::to_value(&response.data["Temperature"].value).unwrap(),
        "72F"
    );

    let response: ReadResponse =
        request(&session, &prefix, "read", r#"{"tags":["GhostTag"]}"#).await;
    assert!(!response.success);
    assert!(!response.error_message.is_empty());
    assert!(!response.data.contains_key("GhostTag"));

    session.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_request_round_trip() {
    let prefix = unique_prefix();
    let session = Arc::new(
        zenoh::open(zenoh::Config::default())
            .await
            .expect("Failed to open Zenoh session"),
    );
    let device = start_bridge(session.clone(), &prefix).await;

    let response: WriteResponse = request(
        &session,
        &prefix,
        "write",
        r#"{"node_id":"Count","value":7}"#,
    )
    .await;

    assert!(response.success, "{}", response.error_message);
    assert_eq!(response.node_id, "Count");
    assert_eq!(device.writes().len(), 1);

    session.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscribe_request_is_refused() {
    let prefix = unique_prefix();
    let session = Arc::new(
        zenoh::open(zenoh::Config::default())
            .await
            .expect("Failed to open Zenoh session"),
    );
    start_bridge(session.clone(), &prefix).await;

    let response: serde_json::Value = request(
        &session,
        &prefix,
        "subscribe",
        r#"{"request_type":"create"}"#,
    )
    .await;

    assert_eq!(response["success"], false);
    assert_eq!(response["request_type"], "create");
    assert!(
        response["error_message"]
            .as_str()
            .unwrap()
            .contains("not supported")
    );

    session.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listen_fails_on_invalid_prefix() {
    let session = zenoh::open(zenoh::Config::default())
        .await
        .expect("Failed to open Zenoh session");
    let (queue, _jobs) = router::job_queue(1);

    let result = Router::new("bad//prefix", queue).listen(&session).await;
    match result {
        Err(BridgeError::Subscribe { key, .. }) => assert_eq!(key, "bad//prefix/**"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("subscribed to an invalid key expression"),
    }

    session.close().await.expect("Failed to close session");
}
