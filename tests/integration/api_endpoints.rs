//! Integration tests for the HTTP API over real sockets

use atella::{
    HealthRecord, Vector, VERSION,
    actors::master::AUTH_HEADER,
    api::{ApiState, spawn_server},
    vector::AggregateVectorStore,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::helpers::SECRET;

async fn spawn_test_api(is_master: bool) -> (SocketAddr, AggregateVectorStore, CancellationToken) {
    let aggregate = AggregateVectorStore::new();
    let stop = CancellationToken::new();
    let state = ApiState::new("node-a", SECRET, is_master, aggregate.clone());

    let handle = spawn_server(&["127.0.0.1:0".parse().unwrap()], state, stop.clone())
        .await
        .unwrap();

    (handle.addrs()[0], aggregate, stop)
}

fn sample_vector(port: u16) -> Vector {
    [(
        format!("10.0.0.9:{port}"),
        HealthRecord::new("10.0.0.9", port, "z")
            .with_reachable(true)
            .with_timestamp(1700000000),
    )]
    .into_iter()
    .collect()
}

async fn push(addr: SocketAddr, secret: &str, hostname: &str, vector: &Vector) -> StatusCode {
    let encoded = serde_json::to_string(vector).unwrap();
    reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/set/vector"))
        .header(AUTH_HEADER, secret)
        .form(&[("hostname", hostname), ("vector", encoded.as_str())])
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_identity_over_http() {
    let (addr, _, stop) = spawn_test_api(false).await;

    let host: Value = reqwest::get(format!("http://{addr}/api/v1/get/host"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        host,
        json!({ "response": { "hostname": "node-a", "version": VERSION } })
    );

    let response = reqwest::get(format!("http://{addr}/api/v1/does/not/exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    stop.cancel();
}

#[tokio::test]
async fn test_push_replaces_previous_vector() {
    let (addr, aggregate, stop) = spawn_test_api(true).await;

    assert_eq!(push(addr, SECRET, "h1", &sample_vector(1)).await, StatusCode::OK);
    assert_eq!(push(addr, SECRET, "h2", &sample_vector(2)).await, StatusCode::OK);
    assert_eq!(push(addr, SECRET, "h1", &sample_vector(3)).await, StatusCode::OK);

    let snapshot = aggregate.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["h1"], sample_vector(3));
    assert_eq!(snapshot["h2"], sample_vector(2));

    let served: Value = reqwest::get(format!("http://{addr}/api/v1/get/vector"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(served["response"]["h1"]["10.0.0.9:3"]["hostname"], "z");
    assert_eq!(served["response"]["h1"]["10.0.0.9:3"]["reachable"], true);

    stop.cancel();
}

#[tokio::test]
async fn test_push_status_codes() {
    let (master, aggregate, stop_master) = spawn_test_api(true).await;
    let (peer, _, stop_peer) = spawn_test_api(false).await;
    let vector = sample_vector(1);

    assert_eq!(push(peer, SECRET, "h1", &vector).await, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(push(master, "wrong", "h1", &vector).await, StatusCode::UNAUTHORIZED);
    assert_eq!(push(master, "", "h1", &vector).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        push(master, SECRET, "", &vector).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let response = reqwest::get(format!("http://{master}/api/v1/set/vector"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    assert!(aggregate.snapshot().await.is_empty());

    stop_master.cancel();
    stop_peer.cancel();
}
