//! Reporter delivering queued messages to real channel back-ends

use atella::{
    config::{ReporterConfig, Webhook},
    reporter::{
        Reporter,
        channels::{ChannelRegistry, WebhookChannel},
    },
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reporter_config(dir: &std::path::Path) -> ReporterConfig {
    ReporterConfig {
        message_path: dir.to_path_buf(),
        hex_len: 10,
        interval: 1,
        max_attempts: 2,
    }
}

#[tokio::test]
async fn test_report_reaches_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(
        WebhookChannel::new(Webhook {
            url: format!("{}/alerts", server.uri()),
            enabled: true,
        })
        .unwrap(),
    ));

    let dir = tempfile::tempdir().unwrap();
    let reporter = Reporter::new(&reporter_config(dir.path()), "node-a", registry).unwrap();

    let tickets = reporter.report("host b is down", "all").await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].len(), 20);

    let stats = reporter.send_pending().await.unwrap().unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["hostname"], "node-a");
    assert_eq!(body["message"], "host b is down");
}

#[tokio::test]
async fn test_queue_survives_failing_webhook_until_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(
        WebhookChannel::new(Webhook {
            url: server.uri(),
            enabled: true,
        })
        .unwrap(),
    ));

    let dir = tempfile::tempdir().unwrap();
    let reporter = Reporter::new(&reporter_config(dir.path()), "node-a", registry).unwrap();
    reporter.report("flaky", "webhook").await.unwrap();

    let first = reporter.send_pending().await.unwrap().unwrap();
    assert_eq!(first.retried, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let second = reporter.send_pending().await.unwrap().unwrap();
    assert_eq!(second.dropped, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
