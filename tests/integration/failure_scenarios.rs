//! Failure handling between live agents

use std::time::Duration;

use atella::actors::master::Election;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

#[tokio::test]
async fn test_push_with_wrong_secret_is_refused() {
    let (pa, pb) = (free_port(), free_port());
    let hosts = vec![host(pa, "a", true, &["dc1"]), host(pb, "b", false, &["dc1"])];

    let stop = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts.clone(), 1, manual_intervals()), &stop).await;

    let mut config = create_test_config("b", hosts, 1, manual_intervals());
    config.security = "not-the-secret".to_string();
    let b = start_agent(config, &stop).await;

    assert_eq!(b.election(), Election::Remote(0));
    let err = b.master().push_now().await.unwrap_err();
    assert!(format!("{err:#}").contains("401"));
    assert!(a.aggregate().get_for_host("b").await.is_none());

    stop.cancel();
    a.wait().await;
    b.wait().await;
}

#[tokio::test]
async fn test_push_to_non_master_is_not_acceptable() {
    let (pa, pb) = (free_port(), free_port());
    // b believes a is master, a's own config says nobody is
    let hosts_seen_by_b = vec![host(pa, "a", true, &[]), host(pb, "b", false, &[])];
    let hosts_seen_by_a = vec![host(pa, "a", false, &[]), host(pb, "b", false, &[])];

    let stop = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts_seen_by_a, 1, manual_intervals()), &stop).await;
    let b = start_agent(create_test_config("b", hosts_seen_by_b, 1, manual_intervals()), &stop).await;

    assert_eq!(a.election(), Election::Unavailable);
    let err = b.master().push_now().await.unwrap_err();
    assert!(format!("{err:#}").contains("406"));

    stop.cancel();
    a.wait().await;
    b.wait().await;
}

#[tokio::test]
async fn test_unreachable_master_does_not_stop_the_client() {
    let (pa, pb) = (free_port(), free_port());
    let hosts = vec![host(pa, "a", true, &["dc1"]), host(pb, "b", false, &["dc1"])];

    // a is never started
    let stop = CancellationToken::new();
    let b = start_agent(create_test_config("b", hosts, 1, manual_intervals()), &stop).await;

    assert!(b.master().push_now().await.is_err());
    assert!(b.master().push_now().await.is_err());
    assert!(!b.master().is_finished());

    for probe in b.probes() {
        probe.probe_now().await.unwrap();
    }
    let vector = b.liveness().snapshot().await;
    assert_eq!(vector.len(), 1);
    assert!(vector.values().all(|record| !record.reachable));

    stop.cancel();
    tokio::time::timeout(Duration::from_secs(5), b.wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_without_master_client_exits() {
    let pa = free_port();
    let hosts = vec![host(pa, "a", false, &[])];

    let stop = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts, 1, manual_intervals()), &stop).await;

    wait_until(Duration::from_secs(2), || {
        let finished = a.master().is_finished();
        async move { finished }
    })
    .await;

    // the server keeps answering probes
    let hostname: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{pa}/api/v1/get/hostname"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hostname["response"], "a");

    a.shutdown().await;
}
