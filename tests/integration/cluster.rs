//! Full-cluster tests: probing, pushing and aggregation across live agents

use std::time::Duration;

use atella::vector_key;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

#[tokio::test]
async fn test_three_host_cluster_converges() {
    let (pa, pb, pc) = (free_port(), free_port(), free_port());
    let hosts = vec![
        host(pa, "a", true, &["dc1"]),
        host(pb, "b", false, &["dc1"]),
        host(pc, "c", false, &["dc1"]),
    ];

    let stop = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts.clone(), 2, fast_intervals()), &stop).await;
    let b = start_agent(create_test_config("b", hosts.clone(), 2, fast_intervals()), &stop).await;
    let c = start_agent(create_test_config("c", hosts, 2, fast_intervals()), &stop).await;

    let aggregate = a.aggregate().clone();
    wait_until(Duration::from_secs(20), || {
        let aggregate = aggregate.clone();
        async move {
            let snapshot = aggregate.snapshot().await;
            ["a", "b", "c"].iter().all(|name| {
                snapshot.get(*name).is_some_and(|vector| {
                    vector.len() == 2 && vector.values().all(|record| record.reachable)
                })
            })
        }
    })
    .await;

    let snapshot = a.aggregate().snapshot().await;
    let from_a = &snapshot["a"];
    assert!(from_a.contains_key(&vector_key("127.0.0.1", pb)));
    assert!(from_a.contains_key(&vector_key("127.0.0.1", pc)));
    assert!(!from_a.contains_key(&vector_key("127.0.0.1", pa)));
    assert_eq!(from_a[&vector_key("127.0.0.1", pb)].hostname, "b");

    // non-masters keep an empty aggregate
    assert!(b.aggregate().snapshot().await.is_empty());

    // the master serves the merged view to anyone
    let served: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{pb}/api/v1/get/vector"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(served["response"], serde_json::json!({}));

    let served: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{pa}/api/v1/get/vector"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(served["response"]["c"].as_object().unwrap().len(), 2);

    stop.cancel();
    tokio::time::timeout(Duration::from_secs(10), async {
        a.wait().await;
        b.wait().await;
        c.wait().await;
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stopped_peer_becomes_unreachable() {
    let (pa, pb) = (free_port(), free_port());
    let hosts = vec![host(pa, "a", true, &["dc1"]), host(pb, "b", false, &["dc1"])];

    let stop_a = CancellationToken::new();
    let stop_b = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts.clone(), 1, fast_intervals()), &stop_a).await;
    let b = start_agent(create_test_config("b", hosts, 1, fast_intervals()), &stop_b).await;

    let key = vector_key("127.0.0.1", pb);
    let liveness = a.liveness().clone();
    wait_until(Duration::from_secs(10), || {
        let liveness = liveness.clone();
        let key = key.clone();
        async move {
            let snapshot = liveness.snapshot().await;
            snapshot.get(&key).is_some_and(|record| record.reachable)
        }
    })
    .await;

    b.shutdown().await;

    wait_until(Duration::from_secs(10), || {
        let liveness = liveness.clone();
        let key = key.clone();
        async move {
            let snapshot = liveness.snapshot().await;
            snapshot.get(&key).is_some_and(|record| !record.reachable)
        }
    })
    .await;

    a.shutdown().await;
}

#[tokio::test]
async fn test_probes_stay_inside_sectors() {
    let (pa, pb, pc) = (free_port(), free_port(), free_port());
    let hosts = vec![
        host(pa, "a", true, &["dc1"]),
        host(pb, "b", false, &["dc1"]),
        host(pc, "c", false, &["dc2"]),
    ];

    let stop = CancellationToken::new();
    let a = start_agent(create_test_config("a", hosts.clone(), 5, manual_intervals()), &stop).await;
    let b = start_agent(create_test_config("b", hosts.clone(), 5, manual_intervals()), &stop).await;
    let c = start_agent(create_test_config("c", hosts, 5, manual_intervals()), &stop).await;

    for probe in a.probes() {
        probe.probe_now().await.unwrap();
    }

    let vector = a.liveness().snapshot().await;
    assert_eq!(vector.len(), 1);
    assert!(vector[&vector_key("127.0.0.1", pb)].reachable);

    // c is alone in dc2 and has nothing to probe
    assert!(c.probes().iter().all(|probe| probe.targets().is_empty()));

    stop.cancel();
    a.wait().await;
    b.wait().await;
    c.wait().await;
}
