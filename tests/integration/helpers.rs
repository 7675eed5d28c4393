//! Helper functions for integration tests

use std::future::Future;
use std::time::Duration;

use atella::{
    agent::{Agent, AgentOptions},
    config::{Config, Intervals, parse_config},
    topology::HostEntry,
};
use tokio_util::sync::CancellationToken;

pub const SECRET: &str = "s3cret";

/// Port that was free a moment ago
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn host(port: u16, hostname: &str, master: bool, sectors: &[&str]) -> HostEntry {
    HostEntry {
        address: "127.0.0.1".to_string(),
        port,
        hostname: hostname.to_string(),
        web_facing: false,
        master,
        sectors: sectors.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn fast_intervals() -> Intervals {
    Intervals {
        probe: 1,
        push: 1,
        timeout: 2,
    }
}

/// Intervals long enough that only explicit commands trigger work
pub fn manual_intervals() -> Intervals {
    Intervals {
        probe: 3600,
        push: 3600,
        timeout: 2,
    }
}

pub fn create_test_config(
    hostname: &str,
    hosts: Vec<HostEntry>,
    connectivity: i64,
    intervals: Intervals,
) -> Config {
    let mut config = parse_config(r#"{ "listen": "127.0.0.1" }"#).unwrap();
    config.hostname = Some(hostname.to_string());
    config.security = SECRET.to_string();
    config.connectivity = connectivity;
    config.intervals = intervals;
    config.hosts = hosts;
    config
}

pub async fn start_agent(config: Config, stop: &CancellationToken) -> Agent {
    let hostname = config.hostname.clone().unwrap();
    Agent::start(
        config,
        &hostname,
        AgentOptions {
            without_reporter: true,
        },
        stop.clone(),
    )
    .await
    .unwrap()
}

/// Poll `condition` until it holds, panicking after `timeout`
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(timeout, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
