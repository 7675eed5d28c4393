//! In-process ingestion path for the co-located master client
//!
//! Local pushes skip HTTP and authentication and are stored under the
//! hostname they carry.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::actors::messages::LocalPush;
use crate::vector::AggregateVectorStore;

#[instrument(skip_all)]
async fn run_local_ingest(
    mut rx: mpsc::Receiver<LocalPush>,
    aggregate: AggregateVectorStore,
    stop: CancellationToken,
) {
    debug!("start master server");

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            push = rx.recv() => match push {
                Some(LocalPush { hostname, vector }) => {
                    aggregate.set_for_host(&hostname, vector).await;
                }
                None => break,
            }
        }
    }

    debug!("local ingestion stopped");
}

/// Spawn the task feeding local pushes into `aggregate`
pub fn spawn_local_ingest(
    rx: mpsc::Receiver<LocalPush>,
    aggregate: AggregateVectorStore,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_local_ingest(rx, aggregate, stop))
}
