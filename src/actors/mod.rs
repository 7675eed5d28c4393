//! Long-running monitoring tasks
//!
//! Every actor runs as an independent tokio task and stops when the shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is cancelled.
//!
//! ```text
//!   Topology ──spawns──► SectorProbeActor (one per local sector)
//!                            │ set()
//!                            ▼
//!                    LivenessVectorStore
//!                            │ snapshot()
//!                            ▼
//!                     MasterClientActor ──HTTP POST /api/v1/set/vector──► remote master
//!                            │
//!                            └──mpsc (LocalPush)──► local aggregation server
//! ```
//!
//! Each actor is driven by a ticker, its command channel and the stop
//! signal. A stop request is observed between iterations; an in-flight sweep
//! or push is allowed to finish.

pub mod master;
pub mod messages;
pub mod probe;
