//! Concurrent health-record stores
//!
//! - [`LivenessVectorStore`]: what the local host has observed about its peers.
//!   Written by the sector probe workers, snapshotted by the master client.
//! - [`AggregateVectorStore`]: the cluster view held by the master, one
//!   sub-vector per reporting host.
//!
//! Both wrap their map in a single `RwLock`. The raw map is never handed out;
//! readers receive owned snapshots taken under the read lock, so no caller
//! holds the lock across a network call.

pub mod aggregate;
pub mod liveness;

pub use aggregate::AggregateVectorStore;
pub use liveness::LivenessVectorStore;
