//! Message types for actor communication

use tokio::sync::oneshot;

use crate::Vector;

/// Commands that can be sent to a SectorProbeActor
#[derive(Debug)]
pub enum ProbeCommand {
    /// Run one sweep immediately, replying with the number of hosts probed
    ProbeNow { respond_to: oneshot::Sender<usize> },
}

/// Commands that can be sent to the MasterClientActor
#[derive(Debug)]
pub enum MasterCommand {
    /// Push the current snapshot immediately
    PushNow {
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },
}

/// Local vector handed to the co-located aggregation server
#[derive(Debug, Clone)]
pub struct LocalPush {
    pub hostname: String,
    pub vector: Vector,
}
