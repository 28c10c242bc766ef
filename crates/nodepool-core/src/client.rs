//! Collaborator traits consumed by the scale-in pipeline.
//!
//! Both traits are object safe so the pipeline can hold them as
//! `Arc<dyn ControlPlane>` / `Arc<dyn BusyOracle>` and share them with
//! spawned drain tasks.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;

use crate::types::{DrainMessage, FullNodeRecord, NodeRecord};

/// Drain status messages for one node, ending when the drain completes.
///
/// Dropping the stream stops monitoring.
pub type DrainStream = Pin<Box<dyn Stream<Item = DrainMessage> + Send>>;

/// Cluster control plane holding the node inventory and drain state.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// List summary records for every node in the cluster.
    async fn list_nodes(&self) -> anyhow::Result<Vec<NodeRecord>>;

    /// Fetch the full record for a single node.
    async fn node_info(&self, node_id: &str) -> anyhow::Result<FullNodeRecord>;

    /// Mark the node for draining with the given deadline.
    ///
    /// Returns the index from which drain progress should be monitored.
    async fn update_drain(&self, node_id: &str, deadline: Duration) -> anyhow::Result<u64>;

    /// Follow the drain of a node from `index` onwards.
    fn monitor_drain(&self, node_id: &str, index: u64) -> DrainStream;

    /// Node the calling process runs on, when the control plane can tell.
    ///
    /// Best effort: `Ok(None)` is a normal answer.
    async fn self_node_id(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Source of truth for which nodes currently hold active work.
#[async_trait::async_trait]
pub trait BusyOracle: Send + Sync {
    /// Busy flag per internal node ID. Nodes missing from the map are unknown.
    async fn list_busy_status(&self) -> anyhow::Result<HashMap<String, bool>>;
}
