//! Busy-node filter.
//!
//! Drops nodes the busy oracle reports as holding active work. A node the
//! oracle has no entry for is treated as idle.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use nodepool_core::{BusyOracle, NodeId, ScaleInError, ScaleInResult};

/// Filters candidate nodes through a caller-owned [`BusyOracle`].
pub struct BusyFilter {
    oracle: Arc<dyn BusyOracle>,
}

impl BusyFilter {
    /// Create a filter backed by `oracle`.
    pub fn new(oracle: Arc<dyn BusyOracle>) -> Self {
        Self { oracle }
    }

    /// Query the oracle once and keep the idle or unknown nodes.
    ///
    /// An oracle failure is returned as [`ScaleInError::OracleUnavailable`]
    /// with nothing filtered; the caller decides what to do with it.
    pub async fn filter(&self, nodes: Vec<NodeId>) -> ScaleInResult<Vec<NodeId>> {
        let status = self
            .oracle
            .list_busy_status()
            .await
            .map_err(|e| ScaleInError::OracleUnavailable(format!("{e:#}")))?;

        Ok(retain_idle(nodes, &status))
    }
}

/// Keep nodes that are not marked busy in `status`.
pub fn retain_idle(nodes: Vec<NodeId>, status: &HashMap<String, bool>) -> Vec<NodeId> {
    nodes
        .into_iter()
        .filter(|node| match status.get(&node.internal_id) {
            Some(true) => {
                debug!(node_id = %node.internal_id, remote_id = %node.remote_id, "identified busy node");
                false
            }
            _ => true,
        })
        .collect()
}
