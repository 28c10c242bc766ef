//! Drain coordinator: drains nodes concurrently and joins their outcomes.
//!
//! One task is spawned per node. Each task marks its node for draining and
//! then follows the control plane's drain monitor stream until it closes, an
//! `error`-severity message arrives, or the shutdown signal fires. A failed
//! drain never cancels the others; every task is joined before returning.
//!
//! Drains are not transactional. Nodes whose drain was accepted stay
//! draining even if monitoring is later cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use nodepool_core::{
    AggregateError, ControlPlane, DrainOutcome, DrainSeverity, DrainStream, NodeId, ScaleInError,
    ScaleInResult,
};

/// Joined outcomes of a [`DrainCoordinator::drain_all`] call, in input order.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub outcomes: Vec<DrainOutcome>,
}

impl DrainReport {
    /// Nodes that finished draining.
    pub fn drained(&self) -> Vec<NodeId> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.node.clone())
            .collect()
    }

    /// Nodes whose drain failed or was cancelled.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Split into the drained nodes and one error per failed node.
    pub fn into_parts(self) -> (Vec<NodeId>, AggregateError) {
        let mut drained = Vec::new();
        let mut errors = AggregateError::new();
        for outcome in self.outcomes {
            match outcome.error {
                None => drained.push(outcome.node),
                Some(err) => errors.push(err),
            }
        }
        (drained, errors)
    }
}

/// Drains nodes through the control plane.
pub struct DrainCoordinator {
    control_plane: Arc<dyn ControlPlane>,
}

impl DrainCoordinator {
    /// Create a coordinator that drains through `control_plane`.
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Drain every node concurrently with a shared deadline.
    ///
    /// Setting `shutdown` to `true` stops all outstanding monitors; their
    /// nodes are reported as [`ScaleInError::Cancelled`]. Dropping the
    /// returned future aborts every drain task it started.
    pub async fn drain_all(
        &self,
        shutdown: &watch::Receiver<bool>,
        deadline: Duration,
        nodes: Vec<NodeId>,
    ) -> DrainReport {
        let mut tasks = DrainTasks::with_capacity(nodes.len());

        for node in &nodes {
            let control_plane = self.control_plane.clone();
            let shutdown = shutdown.clone();
            let node_id = node.internal_id.clone();

            tasks.0.push(tokio::spawn(async move {
                drain_node(control_plane.as_ref(), &node_id, deadline, shutdown).await
            }));
        }

        let mut outcomes = Vec::with_capacity(nodes.len());
        for (node, handle) in nodes.into_iter().zip(tasks.0.iter_mut()) {
            let error = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(e) => Some(ScaleInError::Drain {
                    node_id: node.internal_id.clone(),
                    reason: format!("drain task failed: {e}"),
                }),
            };
            if let Some(ref err) = error {
                warn!(node_id = %node.internal_id, error = %err, "node drain failed");
            }
            outcomes.push(DrainOutcome { node, error });
        }

        DrainReport { outcomes }
    }
}

/// Per-node drain tasks, aborted when dropped.
///
/// Tasks that already finished are unaffected by the abort.
struct DrainTasks(Vec<JoinHandle<ScaleInResult<()>>>);

impl DrainTasks {
    fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }
}

impl Drop for DrainTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Trigger a drain on `node_id` and follow it to a terminal state.
pub async fn drain_node(
    control_plane: &dyn ControlPlane,
    node_id: &str,
    deadline: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> ScaleInResult<()> {
    info!(%node_id, ?deadline, "triggering drain on node");

    let index = tokio::select! {
        biased;
        _ = cancelled(&mut shutdown) => {
            return Err(ScaleInError::Cancelled { node_id: node_id.to_string() });
        }
        res = control_plane.update_drain(node_id, deadline) => {
            res.map_err(|e| ScaleInError::Drain {
                node_id: node_id.to_string(),
                reason: format!("failed to update drain: {e:#}"),
            })?
        }
    };

    let stream = control_plane.monitor_drain(node_id, index);
    monitor_node_drain(stream, node_id, shutdown).await
}

/// Consume a drain monitor stream, logging each message at its severity.
///
/// A single `error` message fails the drain immediately. When the stream
/// closes, the drain succeeded unless shutdown was signalled.
pub async fn monitor_node_drain(
    mut stream: DrainStream,
    node_id: &str,
    mut shutdown: watch::Receiver<bool>,
) -> ScaleInResult<()> {
    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => {
                debug!(%node_id, "drain monitor stopped by shutdown");
                return Err(ScaleInError::Cancelled { node_id: node_id.to_string() });
            }
            msg = stream.next() => {
                let Some(msg) = msg else { break };
                match msg.severity {
                    DrainSeverity::Info => {
                        info!(%node_id, msg = %msg.message, "received node drain message");
                    }
                    DrainSeverity::Warn => {
                        warn!(%node_id, msg = %msg.message, "received node drain message");
                    }
                    DrainSeverity::Error => {
                        return Err(ScaleInError::Drain {
                            node_id: node_id.to_string(),
                            reason: format!("received error while draining node: {}", msg.message),
                        });
                    }
                    DrainSeverity::Unspecified => {
                        debug!(%node_id, msg = %msg.message, "received node drain message");
                    }
                }
            }
        }
    }

    if *shutdown.borrow() {
        return Err(ScaleInError::Cancelled {
            node_id: node_id.to_string(),
        });
    }
    info!(%node_id, "node drain complete");
    Ok(())
}

/// Resolves once `shutdown` reads `true`.
///
/// A dropped sender that never signalled means no shutdown will come.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
