//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;

use nodepool_core::*;

pub(crate) const AWS_ATTRIBUTE: &str = "unique.platform.aws.instance-id";

pub(crate) fn node(id: &str, class: &str, create_index: u64) -> NodeRecord {
    NodeRecord {
        id: id.to_string(),
        name: format!("{id}-name"),
        datacenter: "dc1".to_string(),
        node_class: class.to_string(),
        drain: false,
        create_index,
    }
}

pub(crate) fn aws_info(id: &str) -> FullNodeRecord {
    FullNodeRecord {
        id: id.to_string(),
        name: format!("{id}-name"),
        attributes: HashMap::from([(AWS_ATTRIBUTE.to_string(), format!("i-{id}"))]),
    }
}

/// Control plane backed by fixed inventory and scripted drain streams.
#[derive(Default)]
pub(crate) struct FakeControlPlane {
    nodes: Vec<NodeRecord>,
    infos: HashMap<String, FullNodeRecord>,
    messages: HashMap<String, Vec<DrainMessage>>,
    hanging: HashSet<String>,
    failing_updates: HashSet<String>,
    self_id: Option<String>,
    update_delay: Option<Duration>,
    drain_requests: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    /// Inventory where every node has an AWS instance ID attribute.
    pub(crate) fn new(nodes: Vec<NodeRecord>) -> Self {
        let infos = nodes.iter().map(|n| (n.id.clone(), aws_info(&n.id))).collect();
        Self {
            nodes,
            infos,
            ..Default::default()
        }
    }

    pub(crate) fn with_info(mut self, info: FullNodeRecord) -> Self {
        self.infos.insert(info.id.clone(), info);
        self
    }

    pub(crate) fn without_info(mut self, id: &str) -> Self {
        self.infos.remove(id);
        self
    }

    pub(crate) fn with_messages(mut self, id: &str, messages: Vec<DrainMessage>) -> Self {
        self.messages.insert(id.to_string(), messages);
        self
    }

    /// The node's monitor stream never closes on its own.
    pub(crate) fn with_hanging(mut self, id: &str) -> Self {
        self.hanging.insert(id.to_string());
        self
    }

    pub(crate) fn with_failing_update(mut self, id: &str) -> Self {
        self.failing_updates.insert(id.to_string());
        self
    }

    /// Every drain update takes `delay` before it is recorded.
    pub(crate) fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    pub(crate) fn with_self_id(mut self, id: &str) -> Self {
        self.self_id = Some(id.to_string());
        self
    }

    pub(crate) fn drain_requests(&self) -> Vec<String> {
        let mut requests = self.drain_requests.lock().unwrap().clone();
        requests.sort();
        requests
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_nodes(&self) -> anyhow::Result<Vec<NodeRecord>> {
        Ok(self.nodes.clone())
    }

    async fn node_info(&self, node_id: &str) -> anyhow::Result<FullNodeRecord> {
        self.infos
            .get(node_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("node {node_id} not found"))
    }

    async fn update_drain(&self, node_id: &str, _deadline: Duration) -> anyhow::Result<u64> {
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_updates.contains(node_id) {
            anyhow::bail!("permission denied");
        }
        self.drain_requests.lock().unwrap().push(node_id.to_string());
        Ok(42)
    }

    fn monitor_drain(&self, node_id: &str, _index: u64) -> DrainStream {
        let messages = self.messages.get(node_id).cloned().unwrap_or_default();
        let stream = futures_util::stream::iter(messages);
        if self.hanging.contains(node_id) {
            return Box::pin(stream.chain(futures_util::stream::pending()));
        }
        Box::pin(stream)
    }

    async fn self_node_id(&self) -> anyhow::Result<Option<String>> {
        Ok(self.self_id.clone())
    }
}

/// Busy oracle returning a fixed answer and counting queries.
pub(crate) struct FakeOracle {
    status: Result<HashMap<String, bool>, String>,
    calls: AtomicUsize,
}

impl FakeOracle {
    pub(crate) fn idle() -> Self {
        Self::with_status(HashMap::new())
    }

    pub(crate) fn with_status(status: HashMap<String, bool>) -> Self {
        Self {
            status: Ok(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            status: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BusyOracle for FakeOracle {
    async fn list_busy_status(&self) -> anyhow::Result<HashMap<String, bool>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status.clone().map_err(anyhow::Error::msg)
    }
}
