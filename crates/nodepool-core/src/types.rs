//! Value types for a scale-in invocation.
//!
//! All of these are created fresh per request and dropped once the
//! orchestrator returns; none are persisted.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScaleInError, ScaleInResult};

/// Identifier of a node as known to the cluster control plane.
pub type InternalId = String;

/// Default drain deadline applied when a request does not specify one.
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(15 * 60);

// ── Pool identifier ───────────────────────────────────────────────

/// Node attribute used to carve a pool out of the cluster inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolIdentifierKey {
    /// The node class attribute.
    Class,
    /// The datacenter the node registered in.
    Datacenter,
}

impl fmt::Display for PoolIdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolIdentifierKey::Class => write!(f, "node_class"),
            PoolIdentifierKey::Datacenter => write!(f, "datacenter"),
        }
    }
}

impl FromStr for PoolIdentifierKey {
    type Err = ScaleInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "node_class" | "class" => Ok(PoolIdentifierKey::Class),
            "datacenter" => Ok(PoolIdentifierKey::Datacenter),
            other => Err(ScaleInError::UnsupportedPoolKey(other.to_string())),
        }
    }
}

/// Selects the sub-pool of nodes whose `key` attribute equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIdentifier {
    pub key: PoolIdentifierKey,
    pub value: String,
}

impl PoolIdentifier {
    /// Create a pool identifier for `key` = `value`.
    pub fn new(key: PoolIdentifierKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Pool of nodes sharing a node class.
    pub fn class(value: impl Into<String>) -> Self {
        Self::new(PoolIdentifierKey::Class, value)
    }

    /// Pool of nodes registered in a datacenter.
    pub fn datacenter(value: impl Into<String>) -> Self {
        Self::new(PoolIdentifierKey::Datacenter, value)
    }

    /// Whether the node belongs to this pool.
    pub fn matches(&self, node: &NodeRecord) -> bool {
        node.attribute(self.key) == self.value
    }
}

// ── Remote provider ───────────────────────────────────────────────

/// Infrastructure backend that owns the machines behind the nodes.
///
/// Decides which extractor pulls the remote ID off a node's full record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteProvider {
    /// AWS EC2 instance ID.
    #[default]
    AwsInstanceId,
    /// Azure VM name.
    AzureInstanceId,
}

impl fmt::Display for RemoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteProvider::AwsInstanceId => write!(f, "aws_instance_id"),
            RemoteProvider::AzureInstanceId => write!(f, "azure_instance_id"),
        }
    }
}

impl FromStr for RemoteProvider {
    type Err = ScaleInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "aws_instance_id" => Ok(RemoteProvider::AwsInstanceId),
            "azure_instance_id" => Ok(RemoteProvider::AzureInstanceId),
            other => Err(ScaleInError::UnsupportedProvider(other.to_string())),
        }
    }
}

// ── Node selection strategy ───────────────────────────────────────

/// How candidates are ordered before the requested count is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIdStrategy {
    /// Highest creation index first, ties broken by node ID.
    #[default]
    NewestCreateIndex,
}

impl fmt::Display for NodeIdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdStrategy::NewestCreateIndex => write!(f, "newest_create_index"),
        }
    }
}

impl FromStr for NodeIdStrategy {
    type Err = ScaleInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "newest_create_index" => Ok(NodeIdStrategy::NewestCreateIndex),
            other => Err(ScaleInError::UnsupportedStrategy(other.to_string())),
        }
    }
}

// ── Node records ──────────────────────────────────────────────────

/// Summary record of a node as returned by the control plane's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: InternalId,
    pub name: String,
    pub datacenter: String,
    pub node_class: String,
    /// Whether a drain is already in progress on this node.
    pub drain: bool,
    /// Raft index at which the node registered. Higher is newer.
    pub create_index: u64,
}

impl NodeRecord {
    /// Value of the pool attribute named by `key`.
    pub fn attribute(&self, key: PoolIdentifierKey) -> &str {
        match key {
            PoolIdentifierKey::Class => &self.node_class,
            PoolIdentifierKey::Datacenter => &self.datacenter,
        }
    }
}

/// Full node record, carrying the attributes needed for remote ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FullNodeRecord {
    pub id: InternalId,
    pub name: String,
    pub attributes: HashMap<String, String>,
}

/// Pairing of a node's control-plane identity with its provider identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub internal_id: InternalId,
    pub remote_id: String,
}

impl NodeId {
    /// Pair an internal node ID with its provider ID.
    pub fn new(internal_id: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            remote_id: remote_id.into(),
        }
    }
}

// ── Drain monitoring ──────────────────────────────────────────────

/// Severity attached to a drain monitor message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainSeverity {
    Info,
    Warn,
    Error,
    Unspecified,
}

/// One status message emitted while a node drains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainMessage {
    pub severity: DrainSeverity,
    pub message: String,
}

impl DrainMessage {
    /// Create a drain message with an explicit severity.
    pub fn new(severity: DrainSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// An `info`-severity message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DrainSeverity::Info, message)
    }

    /// A `warn`-severity message.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(DrainSeverity::Warn, message)
    }

    /// An `error`-severity message. Fails the drain it is seen on.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DrainSeverity::Error, message)
    }
}

/// Result of draining a single node.
#[derive(Debug)]
pub struct DrainOutcome {
    pub node: NodeId,
    /// `None` when the drain completed.
    pub error: Option<ScaleInError>,
}

impl DrainOutcome {
    /// Whether the node finished draining.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Internal ID of the drained node.
    pub fn internal_id(&self) -> &str {
        &self.node.internal_id
    }
}

// ── Request ───────────────────────────────────────────────────────

/// A request to remove `count` nodes from a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleInRequest {
    pub count: usize,
    pub pool: PoolIdentifier,
    pub remote_provider: RemoteProvider,
    pub strategy: NodeIdStrategy,
    /// Deadline handed to the control plane for every node drain.
    pub drain_deadline: Duration,
}

impl ScaleInRequest {
    /// Build a request with the default provider and strategy.
    pub fn new(count: usize, pool: PoolIdentifier) -> Self {
        Self {
            count,
            pool,
            remote_provider: RemoteProvider::default(),
            strategy: NodeIdStrategy::default(),
            drain_deadline: DEFAULT_DRAIN_DEADLINE,
        }
    }

    /// Set the provider used to resolve remote IDs.
    pub fn with_remote_provider(mut self, provider: RemoteProvider) -> Self {
        self.remote_provider = provider;
        self
    }

    /// Set the node selection strategy.
    pub fn with_strategy(mut self, strategy: NodeIdStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the deadline handed to every node drain.
    pub fn with_drain_deadline(mut self, deadline: Duration) -> Self {
        self.drain_deadline = deadline;
        self
    }

    /// Check the request before any stage of the pipeline runs.
    pub fn validate(&self) -> ScaleInResult<()> {
        if self.pool.value.trim().is_empty() {
            return Err(ScaleInError::Validation(format!(
                "pool identifier {} has an empty value",
                self.pool.key
            )));
        }
        if self.drain_deadline.is_zero() {
            return Err(ScaleInError::Validation(
                "drain deadline must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
