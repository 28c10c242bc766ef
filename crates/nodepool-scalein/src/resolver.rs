//! Remote identity resolver: maps cluster nodes to provider instance IDs.
//!
//! Each selected node's full record is fetched from the control plane and
//! passed to the extractor registered for the request's [`RemoteProvider`].
//! A node whose fetch or extraction fails is dropped and its error recorded;
//! the rest of the batch carries on.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use nodepool_core::{
    AggregateError, ControlPlane, FullNodeRecord, NodeId, NodeRecord, RemoteProvider, ScaleInError,
    ScaleInResult,
};

/// Pulls the provider instance ID out of a full node record.
pub type IdExtractor = fn(&FullNodeRecord) -> Result<String, String>;

const AWS_INSTANCE_ID_ATTRIBUTE: &str = "unique.platform.aws.instance-id";
const AZURE_INSTANCE_ID_ATTRIBUTE: &str = "unique.platform.azure.name";

/// Extractors available out of the box.
const BUILTIN_EXTRACTORS: &[(RemoteProvider, IdExtractor)] = &[
    (RemoteProvider::AwsInstanceId, aws_instance_id),
    (RemoteProvider::AzureInstanceId, azure_instance_id),
];

fn aws_instance_id(node: &FullNodeRecord) -> Result<String, String> {
    attribute(node, AWS_INSTANCE_ID_ATTRIBUTE)
}

fn azure_instance_id(node: &FullNodeRecord) -> Result<String, String> {
    attribute(node, AZURE_INSTANCE_ID_ATTRIBUTE)
}

fn attribute(node: &FullNodeRecord, key: &str) -> Result<String, String> {
    match node.attributes.get(key) {
        Some(val) if !val.is_empty() => Ok(val.clone()),
        _ => Err(format!("attribute {key:?} not found")),
    }
}

/// Fixed provider → extractor table.
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<RemoteProvider, IdExtractor>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("providers", &self.extractors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self {
            extractors: BUILTIN_EXTRACTORS.iter().copied().collect(),
        }
    }
}

impl ExtractorRegistry {
    /// A registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register (or replace) the extractor for `provider`.
    pub fn with(mut self, provider: RemoteProvider, extractor: IdExtractor) -> Self {
        self.extractors.insert(provider, extractor);
        self
    }

    /// Extractor registered for `provider`, if any.
    pub fn get(&self, provider: RemoteProvider) -> Option<IdExtractor> {
        self.extractors.get(&provider).copied()
    }
}

/// Identity pairs resolved for a batch plus the per-node failures.
#[derive(Debug, Default)]
pub struct Resolution {
    pub nodes: Vec<NodeId>,
    pub errors: AggregateError,
}

/// Resolves selected nodes to [`NodeId`] pairs.
pub struct IdentityResolver {
    control_plane: Arc<dyn ControlPlane>,
    registry: ExtractorRegistry,
}

impl IdentityResolver {
    /// Create a resolver with the built-in extractors.
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            control_plane,
            registry: ExtractorRegistry::default(),
        }
    }

    /// Use `registry` instead of the built-in extractors.
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Resolve each node's remote ID.
    ///
    /// Fails fast only when no extractor is registered for `provider`.
    pub async fn resolve(
        &self,
        nodes: &[NodeRecord],
        provider: RemoteProvider,
    ) -> ScaleInResult<Resolution> {
        let extract = self
            .registry
            .get(provider)
            .ok_or_else(|| ScaleInError::UnsupportedProvider(provider.to_string()))?;

        let mut out = Resolution::default();

        for node in nodes {
            // The listing record lacks the attributes extraction needs.
            let info = match self.control_plane.node_info(&node.id).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(node_id = %node.id, error = %e, "failed to read node info");
                    out.errors.push(ScaleInError::Resolution {
                        node_id: node.id.clone(),
                        reason: format!("failed to read node info: {e:#}"),
                    });
                    continue;
                }
            };

            match extract(&info) {
                Ok(remote_id) => {
                    debug!(node_id = %node.id, %remote_id, "identified remote provider ID for node");
                    out.nodes.push(NodeId::new(node.id.clone(), remote_id));
                }
                Err(reason) => {
                    warn!(node_id = %node.id, %provider, %reason, "failed to identify remote provider ID");
                    out.errors.push(ScaleInError::Resolution {
                        node_id: node.id.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(out)
    }
}
