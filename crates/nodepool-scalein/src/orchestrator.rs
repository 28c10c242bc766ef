//! Scale-in orchestrator: the single entry point into the pipeline.
//!
//! ```text
//!   Validate ─▶ Select ─▶ Resolve ─▶ BusyFilter ─▶ Drain ─▶ Done
//!      │          │          │            │
//!      └──────────┴──────────┴────────────┴──▶ fatal error, later stages skipped
//! ```
//!
//! Per-node resolution and drain failures are not fatal. They are collected
//! into the outcome's aggregate error next to the list of drained nodes.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use nodepool_core::{
    AggregateError, BusyOracle, ControlPlane, NodeId, ScaleInError, ScaleInRequest, ScaleInResult,
};

use crate::busy::BusyFilter;
use crate::drain::DrainCoordinator;
use crate::resolver::{ExtractorRegistry, IdentityResolver};
use crate::selector;

/// Result of a scale-in run that got as far as draining.
#[derive(Debug, Default)]
pub struct ScaleInOutcome {
    /// Nodes that finished draining, ready for termination.
    pub drained: Vec<NodeId>,
    pub requested: usize,
    /// Nodes picked by the selector before resolution and busy filtering.
    pub selected: usize,
    /// Non-fatal per-node failures, if any.
    pub errors: Option<AggregateError>,
}

impl ScaleInOutcome {
    /// Fewer nodes were drained than requested.
    pub fn is_degraded(&self) -> bool {
        self.drained.len() < self.requested
    }

    /// Every requested node drained with no per-node failure.
    pub fn is_complete(&self) -> bool {
        !self.is_degraded() && self.errors.is_none()
    }
}

/// Drives a scale-in request through the pipeline.
pub struct ScaleIn {
    control_plane: Arc<dyn ControlPlane>,
    oracle: Arc<dyn BusyOracle>,
    extractors: ExtractorRegistry,
    exclude_node_id: Option<String>,
}

impl ScaleIn {
    /// Create a scale-in runner over its two collaborators.
    pub fn new(control_plane: Arc<dyn ControlPlane>, oracle: Arc<dyn BusyOracle>) -> Self {
        Self {
            control_plane,
            oracle,
            extractors: ExtractorRegistry::default(),
            exclude_node_id: None,
        }
    }

    /// Never select this node. Normally the node the scaler runs on.
    pub fn with_exclude_node_id(mut self, id: impl Into<String>) -> Self {
        self.exclude_node_id = Some(id.into());
        self
    }

    /// Replace the built-in remote ID extractors.
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    /// Select, resolve, filter and drain nodes for `req`.
    ///
    /// An `Err` means nothing was drained. An `Ok` outcome may still carry
    /// per-node errors; check both `drained` and `errors`.
    pub async fn run_pre_scale_in(
        &self,
        shutdown: watch::Receiver<bool>,
        req: &ScaleInRequest,
    ) -> ScaleInResult<ScaleInOutcome> {
        req.validate()?;
        if req.count == 0 {
            debug!("scale-in count is zero, nothing to do");
            return Ok(ScaleInOutcome::default());
        }

        // ── Select ──
        let nodes = self
            .control_plane
            .list_nodes()
            .await
            .map_err(|e| ScaleInError::ControlPlane(format!("failed to list nodes: {e:#}")))?;

        let exclude = self.exclude_id().await;
        let selection = selector::select(
            &nodes,
            &req.pool,
            req.strategy,
            req.count,
            exclude.as_deref(),
        )?;
        if selection.is_degraded() {
            warn!(
                requested = selection.requested,
                available = selection.available,
                "not enough eligible nodes, scaling in fewer than requested"
            );
        }
        let selected = selection.nodes.len();

        // ── Resolve ──
        let resolution = IdentityResolver::new(self.control_plane.clone())
            .with_registry(self.extractors.clone())
            .resolve(&selection.nodes, req.remote_provider)
            .await?;
        let mut errors = resolution.errors;
        if resolution.nodes.is_empty() {
            error!(errors = %errors, "no selected node could be resolved");
            return Err(ScaleInError::NoRemovableNodes { causes: errors });
        }

        // ── Busy filter ──
        let idle = BusyFilter::new(self.oracle.clone())
            .filter(resolution.nodes)
            .await?;
        if idle.is_empty() {
            info!("every candidate node is busy");
            return Err(ScaleInError::NoRemovableNodes { causes: errors });
        }

        // ── Drain ──
        info!(nodes = idle.len(), deadline = ?req.drain_deadline, "draining nodes");
        let report = DrainCoordinator::new(self.control_plane.clone())
            .drain_all(&shutdown, req.drain_deadline, idle)
            .await;
        let (drained, drain_errors) = report.into_parts();
        errors.extend_from(drain_errors);

        info!(
            requested = req.count,
            drained = drained.len(),
            failed = errors.len(),
            "pre scale-in tasks finished"
        );

        Ok(ScaleInOutcome {
            drained,
            requested: req.count,
            selected,
            errors: errors.into_option(),
        })
    }

    async fn exclude_id(&self) -> Option<String> {
        if let Some(id) = &self.exclude_node_id {
            return Some(id.clone());
        }
        match self.control_plane.self_node_id().await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "failed to identify scaler node, self exclusion disabled");
                None
            }
        }
    }
}
