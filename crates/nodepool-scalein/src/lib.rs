//! nodepool-scalein: the scale-in decision and execution pipeline.
//!
//! Given a request to remove N nodes from a pool, picks which nodes go,
//! resolves their infrastructure provider identities, drops nodes that are
//! busy, and drains the rest concurrently.
//!
//! # Pipeline
//!
//! ```text
//! ScaleIn::run_pre_scale_in
//!   Validate    ScaleInRequest::validate
//!   Select      selector::select        inventory → ranked candidates
//!   Resolve     IdentityResolver        candidates → NodeId pairs + per-node errors
//!   BusyFilter  BusyFilter              NodeId pairs → idle NodeId pairs
//!   Drain       DrainCoordinator        idle pairs → drained pairs + per-node errors
//! ```
//!
//! Fatal errors (empty pool, unsupported strategy/provider, oracle failure,
//! nothing left to remove) stop the pipeline with no partial result.
//! Per-node resolution and drain failures are collected into an
//! [`AggregateError`](nodepool_core::AggregateError) returned next to the
//! nodes that did drain.
//!
//! The produced `Vec<NodeId>` is what a downstream terminator acts on; this
//! crate never terminates instances itself.

pub mod busy;
pub mod drain;
pub mod orchestrator;
pub mod resolver;
pub mod selector;

#[cfg(test)]
pub(crate) mod fake;

pub use busy::BusyFilter;
pub use drain::{DrainCoordinator, DrainReport};
pub use orchestrator::{ScaleIn, ScaleInOutcome};
pub use resolver::{ExtractorRegistry, IdExtractor, IdentityResolver, Resolution};
pub use selector::{Selection, select};
