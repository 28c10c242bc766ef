//! nodepool-core: shared vocabulary for node pool scale-in.
//!
//! Holds the value types that describe a scale-in request (pool identifier,
//! remote provider, selection strategy, identity pairs), the error kinds the
//! pipeline reports, and the traits through which the pipeline reaches its
//! external collaborators.
//!
//! # Collaborators
//!
//! ```text
//! ControlPlane   list_nodes / node_info / update_drain / monitor_drain
//! BusyOracle     list_busy_status (one batched lookup per scale-in)
//! ```
//!
//! Apart from reading a config file, nothing here performs I/O.
//! Implementations of the collaborator traits live with the caller (or in
//! `nodepool-oracle` for the HTTP busy oracle).

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{BusyOracle, ControlPlane, DrainStream};
pub use config::{ConfigError, OracleConfig, ScalerConfig, parse_duration};
pub use error::{AggregateError, ScaleInError, ScaleInResult};
pub use types::*;
