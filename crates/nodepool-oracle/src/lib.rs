//! nodepool-oracle: HTTP client for the busy-node oracle.
//!
//! The oracle reports, per internal node ID, whether the node currently
//! holds active work. The scale-in pipeline queries it once per invocation
//! through the [`BusyOracle`](nodepool_core::BusyOracle) trait.
//!
//! # Wire format
//!
//! ```text
//! GET {address}/v1/nodes[?wait=<ms>ms]
//! X-Nomad-Token: <secret_id>          (when configured)
//!
//! 200 OK
//! {"Nodes": {"<node-id>": true, "<node-id>": false}}
//! ```
//!
//! A client is constructed explicitly from an [`OracleConfig`] and owned by
//! the caller; there is no process-wide connection pool.
//!
//! [`OracleConfig`]: nodepool_core::OracleConfig

pub mod client;
pub mod error;

pub use client::{BusyStatus, DEFAULT_MAX_BODY_BYTES, HttpBusyOracle};
pub use error::{OracleClientError, OracleClientResult};
