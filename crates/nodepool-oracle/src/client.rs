//! HTTP busy-node oracle client.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use serde::{Deserialize, Serialize};
use tracing::debug;

use nodepool_core::{BusyOracle, OracleConfig};

use crate::error::{OracleClientError, OracleClientResult};

/// Path of the node status listing.
const NODES_ENDPOINT: &str = "/v1/nodes";

/// Header carrying the configured secret.
const TOKEN_HEADER: &str = "x-nomad-token";

/// Largest response body read from the oracle by default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Response body of the node status listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyStatus {
    /// Internal node ID → busy flag.
    #[serde(rename = "Nodes", default)]
    pub nodes: HashMap<String, bool>,
}

/// Busy oracle reached over plain HTTP/1.1.
///
/// Opens one connection per query; the oracle is consulted once per
/// scale-in so there is nothing to pool.
#[derive(Debug, Clone)]
pub struct HttpBusyOracle {
    /// `host:port` to connect to.
    authority: String,
    /// Path prefix taken from the configured address, without trailing `/`.
    base_path: String,
    secret_id: Option<String>,
    timeout: Duration,
    wait_time: Option<Duration>,
    max_body_bytes: usize,
}

impl HttpBusyOracle {
    /// Build a client from its configuration.
    pub fn new(config: &OracleConfig) -> OracleClientResult<Self> {
        let address = config.address.trim();
        let invalid = |reason: &str| OracleClientError::Address {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let uri: http::Uri = address.parse().map_err(|e: http::uri::InvalidUri| {
            invalid(&e.to_string())
        })?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme {other:?}"))),
            None => return Err(invalid("missing scheme")),
        }

        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(80);

        Ok(Self {
            authority: format!("{host}:{port}"),
            base_path: uri.path().trim_end_matches('/').to_string(),
            secret_id: config.secret_id.clone().filter(|s| !s.is_empty()),
            timeout: config.timeout()?,
            wait_time: config.wait_time()?,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Set the largest response body the client will read.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// `host:port` this client connects to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Fetch the busy status of every node the oracle knows about.
    pub async fn list_nodes(&self) -> OracleClientResult<BusyStatus> {
        let body = self.query(NODES_ENDPOINT).await?;
        let status: BusyStatus = serde_json::from_slice(&body)?;
        debug!(nodes = status.nodes.len(), "received node busy status from oracle");
        Ok(status)
    }

    /// Issue a GET against `endpoint` and return the body of a 200 response.
    async fn query(&self, endpoint: &str) -> OracleClientResult<Bytes> {
        let target = self.request_target(endpoint);

        tokio::time::timeout(self.timeout, self.get(&target))
            .await
            .map_err(|_| OracleClientError::Timeout(self.timeout))?
    }

    async fn get(&self, target: &str) -> OracleClientResult<Bytes> {
        let stream = tokio::net::TcpStream::connect(&self.authority)
            .await
            .map_err(|source| OracleClientError::Connect {
                address: self.authority.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "oracle connection closed with error");
            }
        });

        let mut builder = http::Request::builder()
            .method("GET")
            .uri(target)
            .header("host", &self.authority)
            .header("user-agent", "nodepool-oracle/0.1");
        if let Some(token) = &self.secret_id {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let req = builder.body(Empty::<Bytes>::new())?;

        debug!(authority = %self.authority, %target, "querying busy-node oracle");
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = Limited::new(resp.into_body(), self.max_body_bytes)
            .collect()
            .await
            .map_err(|e| match e.downcast::<hyper::Error>() {
                Ok(e) => OracleClientError::Http(*e),
                Err(e) if e.is::<LengthLimitError>() => {
                    OracleClientError::BodyTooLarge(self.max_body_bytes)
                }
                Err(e) => OracleClientError::Body(e.to_string()),
            })?
            .to_bytes();

        if status != http::StatusCode::OK {
            return Err(OracleClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }

    fn request_target(&self, endpoint: &str) -> String {
        let mut target = format!("{}{}", self.base_path, endpoint);
        if let Some(wait) = self.wait_time {
            target.push_str(&format!("?wait={}ms", wait.as_millis()));
        }
        target
    }
}

#[async_trait::async_trait]
impl BusyOracle for HttpBusyOracle {
    async fn list_busy_status(&self) -> anyhow::Result<HashMap<String, bool>> {
        Ok(self.list_nodes().await?.nodes)
    }
}
