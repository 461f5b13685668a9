//! RDMnet client configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use luxflow_proto::rdmnet::VECTOR_ROOT_BROKER;

use crate::error::RdmnetError;

/// TLS settings for the stream transport
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// Server name for SNI and certificate checks (defaults to the host)
    pub servername: Option<String>,
    /// Verify the broker's certificate chain (default true)
    pub require_tls_authorization: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            servername: None,
            require_tls_authorization: true,
        }
    }
}

/// Context handed to a [`PostConnectAuth`] hook
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

/// Application hook that runs after the socket is ready
///
/// Returning an error fails the connect attempt.
#[async_trait]
pub trait PostConnectAuth: Send + Sync {
    async fn authenticate(&self, context: &AuthContext) -> Result<(), RdmnetError>;
}

/// Configuration for an [`RdmnetClient`](super::RdmnetClient)
#[derive(Clone)]
pub struct RdmnetClientConfig {
    /// Broker host
    pub host: String,
    /// Broker port (default 8888)
    pub port: u16,
    /// Component identifier; random when unset
    pub cid: Option<[u8; 16]>,
    /// Enable TLS with these options
    pub tls: Option<TlsOptions>,
    /// Post-connect authentication hook
    pub post_connect_auth: Option<Arc<dyn PostConnectAuth>>,
    /// Heartbeat period (default 15 s)
    pub heartbeat_interval: Duration,
    /// Root vector for idle heartbeats outside a broker session
    pub heartbeat_vector: u32,
    /// Default deadline for request/response operations (default 5 s)
    pub request_timeout: Duration,
    /// Reconnect automatically after an unexpected close
    pub auto_reconnect: bool,
    /// First reconnect delay (default 500 ms)
    pub initial_reconnect_delay: Duration,
    /// Reconnect delay ceiling (default 10 s)
    pub max_reconnect_delay: Duration,
    /// Reassembly buffer cap before the connection is torn down (default 1 MiB)
    pub stream_buffer_cap: usize,
}

impl Default for RdmnetClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            cid: None,
            tls: None,
            post_connect_auth: None,
            heartbeat_interval: Duration::from_millis(15_000),
            heartbeat_vector: VECTOR_ROOT_BROKER,
            request_timeout: Duration::from_millis(5_000),
            auto_reconnect: true,
            initial_reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_millis(10_000),
            stream_buffer_cap: 1024 * 1024,
        }
    }
}

impl fmt::Debug for RdmnetClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdmnetClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("has_auth_hook", &self.post_connect_auth.is_some())
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("request_timeout", &self.request_timeout)
            .field("auto_reconnect", &self.auto_reconnect)
            .finish()
    }
}
