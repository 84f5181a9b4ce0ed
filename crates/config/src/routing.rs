//! Client and server settings.

use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// Default port for the routing endpoint.
pub const DEFAULT_ROUTING_PORT: u16 = 8222;

/// The container for all delegated routing configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegatedRoutingConfig {
    /// Settings for outbound requests.
    pub client: ClientConfig,
    /// Settings for the routing endpoint.
    pub server: ServerConfig,
}

/// Settings for the routing client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base url of the remote router.
    pub endpoint: String,
    /// Upper bound on the time to connect and receive response headers.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("http://{}:{DEFAULT_ROUTING_PORT}/", Ipv4Addr::LOCALHOST),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Settings for the routing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket the endpoint listens on.
    pub listen_addr: SocketAddr,
    /// Table of statically known providers, relative to the config file.
    pub providers_file: Option<PathBuf>,
    /// Largest ttl granted to accepted advertisements.
    #[serde(with = "humantime_serde")]
    pub max_advisory_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_ROUTING_PORT)),
            providers_file: None,
            max_advisory_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}
