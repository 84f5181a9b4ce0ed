//! Request and response payloads for the find-providers and provide methods.

use crate::{error::WireError, AddrInfo, DagJsonBytes};
use cid::{multihash::Multihash, Cid};
use libp2p::Multiaddr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Multicodec code for raw binary content.
pub const RAW_CODEC: u64 = 0x55;

/// Request the providers of a content id.
///
/// The key is the multihash of the content id. The server rebuilds a CIDv1 with the raw codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetP2PProvideRequest {
    /// The multihash bytes of the requested content id.
    #[serde(rename = "Key")]
    pub key: DagJsonBytes,
}

impl GetP2PProvideRequest {
    /// Create a request for the content id's multihash.
    pub fn new(cid: &Cid) -> Self {
        Self { key: DagJsonBytes::new(cid.hash().to_bytes()) }
    }

    /// The requested content id, built as a raw CIDv1 from the key.
    pub fn content_id(&self) -> Result<Cid, WireError> {
        let multihash = Multihash::<64>::from_bytes(self.key.as_bytes())
            .map_err(|e| WireError::Multihash(e.to_string()))?;
        Ok(Cid::new_v1(RAW_CODEC, multihash))
    }
}

/// Provider addresses for one result of a find-providers request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetP2PProvideResponse {
    /// Multiaddress bytes, flattened across providers.
    #[serde(rename = "Peers")]
    pub peers: Vec<DagJsonBytes>,
}

impl GetP2PProvideResponse {
    /// Flatten provider addresses in provider order, then per-provider address order.
    ///
    /// Each address ends with the provider's `/p2p` component so receivers can regroup them.
    pub fn from_addr_infos(infos: &[AddrInfo]) -> Self {
        let peers = infos
            .iter()
            .flat_map(|info| {
                info.addrs.iter().map(|addr| {
                    // an address already naming another peer is kept as advertised
                    let addr = addr.clone().with_p2p(info.id).unwrap_or_else(|addr| addr);
                    DagJsonBytes::new(addr.to_vec())
                })
            })
            .collect();
        Self { peers }
    }

    /// Parse every address.
    pub fn multiaddrs(&self) -> Result<Vec<Multiaddr>, WireError> {
        self.peers
            .iter()
            .map(|bytes| Multiaddr::try_from(bytes.as_bytes().to_vec()).map_err(Into::into))
            .collect()
    }
}

/// Reply to an accepted provider advertisement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvideResponse {
    /// How long the router intends to keep the record, in nanoseconds.
    #[serde(rename = "AdvisoryTTL")]
    pub advisory_ttl: i64,
}

impl ProvideResponse {
    /// Create a response for the ttl.
    pub fn new(ttl: Duration) -> Self {
        Self { advisory_ttl: i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX) }
    }

    /// The advisory ttl, negative values clamp to zero.
    pub fn ttl(&self) -> Duration {
        Duration::from_nanos(u64::try_from(self.advisory_ttl).unwrap_or_default())
    }
}

/// Reply to an accepted bitswap provider record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitswapWriteProviderResponse {
    /// How long the router intends to keep the record, in nanoseconds.
    #[serde(rename = "AdvisoryTTL")]
    pub advisory_ttl: i64,
}

impl BitswapWriteProviderResponse {
    /// Create a response for the ttl.
    pub fn new(ttl: Duration) -> Self {
        Self { advisory_ttl: ProvideResponse::new(ttl).advisory_ttl }
    }
}
