//! Providers and the transfer protocols they offer.
//!
//! The domain model keeps each protocol as a multicodec code plus opaque payload bytes. The wire
//! model is a keyed union with one structured variant per known protocol. Conversion happens per
//! entry and is best effort: an entry that fails to convert is dropped and the rest of the
//! provider survives.

use crate::{error::WireError, DagJsonBytes, DagJsonLink};
use cid::Cid;
use libp2p::{Multiaddr, PeerId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Multicodec code for the bitswap transport.
pub const TRANSPORT_BITSWAP: u64 = 0x0900;
/// Multicodec code for the graphsync filecoin v1 transport.
pub const TRANSPORT_GRAPHSYNC_FILECOINV1: u64 = 0x0910;

/// A peer and the addresses it listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrInfo {
    /// The peer's identity.
    pub id: PeerId,
    /// Addresses in the order they were advertised.
    pub addrs: Vec<Multiaddr>,
}

impl AddrInfo {
    /// Create a new instance of Self.
    pub fn new(id: PeerId, addrs: Vec<Multiaddr>) -> Self {
        Self { id, addrs }
    }
}

/// The source publishing one or more content ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// The provider's identity and addresses.
    pub peer: AddrInfo,
    /// Transfer protocols in preference order.
    pub protocols: Vec<TransferProtocol>,
}

/// A data transfer protocol offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProtocol {
    /// Multicodec code of the protocol.
    pub codec: u64,
    /// Protocol specific parameters.
    pub payload: Vec<u8>,
}

/// The current filecoin storage provider protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSyncFILv1 {
    /// The piece containing the content.
    #[serde(rename = "PieceCID")]
    pub piece_cid: Cid,
    /// Whether the deal is verified.
    #[serde(rename = "VerifiedDeal")]
    pub verified_deal: bool,
    /// Whether fast retrieval is enabled.
    #[serde(rename = "FastRetrieval")]
    pub fast_retrieval: bool,
}

impl GraphSyncFILv1 {
    /// Encode as DAG-CBOR payload bytes.
    pub fn to_payload(&self) -> Result<Vec<u8>, crate::error::EncodeError> {
        serde_ipld_dagcbor::to_vec(self)
            .map_err(|e| crate::error::EncodeError::DagCbor(e.to_string()))
    }

    /// Decode DAG-CBOR payload bytes.
    pub fn from_payload(bytes: &[u8]) -> Option<Self> {
        serde_ipld_dagcbor::from_slice(bytes).ok()
    }
}

/// Which kind of protocol a [TransferProtocol] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProtocolKind {
    /// Bitswap.
    Bitswap,
    /// GraphSync for filecoin storage providers.
    GraphSyncFILv1,
    /// A code this implementation does not interpret.
    Unknown(u64),
}

impl TransferProtocol {
    /// The bitswap protocol.
    pub fn bitswap() -> Self {
        Self { codec: TRANSPORT_BITSWAP, payload: Vec::new() }
    }

    /// The graphsync filecoin v1 protocol.
    pub fn graphsync_filv1(params: &GraphSyncFILv1) -> Result<Self, crate::error::EncodeError> {
        Ok(Self { codec: TRANSPORT_GRAPHSYNC_FILECOINV1, payload: params.to_payload()? })
    }

    /// A protocol with an uninterpreted code.
    pub fn opaque(codec: u64, payload: Vec<u8>) -> Self {
        Self { codec, payload }
    }

    /// Classify by codec.
    pub fn kind(&self) -> TransferProtocolKind {
        match self.codec {
            TRANSPORT_BITSWAP => TransferProtocolKind::Bitswap,
            TRANSPORT_GRAPHSYNC_FILECOINV1 => TransferProtocolKind::GraphSyncFILv1,
            code => TransferProtocolKind::Unknown(code),
        }
    }

    /// Convert to the wire representation.
    ///
    /// Returns `None` if a known codec carries a malformed payload.
    pub fn to_wire(&self) -> Option<TransferProtocolWire> {
        match self.kind() {
            TransferProtocolKind::Bitswap => Some(TransferProtocolWire::Bitswap(BitswapProtocol {})),
            TransferProtocolKind::GraphSyncFILv1 => {
                let params = GraphSyncFILv1::from_payload(&self.payload)?;
                Some(TransferProtocolWire::GraphSyncFILv1(GraphSyncFILv1Wire {
                    piece_cid: DagJsonLink(params.piece_cid),
                    verified_deal: params.verified_deal,
                    fast_retrieval: params.fast_retrieval,
                }))
            }
            TransferProtocolKind::Unknown(code) => {
                Some(TransferProtocolWire::Unknown(UnknownProtocolWire {
                    code,
                    payload: DagJsonBytes::new(self.payload.clone()),
                }))
            }
        }
    }

    /// Convert from the wire representation.
    ///
    /// Returns `None` if the structured parameters fail to encode.
    pub fn from_wire(wire: &TransferProtocolWire) -> Option<Self> {
        match wire {
            TransferProtocolWire::Bitswap(_) => Some(Self::bitswap()),
            TransferProtocolWire::GraphSyncFILv1(params) => Self::graphsync_filv1(&GraphSyncFILv1 {
                piece_cid: params.piece_cid.0,
                verified_deal: params.verified_deal,
                fast_retrieval: params.fast_retrieval,
            })
            .ok(),
            TransferProtocolWire::Unknown(unknown) => {
                Some(Self::opaque(unknown.code, unknown.payload.as_bytes().to_vec()))
            }
        }
    }
}

/// Wire form of a transfer protocol, a keyed union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferProtocolWire {
    /// `{"Bitswap":{}}`
    Bitswap(BitswapProtocol),
    /// `{"GraphSyncFILv1":{...}}`
    GraphSyncFILv1(GraphSyncFILv1Wire),
    /// `{"Unknown":{"Code":..,"Payload":..}}`
    Unknown(UnknownProtocolWire),
}

/// Bitswap carries no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitswapProtocol {}

/// Wire parameters for [GraphSyncFILv1].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSyncFILv1Wire {
    #[serde(rename = "PieceCID")]
    pub piece_cid: DagJsonLink,
    #[serde(rename = "VerifiedDeal")]
    pub verified_deal: bool,
    #[serde(rename = "FastRetrieval")]
    pub fast_retrieval: bool,
}

/// Wire form of a protocol code this implementation does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownProtocolWire {
    #[serde(rename = "Code")]
    pub code: u64,
    #[serde(rename = "Payload")]
    pub payload: DagJsonBytes,
}

/// Wire form of a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerWire {
    /// Peer id bytes.
    #[serde(rename = "ID")]
    pub id: DagJsonBytes,
    /// Multiaddress bytes.
    #[serde(rename = "Multiaddresses")]
    pub multiaddresses: Vec<DagJsonBytes>,
}

/// Wire form of a routing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeWire {
    #[serde(rename = "Peer")]
    pub peer: PeerWire,
}

/// Wire form of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderWire {
    #[serde(rename = "ProviderNode")]
    pub provider_node: NodeWire,
    #[serde(rename = "ProviderProto", deserialize_with = "deserialize_protocols_lenient")]
    pub provider_proto: Vec<TransferProtocolWire>,
}

/// Decode a protocol list one entry at a time, dropping entries that fail.
fn deserialize_protocols_lenient<'de, D>(
    deserializer: D,
) -> Result<Vec<TransferProtocolWire>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(protocol) => Some(protocol),
            Err(e) => {
                warn!(target: "dr::provider", ?e, "dropping undecodable transfer protocol");
                None
            }
        })
        .collect())
}

impl AddrInfo {
    /// Convert to the wire representation.
    pub fn to_wire(&self) -> PeerWire {
        PeerWire {
            id: DagJsonBytes::new(self.id.to_bytes()),
            multiaddresses: self.addrs.iter().map(|a| DagJsonBytes::new(a.to_vec())).collect(),
        }
    }

    /// Convert from the wire representation.
    pub fn from_wire(wire: &PeerWire) -> Result<Self, WireError> {
        let id = PeerId::from_bytes(wire.id.as_bytes())
            .map_err(|e| WireError::PeerId(e.to_string()))?;
        let addrs = wire
            .multiaddresses
            .iter()
            .map(|bytes| Multiaddr::try_from(bytes.as_bytes().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { id, addrs })
    }
}

impl Provider {
    /// Create a new instance of Self.
    pub fn new(peer: AddrInfo, protocols: Vec<TransferProtocol>) -> Self {
        Self { peer, protocols }
    }

    /// Convert to the wire representation.
    ///
    /// Protocol entries with malformed payloads are dropped.
    pub fn to_wire(&self) -> ProviderWire {
        let provider_proto = self
            .protocols
            .iter()
            .filter_map(|protocol| {
                let wire = protocol.to_wire();
                if wire.is_none() {
                    warn!(
                        target: "dr::provider",
                        codec = protocol.codec,
                        "dropping transfer protocol with malformed payload"
                    );
                }
                wire
            })
            .collect();

        ProviderWire { provider_node: NodeWire { peer: self.peer.to_wire() }, provider_proto }
    }

    /// Convert from the wire representation.
    ///
    /// Fails only if the peer is malformed. Protocol entries that fail to convert are dropped.
    pub fn from_wire(wire: &ProviderWire) -> Result<Self, WireError> {
        let peer = AddrInfo::from_wire(&wire.provider_node.peer)?;
        let protocols = wire
            .provider_proto
            .iter()
            .filter_map(|protocol| {
                let converted = TransferProtocol::from_wire(protocol);
                if converted.is_none() {
                    warn!(target: "dr::provider", ?protocol, "dropping unconvertible transfer protocol");
                }
                converted
            })
            .collect();
        Ok(Self { peer, protocols })
    }
}
