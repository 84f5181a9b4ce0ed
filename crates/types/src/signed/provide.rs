//! Signed provider advertisements.

use super::{default_signer, RequestSigner, SignedRequest};
use crate::{
    crypto::IdentityCrypto,
    error::{EncodeError, ParseRequestError, SignResult, VerifyResult, WireError},
    DagJsonBytes, DagJsonLink, Provider, ProviderWire, TransferProtocol,
};
use cid::Cid;
use libp2p::{identity::Keypair, PeerId};
use multibase::Base;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A signature over a [ProvideRequest].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    /// Unix seconds when the request was signed.
    pub at: u64,
    /// Multibase signature text.
    pub text: String,
}

/// A message indicating a provider can provide a key for a given ttl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvideRequest {
    /// The advertised content.
    pub key: Cid,
    /// Who provides it and how.
    pub provider: Provider,
    /// Requested record lifetime.
    pub ttl: Duration,
    signature: Option<RequestSignature>,
}

impl ProvideRequest {
    /// Create an unsigned request.
    pub fn new(key: Cid, provider: Provider, ttl: Duration) -> Self {
        Self { key, provider, ttl, signature: None }
    }

    /// The signature, if signed.
    pub fn signature(&self) -> Option<&RequestSignature> {
        self.signature.as_ref()
    }

    /// When the request was signed.
    pub fn signed_at(&self) -> Option<SystemTime> {
        self.signature.as_ref().map(|sig| UNIX_EPOCH + Duration::from_secs(sig.at))
    }

    /// Sign with the provider's keypair.
    pub fn sign(&mut self, keypair: &Keypair) -> SignResult<()> {
        default_signer().sign(self, Some(keypair))
    }

    /// Verify against the provider's identity.
    pub fn verify(&self) -> VerifyResult<()> {
        default_signer().verify(self)
    }

    /// Convert to the wire representation.
    pub fn to_wire(&self) -> Result<ProvideRequestWire, WireError> {
        let (timestamp, signature) = match &self.signature {
            Some(sig) => {
                let (_, bytes) = multibase::decode(&sig.text)?;
                let at = i64::try_from(sig.at).map_err(|_| WireError::OutOfRange("Timestamp"))?;
                (at, bytes)
            }
            None => (0, Vec::new()),
        };

        Ok(ProvideRequestWire {
            key: DagJsonLink(self.key),
            provider: self.provider.to_wire(),
            timestamp,
            advisory_ttl: ttl_nanos(self.ttl),
            signature: DagJsonBytes::new(signature),
        })
    }

    /// Accept a request from the wire, verifying it with the default signer.
    pub fn from_wire(wire: &ProvideRequestWire) -> Result<Self, ParseRequestError> {
        Self::from_wire_with(wire, &default_signer())
    }

    /// Accept a request from the wire, verifying it with `signer`.
    pub fn from_wire_with<C: IdentityCrypto>(
        wire: &ProvideRequestWire,
        signer: &RequestSigner<C>,
    ) -> Result<Self, ParseRequestError> {
        let at = u64::try_from(wire.timestamp).map_err(|_| WireError::OutOfRange("Timestamp"))?;
        let ttl = u64::try_from(wire.advisory_ttl)
            .map_err(|_| WireError::OutOfRange("AdvisoryTTL"))?;
        let signature = (!wire.signature.is_empty()).then(|| RequestSignature {
            at,
            text: multibase::encode(Base::Base64, wire.signature.as_bytes()),
        });

        let request = Self {
            key: wire.key.0,
            provider: Provider::from_wire(&wire.provider)?,
            ttl: Duration::from_nanos(ttl),
            signature,
        };
        signer.verify(&request)?;
        Ok(request)
    }

    /// The canonical document with empty signature bytes.
    fn canonical_bytes(&self, at: u64) -> Result<Vec<u8>, EncodeError> {
        let protocols = self
            .provider
            .protocols
            .iter()
            .filter_map(|protocol| protocol.to_wire())
            .filter_map(|wire| TransferProtocol::from_wire(&wire))
            .map(|protocol| ProtocolDocument { codec: protocol.codec, payload: protocol.payload })
            .collect();

        let document = ProvideDocument {
            key: self.key,
            provider: ProviderDocument {
                peer: PeerDocument {
                    id: self.provider.peer.id.to_bytes(),
                    addrs: self
                        .provider
                        .peer
                        .addrs
                        .iter()
                        .map(|addr| serde_bytes::ByteBuf::from(addr.to_vec()))
                        .collect(),
                },
                protocols,
            },
            ttl: ttl_nanos(self.ttl),
            signature: SignatureDocument { at, bytes: Vec::new() },
        };
        serde_ipld_dagcbor::to_vec(&document).map_err(|e| EncodeError::DagCbor(e.to_string()))
    }
}

/// Nanoseconds of `ttl`, saturating at the largest wire value.
///
/// Signing and the wire form must agree, so both go through here.
fn ttl_nanos(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX)
}

impl SignedRequest for ProvideRequest {
    type Staged = u64;

    fn signature_text(&self) -> Option<&str> {
        self.signature.as_ref().map(|sig| sig.text.as_str())
    }

    fn claimed_identity(&self) -> Option<PeerId> {
        Some(self.provider.peer.id)
    }

    fn stage(&self) -> Result<(u64, Vec<u8>), EncodeError> {
        // whole seconds so the document survives the wire timestamp
        let at = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        Ok((at, self.canonical_bytes(at)?))
    }

    fn commit(&mut self, at: u64, signature: String) {
        self.signature = Some(RequestSignature { at, text: signature });
    }

    fn verification_bytes(&self) -> Result<Cow<'_, [u8]>, EncodeError> {
        let at = self.signature.as_ref().map(|sig| sig.at).unwrap_or_default();
        self.canonical_bytes(at).map(Cow::Owned)
    }
}

#[derive(Serialize)]
struct ProvideDocument {
    #[serde(rename = "Key")]
    key: Cid,
    #[serde(rename = "Provider")]
    provider: ProviderDocument,
    #[serde(rename = "TTL")]
    ttl: i64,
    #[serde(rename = "Signature")]
    signature: SignatureDocument,
}

#[derive(Serialize)]
struct ProviderDocument {
    #[serde(rename = "Peer")]
    peer: PeerDocument,
    #[serde(rename = "ProviderProto")]
    protocols: Vec<ProtocolDocument>,
}

#[derive(Serialize)]
struct PeerDocument {
    #[serde(rename = "ID", with = "serde_bytes")]
    id: Vec<u8>,
    #[serde(rename = "Addrs")]
    addrs: Vec<serde_bytes::ByteBuf>,
}

#[derive(Serialize)]
struct ProtocolDocument {
    #[serde(rename = "Codec")]
    codec: u64,
    #[serde(rename = "Payload", with = "serde_bytes")]
    payload: Vec<u8>,
}

#[derive(Serialize)]
struct SignatureDocument {
    #[serde(rename = "At")]
    at: u64,
    #[serde(rename = "Bytes", with = "serde_bytes")]
    bytes: Vec<u8>,
}

/// Wire form of a [ProvideRequest].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvideRequestWire {
    #[serde(rename = "Key")]
    pub key: DagJsonLink,
    #[serde(rename = "Provider")]
    pub provider: ProviderWire,
    /// Unix seconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    /// Nanoseconds.
    #[serde(rename = "AdvisoryTTL")]
    pub advisory_ttl: i64,
    #[serde(rename = "Signature")]
    pub signature: DagJsonBytes,
}
