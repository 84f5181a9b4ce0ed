//! Signed bitswap provider records.
//!
//! The wire form carries the signed payload as a JSON string next to the signature, so a
//! verifier hashes exactly the bytes the signer hashed.

use super::{default_signer, SignedRequest};
use crate::{
    error::{EncodeError, SignResult, VerifyResult},
    DagJsonLink,
};
use libp2p::{identity::Keypair, Multiaddr, PeerId};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

/// Protocol name for bitswap provider records.
pub const BITSWAP_PROTOCOL: &str = "bitswap";

/// The signed fields of a [BitswapWriteProviderRequest].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitswapWriteProviderPayload {
    #[serde(rename = "Keys")]
    pub keys: Vec<DagJsonLink>,
    /// Unix milliseconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    /// Milliseconds.
    #[serde(rename = "AdvisoryTTL")]
    pub advisory_ttl: i64,
    #[serde(rename = "ID")]
    pub id: Option<PeerId>,
    #[serde(rename = "Addrs")]
    pub addrs: Vec<Multiaddr>,
}

impl BitswapWriteProviderPayload {
    /// Compact JSON in field declaration order.
    pub fn canonical(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A request to record a bitswap provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitswapWriteProviderRequest {
    /// Protocol name.
    pub protocol: String,
    payload: BitswapWriteProviderPayload,
    /// Multibase signature text.
    signature: Option<String>,
    /// The payload exactly as signed or received.
    raw_payload: Option<String>,
}

impl BitswapWriteProviderRequest {
    /// Create an unsigned request.
    pub fn new(payload: BitswapWriteProviderPayload) -> Self {
        Self { protocol: BITSWAP_PROTOCOL.to_string(), payload, signature: None, raw_payload: None }
    }

    /// The structured payload.
    pub fn payload(&self) -> &BitswapWriteProviderPayload {
        &self.payload
    }

    /// Mutable access to the payload.
    ///
    /// Discards the verbatim payload so the record is hashed from the edited fields.
    pub fn payload_mut(&mut self) -> &mut BitswapWriteProviderPayload {
        self.raw_payload = None;
        &mut self.payload
    }

    /// The verbatim payload, if one was signed or received.
    pub fn raw_payload(&self) -> Option<&str> {
        self.raw_payload.as_deref()
    }

    /// Sign with the keypair of the payload's identity.
    pub fn sign(&mut self, keypair: &Keypair) -> SignResult<()> {
        default_signer().sign(self, Some(keypair))
    }

    /// Verify against the payload's identity.
    pub fn verify(&self) -> VerifyResult<()> {
        default_signer().verify(self)
    }
}

impl SignedRequest for BitswapWriteProviderRequest {
    type Staged = String;

    fn signature_text(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn claimed_identity(&self) -> Option<PeerId> {
        self.payload.id
    }

    fn stage(&self) -> Result<(String, Vec<u8>), EncodeError> {
        let raw = self.payload.canonical()?;
        let bytes = raw.as_bytes().to_vec();
        Ok((raw, bytes))
    }

    fn commit(&mut self, raw: String, signature: String) {
        self.raw_payload = Some(raw);
        self.signature = Some(signature);
    }

    fn verification_bytes(&self) -> Result<Cow<'_, [u8]>, EncodeError> {
        match &self.raw_payload {
            Some(raw) => Ok(Cow::Borrowed(raw.as_bytes())),
            None => Ok(Cow::Owned(self.payload.canonical()?.into_bytes())),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BitswapWriteProviderWire<'a> {
    #[serde(rename = "Protocol")]
    protocol: Cow<'a, str>,
    #[serde(rename = "Signature", default)]
    signature: Cow<'a, str>,
    #[serde(rename = "Payload")]
    payload: Cow<'a, str>,
}

impl Serialize for BitswapWriteProviderRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = match &self.raw_payload {
            Some(raw) => Cow::Borrowed(raw.as_str()),
            None => Cow::Owned(self.payload.canonical().map_err(ser::Error::custom)?),
        };
        BitswapWriteProviderWire {
            protocol: Cow::Borrowed(&self.protocol),
            signature: Cow::Borrowed(self.signature.as_deref().unwrap_or_default()),
            payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BitswapWriteProviderRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = BitswapWriteProviderWire::deserialize(deserializer)?;
        let payload = serde_json::from_str(&wire.payload)
            .map_err(|e| de::Error::custom(format!("unmarshaling payload: {e}")))?;
        Ok(Self {
            protocol: wire.protocol.into_owned(),
            payload,
            signature: (!wire.signature.is_empty()).then(|| wire.signature.into_owned()),
            raw_payload: Some(wire.payload.into_owned()),
        })
    }
}
