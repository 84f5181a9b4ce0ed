// SPDX-License-Identifier: Apache-2.0
//! Error types for the delegated routing wire model and signing protocol.

use crate::Method;
use libp2p::PeerId;
use thiserror::Error;

/// Return an error if the condition is false.
#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            return Err($e);
        }
    };
}

/// Result alias for envelope decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result alias for signing a request.
pub type SignResult<T> = Result<T, SignError>;

/// Result alias for verifying a request.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// How a decode failure is surfaced at a request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailureKind {
    /// The message is malformed.
    BadRequest,
    /// The message names a method that is not registered.
    NotFound,
}

/// Errors decoding an envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a JSON envelope.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    /// The tag does not name a registered method.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    /// The tag is registered but the payload does not match its shape.
    #[error("payload does not match method {method}: {reason}")]
    PayloadMismatch {
        /// The method named by the envelope tag.
        method: Method,
        /// The underlying decode failure.
        reason: String,
    },
    /// The byte stream ended in the middle of an envelope.
    #[error("envelope stream truncated with {0} bytes left over")]
    Truncated(usize),
    /// A partial envelope grew past the decoder's limit.
    #[error("partial envelope exceeds {0} bytes")]
    TooLarge(usize),
}

impl DecodeError {
    /// The boundary classification for this error.
    pub fn kind(&self) -> DecodeFailureKind {
        match self {
            Self::UnknownMethod(_) => DecodeFailureKind::NotFound,
            Self::Json(_)
            | Self::PayloadMismatch { .. }
            | Self::Truncated(_)
            | Self::TooLarge(_) => {
                DecodeFailureKind::BadRequest
            }
        }
    }
}

/// Errors converting between the wire form and the domain model.
#[derive(Debug, Error)]
pub enum WireError {
    /// The peer identity bytes are not a valid peer id.
    #[error("invalid peer id: {0}")]
    PeerId(String),
    /// Multiaddress bytes failed to parse.
    #[error("invalid multiaddress: {0}")]
    Multiaddr(#[from] libp2p::multiaddr::Error),
    /// The key is not a valid multihash.
    #[error("invalid multihash key: {0}")]
    Multihash(String),
    /// The stored signature text is not valid multibase.
    #[error("invalid signature encoding: {0}")]
    Signature(#[from] multibase::Error),
    /// The timestamp or ttl cannot be represented on the wire.
    #[error("value out of range: {0}")]
    OutOfRange(&'static str),
}

/// Errors encoding a payload into its canonical form.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// DAG-CBOR encoding failed.
    #[error("dag-cbor encode: {0}")]
    DagCbor(String),
    /// JSON encoding failed.
    #[error("json encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the identity and crypto capability.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The peer id does not inline its public key.
    #[error("peer id {0} does not embed a public key")]
    NoInlineKey(PeerId),
    /// The embedded public key failed to decode.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    /// The signing backend failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors signing a request.
///
/// A failed signing call leaves the request unchanged.
#[derive(Debug, Error)]
pub enum SignError {
    /// The request already carries a signature.
    #[error("request already signed")]
    AlreadySigned,
    /// No private key was supplied.
    #[error("no key provided")]
    MissingKey,
    /// The key does not belong to the identity claimed in the payload.
    #[error("signing key identity {signer} does not match claimed identity {claimed:?}")]
    IdentityMismatch {
        /// The identity derived from the private key.
        signer: PeerId,
        /// The identity claimed inside the payload.
        claimed: Option<PeerId>,
    },
    /// The payload could not be canonicalized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The crypto backend failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors verifying a request.
///
/// Verification never mutates the request.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The request carries no signature.
    #[error("request not signed")]
    NotSigned,
    /// The payload does not claim a signer identity.
    #[error("peer id must be specified")]
    MissingSigner,
    /// The payload could not be canonicalized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// No public key could be extracted from the claimed identity.
    #[error("extracting public key from peer id: {0}")]
    PublicKeyExtraction(CryptoError),
    /// The signature text is not valid multibase.
    #[error("multibase-decoding signature: {0}")]
    SignatureDecode(#[from] multibase::Error),
    /// The signature does not match the payload.
    #[error("signature failed to verify")]
    SignatureInvalid,
    /// The crypto backend failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors accepting a signed request received from the wire.
#[derive(Debug, Error)]
pub enum ParseRequestError {
    /// The wire form does not convert into the domain model.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The request failed verification.
    #[error(transparent)]
    Verify(#[from] VerifyError),
}
