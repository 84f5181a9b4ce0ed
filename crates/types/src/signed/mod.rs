// SPDX-License-Identifier: Apache-2.0
//! Signed request protocol.
//!
//! A request is signed over the digest of its canonical bytes. Each concrete request decides
//! what its canonical bytes are; [RequestSigner] runs the shared checks and the crypto.

use crate::{
    crypto::{IdentityCrypto, Libp2pIdentity},
    error::{EncodeError, SignError, SignResult, VerifyError, VerifyResult},
};
use libp2p::PeerId;
use multibase::Base;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

mod bitswap;
mod provide;

pub use bitswap::*;
pub use provide::*;

/// How canonical bytes are reduced before signing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DigestScheme {
    /// SHA-256 of the canonical bytes.
    #[default]
    Sha256,
    /// The canonical bytes followed by the SHA-256 of empty input.
    ///
    /// Byte-identical with signers that append to a finalized empty hash state. Use only to
    /// interoperate with those deployments.
    AppendEmptySha256,
}

impl DigestScheme {
    /// The bytes handed to the signature algorithm.
    pub fn digest(&self, canonical: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(canonical).to_vec(),
            Self::AppendEmptySha256 => {
                let mut out = Vec::with_capacity(canonical.len() + 32);
                out.extend_from_slice(canonical);
                out.extend_from_slice(&Sha256::new().finalize());
                out
            }
        }
    }
}

/// A request that carries a signature over its own canonical bytes.
pub trait SignedRequest {
    /// State computed while staging that is stored on commit.
    type Staged;

    /// The stored multibase signature text, if signed.
    fn signature_text(&self) -> Option<&str>;

    /// The identity claimed inside the payload.
    fn claimed_identity(&self) -> Option<PeerId>;

    /// Compute the bytes to sign without mutating the request.
    fn stage(&self) -> Result<(Self::Staged, Vec<u8>), EncodeError>;

    /// Store the signature produced over staged bytes.
    fn commit(&mut self, staged: Self::Staged, signature: String);

    /// The bytes a verifier hashes.
    ///
    /// Verbatim bytes received from the wire take precedence over recanonicalizing.
    fn verification_bytes(&self) -> Result<Cow<'_, [u8]>, EncodeError>;

    /// True once a signature is present.
    fn is_signed(&self) -> bool {
        self.signature_text().is_some()
    }
}

/// Signs and verifies requests through an [IdentityCrypto] capability.
#[derive(Debug, Default, Clone)]
pub struct RequestSigner<C> {
    crypto: C,
    scheme: DigestScheme,
}

impl<C: IdentityCrypto> RequestSigner<C> {
    /// Create a new instance of Self.
    pub fn new(crypto: C, scheme: DigestScheme) -> Self {
        Self { crypto, scheme }
    }

    /// The digest scheme in use.
    pub fn scheme(&self) -> DigestScheme {
        self.scheme
    }

    /// Sign the request with the key.
    ///
    /// On error the request is left unchanged.
    pub fn sign<R: SignedRequest>(
        &self,
        request: &mut R,
        key: Option<&C::PrivateKey>,
    ) -> SignResult<()> {
        ensure!(!request.is_signed(), SignError::AlreadySigned);
        let key = key.ok_or(SignError::MissingKey)?;

        let signer = self.crypto.identity_of(key);
        let claimed = request.claimed_identity();
        ensure!(claimed == Some(signer), SignError::IdentityMismatch { signer, claimed });

        let (staged, canonical) = request.stage()?;
        let signature = self.crypto.sign(key, &self.scheme.digest(&canonical))?;
        request.commit(staged, multibase::encode(Base::Base64, signature));
        Ok(())
    }

    /// Verify the request's signature against its claimed identity.
    pub fn verify<R: SignedRequest>(&self, request: &R) -> VerifyResult<()> {
        let text = request.signature_text().ok_or(VerifyError::NotSigned)?;
        let claimed = request.claimed_identity().ok_or(VerifyError::MissingSigner)?;
        let canonical = request.verification_bytes()?;
        let public_key =
            self.crypto.extract_public_key(&claimed).map_err(VerifyError::PublicKeyExtraction)?;
        let (_, signature) = multibase::decode(text)?;

        ensure!(
            self.crypto.verify(&public_key, &self.scheme.digest(&canonical), &signature),
            VerifyError::SignatureInvalid
        );
        Ok(())
    }
}

/// The signer used by the convenience methods on concrete requests.
pub fn default_signer() -> RequestSigner<Libp2pIdentity> {
    RequestSigner::default()
}
