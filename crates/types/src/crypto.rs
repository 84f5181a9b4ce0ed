// SPDX-License-Identifier: Apache-2.0
//! Identity and signing capability.
//!
//! The signing protocol never touches key material directly. It asks an [IdentityCrypto]
//! implementation to derive identities, extract public keys and run the signature math.

use crate::error::CryptoError;
use cid::multihash::Multihash;
use libp2p::{
    identity::{Keypair, PublicKey},
    PeerId,
};

/// Multihash code for the identity hash, used by peer ids that inline their public key.
const IDENTITY_MULTIHASH_CODE: u64 = 0x00;

/// Capability for peer identities and the signatures bound to them.
pub trait IdentityCrypto {
    /// The secret half of a keypair.
    type PrivateKey;
    /// The key used to check signatures.
    type PublicKey;

    /// The identity implied by a private key.
    fn identity_of(&self, key: &Self::PrivateKey) -> PeerId;

    /// Extract the public key embedded in an identity.
    fn extract_public_key(&self, identity: &PeerId) -> Result<Self::PublicKey, CryptoError>;

    /// Sign the message.
    fn sign(&self, key: &Self::PrivateKey, msg: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check a signature over the message.
    fn verify(&self, key: &Self::PublicKey, msg: &[u8], signature: &[u8]) -> bool;
}

/// [IdentityCrypto] over `libp2p::identity`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Libp2pIdentity;

impl IdentityCrypto for Libp2pIdentity {
    type PrivateKey = Keypair;
    type PublicKey = PublicKey;

    fn identity_of(&self, key: &Keypair) -> PeerId {
        key.public().to_peer_id()
    }

    fn extract_public_key(&self, identity: &PeerId) -> Result<PublicKey, CryptoError> {
        let multihash = Multihash::<64>::from_bytes(&identity.to_bytes())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        if multihash.code() != IDENTITY_MULTIHASH_CODE {
            return Err(CryptoError::NoInlineKey(*identity));
        }
        PublicKey::try_decode_protobuf(multihash.digest())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    fn sign(&self, key: &Keypair, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        key.sign(msg).map_err(|e| CryptoError::Signing(e.to_string()))
    }

    fn verify(&self, key: &PublicKey, msg: &[u8], signature: &[u8]) -> bool {
        key.verify(msg, signature)
    }
}
