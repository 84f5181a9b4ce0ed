// SPDX-License-Identifier: Apache-2.0
//! Wire model and signing protocol for delegated content routing.

#[macro_use]
pub mod error;
mod crypto;
mod dag_json;
mod envelope;
mod messages;
mod provider;
mod signed;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crypto::*;
pub use dag_json::*;
pub use envelope::*;
pub use error::*;
pub use messages::*;
pub use provider::*;
pub use signed::*;

// re-exports for easier maintainability
pub use cid::Cid;
pub use libp2p::{
    identity::{Keypair, PublicKey},
    Multiaddr, PeerId,
};
