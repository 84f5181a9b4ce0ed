//! Fixtures for tests across the workspace.

use crate::{
    AddrInfo, BitswapWriteProviderPayload, BitswapWriteProviderRequest, DagJsonLink,
    GraphSyncFILv1, ProvideRequest, Provider, TransferProtocol, RAW_CODEC,
};
use cid::{multihash::Multihash, Cid};
use libp2p::{identity::Keypair, multiaddr::Protocol, Multiaddr};
use sha2::{Digest, Sha256};
use std::{net::Ipv4Addr, time::Duration};

/// Multihash code for sha2-256.
const SHA2_256: u64 = 0x12;

/// A raw CIDv1 over the sha2-256 of `data`.
pub fn fixture_cid(data: &[u8]) -> Cid {
    let digest = Sha256::digest(data);
    let multihash = Multihash::<64>::wrap(SHA2_256, &digest).expect("sha256 digest fits");
    Cid::new_v1(RAW_CODEC, multihash)
}

/// A loopback tcp address.
pub fn fixture_multiaddr(port: u16) -> Multiaddr {
    Multiaddr::empty().with(Protocol::Ip4(Ipv4Addr::LOCALHOST)).with(Protocol::Tcp(port))
}

/// A provider owned by `keypair` offering bitswap and graphsync.
pub fn fixture_provider(keypair: &Keypair) -> Provider {
    let graphsync = TransferProtocol::graphsync_filv1(&GraphSyncFILv1 {
        piece_cid: fixture_cid(b"piece"),
        verified_deal: true,
        fast_retrieval: false,
    })
    .expect("encode graphsync params");

    Provider::new(
        AddrInfo::new(
            keypair.public().to_peer_id(),
            vec![fixture_multiaddr(4001), fixture_multiaddr(4002)],
        ),
        vec![TransferProtocol::bitswap(), graphsync],
    )
}

/// An unsigned provide request for `content`.
pub fn fixture_provide_request(keypair: &Keypair, content: &[u8]) -> ProvideRequest {
    ProvideRequest::new(fixture_cid(content), fixture_provider(keypair), Duration::from_secs(3600))
}

/// An unsigned bitswap provider record for `keypair`.
pub fn fixture_bitswap_request(keypair: &Keypair) -> BitswapWriteProviderRequest {
    BitswapWriteProviderRequest::new(BitswapWriteProviderPayload {
        keys: vec![DagJsonLink(fixture_cid(b"a")), DagJsonLink(fixture_cid(b"b"))],
        timestamp: 1_700_000_000_000,
        advisory_ttl: 86_400_000,
        id: Some(keypair.public().to_peer_id()),
        addrs: vec![fixture_multiaddr(4001)],
    })
}
