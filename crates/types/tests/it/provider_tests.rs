//! Provider and transfer protocol wire conversions.

use dr_types::{
    test_utils::{fixture_cid, fixture_multiaddr, fixture_provider},
    AddrInfo, GraphSyncFILv1, Keypair, PeerId, Provider, ProviderWire, TransferProtocol,
    TransferProtocolWire, TRANSPORT_BITSWAP,
};
use serde_json::json;

#[test]
fn test_provider_round_trip_preserves_order() -> eyre::Result<()> {
    let provider = Provider::new(
        AddrInfo::new(
            PeerId::random(),
            vec![fixture_multiaddr(3), fixture_multiaddr(1), fixture_multiaddr(2)],
        ),
        vec![
            TransferProtocol::opaque(0x0920, vec![9, 9]),
            TransferProtocol::bitswap(),
            TransferProtocol::opaque(0x0930, Vec::new()),
        ],
    );

    let json = serde_json::to_string(&provider.to_wire())?;
    let wire: ProviderWire = serde_json::from_str(&json)?;
    assert_eq!(Provider::from_wire(&wire)?, provider);
    Ok(())
}

#[test]
fn test_graphsync_wire_shape() -> eyre::Result<()> {
    let piece = fixture_cid(b"piece");
    let protocol = TransferProtocol::graphsync_filv1(&GraphSyncFILv1 {
        piece_cid: piece,
        verified_deal: true,
        fast_retrieval: false,
    })?;

    let wire = protocol.to_wire().expect("well formed payload");
    assert_eq!(
        serde_json::to_value(&wire)?,
        json!({
            "GraphSyncFILv1": {
                "PieceCID": { "/": piece.to_string() },
                "VerifiedDeal": true,
                "FastRetrieval": false,
            }
        })
    );
    assert_eq!(TransferProtocol::from_wire(&wire), Some(protocol));
    Ok(())
}

#[test]
fn test_bad_protocol_entries_are_dropped() -> eyre::Result<()> {
    let keypair = Keypair::generate_ed25519();
    let mut value = serde_json::to_value(fixture_provider(&keypair).to_wire())?;
    let protocols = value["ProviderProto"].as_array_mut().expect("protocol list");
    protocols.insert(0, json!({ "Carrier": {} }));
    protocols.push(json!({ "GraphSyncFILv1": { "PieceCID": "not a link" } }));

    let wire: ProviderWire = serde_json::from_value(value)?;
    let provider = Provider::from_wire(&wire)?;
    assert_eq!(provider.protocols, fixture_provider(&keypair).protocols);
    assert_eq!(provider.protocols[0].codec, TRANSPORT_BITSWAP);
    Ok(())
}

#[test]
fn test_bad_peer_fails_provider() {
    let wire: ProviderWire = serde_json::from_value(json!({
        "ProviderNode": { "Peer": { "ID": { "/": { "bytes": "/w" } }, "Multiaddresses": [] } },
        "ProviderProto": [ { "Bitswap": {} } ],
    }))
    .expect("structurally valid");
    assert!(Provider::from_wire(&wire).is_err());
}

#[test]
fn test_unknown_wire_variant_shape() -> eyre::Result<()> {
    let wire = TransferProtocol::opaque(0x0920, vec![0xde, 0xad]).to_wire().expect("opaque");
    assert!(matches!(wire, TransferProtocolWire::Unknown(_)));
    assert_eq!(
        serde_json::to_value(&wire)?,
        json!({ "Unknown": { "Code": 0x0920, "Payload": { "/": { "bytes": "3q0" } } } })
    );
    Ok(())
}
