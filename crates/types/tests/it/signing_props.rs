//! Property-based tests for the signed request protocol and protocol codecs.
//!
//! - sign then verify succeeds for the owning key, and any later edit breaks verification
//! - verbatim payloads are verified as received, not recanonicalized
//! - a request can only be signed once
//! - protocol payloads survive the wire conversions

use dr_types::{
    test_utils::{fixture_bitswap_request, fixture_cid, fixture_provide_request},
    BitswapWriteProviderRequest, DigestScheme, GraphSyncFILv1, IdentityCrypto, Keypair,
    Libp2pIdentity, RequestSigner, SignError, SignedRequest, TransferProtocol, VerifyError,
    TRANSPORT_BITSWAP, TRANSPORT_GRAPHSYNC_FILECOINV1,
};
use multibase::Base;
use proptest::prelude::*;
use std::time::Duration;

fn keypair_from(seed: [u8; 32]) -> Keypair {
    Keypair::ed25519_from_bytes(seed).expect("any 32 bytes are an ed25519 secret")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The owner's key verifies; changing the ttl afterwards does not.
    #[test]
    fn prop_provide_sign_verify_and_tamper(
        seed in any::<[u8; 32]>(),
        content in prop::collection::vec(any::<u8>(), 0..64),
        ttl_secs in 1u64..1_000_000,
    ) {
        let keypair = keypair_from(seed);
        let mut request = fixture_provide_request(&keypair, &content);
        request.ttl = Duration::from_secs(ttl_secs);

        request.sign(&keypair).expect("owner signs");
        prop_assert!(request.verify().is_ok());

        request.ttl += Duration::from_secs(1);
        prop_assert!(matches!(request.verify(), Err(VerifyError::SignatureInvalid)));
    }

    /// Editing the bitswap payload discards the verbatim bytes and breaks the signature.
    #[test]
    fn prop_bitswap_tamper(seed in any::<[u8; 32]>(), delta in 1i64..1_000_000) {
        let keypair = keypair_from(seed);
        let mut request = fixture_bitswap_request(&keypair);
        request.sign(&keypair).expect("owner signs");
        prop_assert!(request.verify().is_ok());

        request.payload_mut().advisory_ttl += delta;
        prop_assert!(request.raw_payload().is_none());
        prop_assert!(matches!(request.verify(), Err(VerifyError::SignatureInvalid)));
    }

    /// A second signing call is rejected and leaves the first signature in place.
    #[test]
    fn prop_double_sign_rejected(seed in any::<[u8; 32]>()) {
        let keypair = keypair_from(seed);
        let mut request = fixture_provide_request(&keypair, b"twice");
        request.sign(&keypair).expect("first sign");
        let signed = request.clone();

        prop_assert!(matches!(request.sign(&keypair), Err(SignError::AlreadySigned)));
        prop_assert_eq!(request, signed);
    }

    /// A payload signed in a non-canonical layout verifies from its verbatim bytes.
    #[test]
    fn prop_verbatim_payload_pass_through(seed in any::<[u8; 32]>()) {
        let keypair = keypair_from(seed);
        let request = fixture_bitswap_request(&keypair);
        let raw = serde_json::to_string_pretty(request.payload()).expect("pretty payload");
        let canonical = request.payload().canonical().expect("canonical payload");
        prop_assert_ne!(&raw, &canonical);

        let digest = DigestScheme::Sha256.digest(raw.as_bytes());
        let signature = Libp2pIdentity.sign(&keypair, &digest).expect("sign raw");
        let wire = serde_json::json!({
            "Protocol": "bitswap",
            "Signature": multibase::encode(Base::Base64, signature),
            "Payload": raw,
        });

        let received: BitswapWriteProviderRequest =
            serde_json::from_value(wire).expect("decode wire");
        let bytes = received.verification_bytes().expect("bytes");
        prop_assert_eq!(bytes.as_ref(), raw.as_bytes());
        prop_assert!(received.verify().is_ok());
    }

    /// Signatures only verify under the digest scheme they were made with.
    #[test]
    fn prop_digest_scheme_is_binding(seed in any::<[u8; 32]>()) {
        let keypair = keypair_from(seed);
        let legacy = RequestSigner::new(Libp2pIdentity, DigestScheme::AppendEmptySha256);
        let mut request = fixture_bitswap_request(&keypair);

        legacy.sign(&mut request, Some(&keypair)).expect("legacy sign");
        prop_assert!(legacy.verify(&request).is_ok());
        prop_assert!(matches!(request.verify(), Err(VerifyError::SignatureInvalid)));
    }

    /// Graphsync parameters survive the payload codec and the wire form exactly.
    #[test]
    fn prop_graphsync_round_trip(
        piece in prop::collection::vec(any::<u8>(), 1..32),
        verified_deal in any::<bool>(),
        fast_retrieval in any::<bool>(),
    ) {
        let params = GraphSyncFILv1 { piece_cid: fixture_cid(&piece), verified_deal, fast_retrieval };
        let protocol = TransferProtocol::graphsync_filv1(&params).expect("encode");
        let wire = protocol.to_wire().expect("valid payload");
        let back = TransferProtocol::from_wire(&wire).expect("convertible");

        prop_assert_eq!(GraphSyncFILv1::from_payload(&back.payload), Some(params));
        prop_assert_eq!(back, protocol);
    }

    /// Codes this implementation does not interpret pass through byte for byte.
    #[test]
    fn prop_unknown_code_round_trip(
        code in any::<u64>().prop_filter("known code", |c| {
            *c != TRANSPORT_BITSWAP && *c != TRANSPORT_GRAPHSYNC_FILECOINV1
        }),
        payload in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let protocol = TransferProtocol::opaque(code, payload);
        let json = serde_json::to_string(&protocol.to_wire().expect("opaque")).expect("encode");
        let wire = serde_json::from_str(&json).expect("decode");
        prop_assert_eq!(TransferProtocol::from_wire(&wire), Some(protocol));
    }
}
