//! Envelope codec across every registered method.

use assert_matches::assert_matches;
use dr_types::{
    test_utils::{fixture_bitswap_request, fixture_cid, fixture_multiaddr, fixture_provide_request},
    AddrInfo, BitswapWriteProviderResponse, DecodeError, Envelope, EnvelopeStreamDecoder,
    GetP2PProvideRequest, GetP2PProvideResponse, Keypair, Method, PeerId, ProvideResponse,
    RequestEnvelope, ResponseEnvelope, RoutingRequest, RoutingResponse,
};
use std::time::Duration;

fn every_request() -> eyre::Result<Vec<RequestEnvelope>> {
    let keypair = Keypair::generate_ed25519();
    let mut provide = fixture_provide_request(&keypair, b"every request");
    provide.sign(&keypair)?;
    let mut bitswap = fixture_bitswap_request(&keypair);
    bitswap.sign(&keypair)?;

    Ok(vec![
        Envelope::new(RoutingRequest::GetP2PProvide(GetP2PProvideRequest::new(&fixture_cid(
            b"find",
        )))),
        Envelope::new(RoutingRequest::Provide(provide.to_wire()?)),
        Envelope::new(RoutingRequest::BitswapWriteProvider(bitswap)),
    ])
}

fn every_response() -> Vec<ResponseEnvelope> {
    let info = AddrInfo::new(PeerId::random(), vec![fixture_multiaddr(1), fixture_multiaddr(2)]);
    vec![
        Envelope::new(RoutingResponse::GetP2PProvide(GetP2PProvideResponse::from_addr_infos(&[
            info,
        ]))),
        Envelope::new(RoutingResponse::Provide(ProvideResponse::new(Duration::from_secs(60)))),
        Envelope::new(RoutingResponse::BitswapWriteProvider(BitswapWriteProviderResponse {
            advisory_ttl: 42,
        })),
    ]
}

#[test]
fn test_every_request_method_round_trips() -> eyre::Result<()> {
    let requests = every_request()?;
    let methods: Vec<_> = requests.iter().map(Envelope::method).collect();
    assert_eq!(methods, Method::ALL);

    for envelope in requests {
        let decoded = RequestEnvelope::decode(&envelope.encode()?)?;
        assert_eq!(decoded, envelope);
    }
    Ok(())
}

#[test]
fn test_every_response_method_round_trips() -> eyre::Result<()> {
    for envelope in every_response() {
        let decoded = ResponseEnvelope::decode(&envelope.encode()?)?;
        assert_eq!(decoded, envelope);
    }
    Ok(())
}

#[test]
fn test_request_tag_is_not_a_response() -> eyre::Result<()> {
    // same tag, request payload shape, decoded as a response
    let request = &every_request()?[0];
    let err = ResponseEnvelope::decode(&request.encode()?).expect_err("wrong direction");
    assert_matches!(err, DecodeError::PayloadMismatch { method: Method::GetP2PProvide, .. });
    Ok(())
}

#[test]
fn test_concatenated_stream_byte_by_byte() -> eyre::Result<()> {
    let responses = every_response();
    let mut body = Vec::new();
    for envelope in &responses {
        body.extend(envelope.encode()?);
    }

    let mut decoder = EnvelopeStreamDecoder::<RoutingResponse>::new();
    let mut decoded = Vec::new();
    for byte in body {
        decoder.push(&[byte]);
        while let Some(envelope) = decoder.next_envelope() {
            decoded.push(envelope?);
        }
    }
    decoder.finish()?;
    assert_eq!(decoded, responses);
    Ok(())
}
