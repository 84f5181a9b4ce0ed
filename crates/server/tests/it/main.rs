//! Http adapter tests driven through the router.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dr_server::{
    routes, FindProvidersAsyncFn, FindProvidersAsyncResult, ProvideAsyncResult, ResultSink,
    RoutingService, ServiceError, ServiceResult,
};
use dr_types::{
    test_utils::{
        fixture_bitswap_request, fixture_cid, fixture_multiaddr, fixture_provide_request,
    },
    AddrInfo, BitswapWriteProviderRequest, Cid, Envelope, EnvelopeStreamDecoder,
    GetP2PProvideRequest, Keypair, PeerId,
    ProvideRequest, RequestEnvelope, ResponseEnvelope, RoutingRequest, RoutingResponse,
};
use std::time::Duration;
use tower::ServiceExt as _;
use url::form_urlencoded;

/// Send a GET with `query` as the raw query.
async fn get(app: Router, query: &str) -> eyre::Result<(StatusCode, Vec<u8>)> {
    get_path(app, "/", query).await
}

async fn get_path(app: Router, path: &str, query: &str) -> eyre::Result<(StatusCode, Vec<u8>)> {
    let request = Request::builder().uri(format!("{path}?{query}")).body(Body::empty())?;
    let response = app.oneshot(request).await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, body.to_vec()))
}

fn escape(envelope: &RequestEnvelope) -> eyre::Result<String> {
    Ok(form_urlencoded::byte_serialize(&envelope.encode()?).collect())
}

fn decode_body(body: &[u8]) -> eyre::Result<Vec<ResponseEnvelope>> {
    let mut decoder = EnvelopeStreamDecoder::new();
    decoder.push(body);
    let mut envelopes = Vec::new();
    while let Some(envelope) = decoder.next_envelope() {
        envelopes.push(envelope?);
    }
    decoder.finish()?;
    Ok(envelopes)
}

fn find_request(cid: &Cid) -> RequestEnvelope {
    Envelope::new(RoutingRequest::GetP2PProvide(GetP2PProvideRequest::new(cid)))
}

/// Sends two providers around one failure, then closes the sink.
fn two_results_and_an_error() -> Router {
    routes(FindProvidersAsyncFn::new(|_cid: Cid, sink: ResultSink<FindProvidersAsyncResult>| async move {
        tokio::spawn(async move {
            let first = AddrInfo::new(PeerId::random(), vec![fixture_multiaddr(1)]);
            let second = AddrInfo::new(PeerId::random(), vec![fixture_multiaddr(2)]);
            let _ = sink.send(Ok(vec![first])).await;
            let _ = sink.send(Err(ServiceError::Internal("lookup failed".into()))).await;
            let _ = sink.send(Ok(vec![second])).await;
        });
        Ok(())
    }))
}

fn failing_service() -> Router {
    routes(FindProvidersAsyncFn::new(|_cid: Cid, _sink: ResultSink<FindProvidersAsyncResult>| async {
        Err(ServiceError::Internal("backend down".into()))
    }))
}

#[tokio::test]
async fn test_malformed_escape_is_bad_request() -> eyre::Result<()> {
    let (status, _) = get(two_results_and_an_error(), "%7B%2").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_undecodable_envelope_is_bad_request() -> eyre::Result<()> {
    let (status, _) = get(two_results_and_an_error(), "not-json").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mismatch: String =
        form_urlencoded::byte_serialize(br#"{"Tag":"GetP2PProvide","Payload":{"Peers":[]}}"#)
            .collect();
    let (status, _) = get(two_results_and_an_error(), &mismatch).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_unknown_method_is_not_found() -> eyre::Result<()> {
    let query: String =
        form_urlencoded::byte_serialize(br#"{"Tag":"UnknownMethod","Payload":{}}"#).collect();
    let (status, _) = get(two_results_and_an_error(), &query).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_bad_key_is_bad_request() -> eyre::Result<()> {
    let query: String = form_urlencoded::byte_serialize(
        br#"{"Tag":"GetP2PProvide","Payload":{"Key":{"/":{"bytes":"/w"}}}}"#,
    )
    .collect();
    let (status, _) = get(two_results_and_an_error(), &query).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_endpoint_path_is_ignored() -> eyre::Result<()> {
    let query = escape(&find_request(&fixture_cid(b"pathed")))?;
    for path in ["/routing", "/api/v0/routing/"] {
        let (status, body) = get_path(two_results_and_an_error(), path, &query).await?;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(decode_body(&body)?.len(), 2);
    }
    Ok(())
}

#[tokio::test]
async fn test_callback_failure_is_server_error() -> eyre::Result<()> {
    let query = escape(&find_request(&fixture_cid(b"down")))?;
    let (status, body) = get(failing_service(), &query).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_results_are_dropped_from_the_stream() -> eyre::Result<()> {
    let query = escape(&find_request(&fixture_cid(b"streamed")))?;
    let (status, body) = get(two_results_and_an_error(), &query).await?;
    assert_eq!(status, StatusCode::OK);

    let envelopes = decode_body(&body)?;
    assert_eq!(envelopes.len(), 2);
    let ports: Vec<_> = envelopes
        .iter()
        .map(|envelope| match envelope.payload() {
            RoutingResponse::GetP2PProvide(response) => {
                let addrs = response.multiaddrs().expect("valid addrs");
                assert_eq!(addrs.len(), 1);
                addrs[0].to_string()
            }
            other => panic!("unexpected response {other:?}"),
        })
        .collect();
    assert!(ports[0].starts_with("/ip4/127.0.0.1/tcp/1/p2p/"));
    assert!(ports[1].starts_with("/ip4/127.0.0.1/tcp/2/p2p/"));
    Ok(())
}

#[tokio::test]
async fn test_callback_sees_raw_cid_of_the_key() -> eyre::Result<()> {
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::channel(1);
    let app = routes(FindProvidersAsyncFn::new(
        move |cid: Cid, _sink: ResultSink<FindProvidersAsyncResult>| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(cid).await;
                Ok(())
            }
        },
    ));
    let content = fixture_cid(b"raw");
    let (status, body) = get(app, &escape(&find_request(&content))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(seen_rx.recv().await, Some(content));
    Ok(())
}

/// Accepts advertisements and grants the requested ttl, capped at one hour.
struct CappedTtl;

#[async_trait]
impl RoutingService for CappedTtl {
    async fn find_providers_async(
        &self,
        _cid: Cid,
        _results: ResultSink<FindProvidersAsyncResult>,
    ) -> ServiceResult<()> {
        Ok(())
    }

    async fn provide_async(
        &self,
        request: ProvideRequest,
        results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        tokio::spawn(async move {
            let _ = results.send(Ok(request.ttl.min(Duration::from_secs(3600)))).await;
        });
        Ok(())
    }

    async fn bitswap_write_provider_async(
        &self,
        request: BitswapWriteProviderRequest,
        results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        let requested = Duration::from_millis(request.payload().advisory_ttl as u64);
        tokio::spawn(async move {
            let _ = results.send(Ok(requested.min(Duration::from_secs(3600)))).await;
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_provide_is_verified_then_dispatched() -> eyre::Result<()> {
    let keypair = Keypair::generate_ed25519();
    let mut request = fixture_provide_request(&keypair, b"advertised");
    request.ttl = Duration::from_secs(7200);

    // unsigned advertisements are rejected before dispatch
    let unsigned = Envelope::new(RoutingRequest::Provide(request.to_wire()?));
    let (status, _) = get(routes(CappedTtl), &escape(&unsigned)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    request.sign(&keypair)?;
    let signed = Envelope::new(RoutingRequest::Provide(request.to_wire()?));
    let (status, body) = get(routes(CappedTtl), &escape(&signed)?).await?;
    assert_eq!(status, StatusCode::OK);
    let envelopes = decode_body(&body)?;
    assert_eq!(envelopes.len(), 1);
    match envelopes[0].payload() {
        RoutingResponse::Provide(response) => {
            assert_eq!(response.ttl(), Duration::from_secs(3600))
        }
        other => panic!("unexpected response {other:?}"),
    }

    // a service without provide support answers not found
    let (status, _) = get(failing_service(), &escape(&signed)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_bitswap_record_is_verified_then_dispatched() -> eyre::Result<()> {
    let keypair = Keypair::generate_ed25519();
    let mut request = fixture_bitswap_request(&keypair);
    request.sign(&keypair)?;

    let signed = Envelope::new(RoutingRequest::BitswapWriteProvider(request.clone()));
    let (status, body) = get(routes(CappedTtl), &escape(&signed)?).await?;
    assert_eq!(status, StatusCode::OK);
    let envelopes = decode_body(&body)?;
    assert_eq!(envelopes.len(), 1);
    match envelopes[0].payload() {
        RoutingResponse::BitswapWriteProvider(response) => {
            assert_eq!(response.advisory_ttl, 3_600_000_000_000)
        }
        other => panic!("unexpected response {other:?}"),
    }

    // the signed payload text is altered after signing
    let mut wire = serde_json::to_value(&request)?;
    let raw = wire["Payload"].as_str().expect("payload text").to_string();
    let tampered = raw.replace("86400000", "86400001");
    assert_ne!(raw, tampered);
    wire["Payload"] = serde_json::Value::String(tampered);
    let envelope = serde_json::json!({ "Tag": "BitswapWriteProvider", "Payload": wire });
    let query: String =
        form_urlencoded::byte_serialize(serde_json::to_string(&envelope)?.as_bytes()).collect();
    let (status, body) = get(routes(CappedTtl), &query).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(decode_body(&body)?.is_empty());
    Ok(())
}
