// SPDX-License-Identifier: Apache-2.0
//! Http adapter for a [RoutingService].
//!
//! The whole raw query of a GET is one url-escaped JSON request envelope. Results are written
//! as they arrive, one JSON response envelope each, with no delimiter and no end marker. The
//! response ends when the service drops its result sink.

use crate::{
    error::{HandlerError, ServiceResult},
    service::RoutingService,
};
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use dr_types::{
    BitswapWriteProviderResponse, Envelope, GetP2PProvideResponse, ParseRequestError,
    ProvideRequest, ProvideResponse, RequestEnvelope, RoutingRequest, RoutingResponse,
};
use futures::StreamExt as _;
use percent_encoding::percent_decode_str;
use std::{convert::Infallible, future::Future, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// The router serving `service` at every path.
///
/// Clients may be configured with an endpoint path; the query alone selects the method.
pub fn routes<S: RoutingService>(service: S) -> Router {
    Router::new()
        .route("/", get(handle::<S>))
        .route("/*path", get(handle::<S>))
        .with_state(Arc::new(service))
}

/// Serve `service` on the listener until `shutdown` resolves.
pub async fn serve<S, F>(listener: TcpListener, service: S, shutdown: F) -> std::io::Result<()>
where
    S: RoutingService,
    F: Future<Output = ()> + Send + 'static,
{
    info!(target: "dr::server", addr = ?listener.local_addr()?, "serving delegated routing");
    axum::serve(listener, routes(service)).with_graceful_shutdown(shutdown).await
}

async fn handle<S: RoutingService>(
    State(service): State<Arc<S>>,
    RawQuery(query): RawQuery,
) -> Result<Response, HandlerError> {
    let message = unescape_query(query.as_deref().unwrap_or_default())?;
    let envelope = RequestEnvelope::decode(&message)?;
    debug!(target: "dr::server", method = %envelope.method(), "request decoded");

    let body = match envelope.into_payload() {
        RoutingRequest::GetP2PProvide(request) => {
            let cid = request.content_id().map_err(HandlerError::Key)?;
            let (tx, rx) = mpsc::channel(1);
            service.find_providers_async(cid, tx).await?;
            encode_results(rx, |infos| {
                RoutingResponse::GetP2PProvide(GetP2PProvideResponse::from_addr_infos(&infos))
            })
        }
        RoutingRequest::Provide(wire) => {
            let request = ProvideRequest::from_wire(&wire)?;
            let (tx, rx) = mpsc::channel(1);
            service.provide_async(request, tx).await?;
            encode_results(rx, |ttl| RoutingResponse::Provide(ProvideResponse::new(ttl)))
        }
        RoutingRequest::BitswapWriteProvider(request) => {
            request.verify().map_err(ParseRequestError::from)?;
            let (tx, rx) = mpsc::channel(1);
            service.bitswap_write_provider_async(request, tx).await?;
            encode_results(rx, |ttl| {
                RoutingResponse::BitswapWriteProvider(BitswapWriteProviderResponse::new(ttl))
            })
        }
    };

    Ok((StatusCode::OK, body).into_response())
}

/// Encode each successful result as one response envelope. Failed results are dropped.
fn encode_results<T, F>(results: mpsc::Receiver<ServiceResult<T>>, to_response: F) -> Body
where
    T: Send + 'static,
    F: Fn(T) -> RoutingResponse + Send + 'static,
{
    let chunks = ReceiverStream::new(results).filter_map(move |result| {
        let chunk = match result {
            Ok(value) => match Envelope::new(to_response(value)).encode() {
                Ok(bytes) => Some(Ok::<_, Infallible>(Bytes::from(bytes))),
                Err(e) => {
                    warn!(target: "dr::server", ?e, "failed to encode result");
                    None
                }
            },
            Err(e) => {
                debug!(target: "dr::server", ?e, "dropping failed result");
                None
            }
        };
        futures::future::ready(chunk)
    });
    Body::from_stream(chunks)
}

/// Url-unescape a raw query, treating `+` as a space.
///
/// Every `%` must start a two digit hex escape.
fn unescape_query(raw: &str) -> Result<Vec<u8>, HandlerError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|b| *b == b'%') {
        let at = i + offset;
        let escape = bytes.get(at + 1..at + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(HandlerError::Unescape(format!("malformed escape at byte {at}")));
        }
        i = at + 3;
    }
    Ok(percent_decode_str(&raw.replace('+', " ")).collect())
}
