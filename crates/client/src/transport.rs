// SPDX-License-Identifier: Apache-2.0
//! Transports that carry request envelopes to a router and stream raw responses back.

use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use dr_config::ClientConfig;
use dr_types::{
    Cid, Envelope, EnvelopeStreamDecoder, GetP2PProvideRequest, ProvideRequestWire,
    RequestEnvelope, RoutingRequest, RoutingResponse,
};
use futures::StreamExt as _;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

/// Raw response items in the order the router produced them.
pub type RawResponses = mpsc::Receiver<TransportResult<RoutingResponse>>;

/// Capability for sending a request to a router.
///
/// A transport returns once the router accepted the request. Results then arrive on the
/// returned channel until the router finishes or the receiver is dropped.
#[async_trait]
pub trait RoutingTransport: Send + Sync + 'static {
    /// Send one request envelope.
    async fn call(&self, request: RequestEnvelope) -> TransportResult<RawResponses>;

    /// Ask for the providers of `cid`.
    async fn find_providers(&self, cid: &Cid) -> TransportResult<RawResponses> {
        let request = GetP2PProvideRequest::new(cid);
        self.call(Envelope::new(RoutingRequest::GetP2PProvide(request))).await
    }

    /// Publish a signed provider advertisement.
    async fn provide(&self, request: ProvideRequestWire) -> TransportResult<RawResponses> {
        self.call(Envelope::new(RoutingRequest::Provide(request))).await
    }
}

/// Transport over http.
///
/// The request envelope is sent url-escaped as the entire query of a GET. The body is a
/// delimiter-free concatenation of response envelopes read until the connection closes.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a new instance of Self.
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::Client::builder().connect_timeout(config.request_timeout).build()?;
        Ok(Self { client, endpoint, request_timeout: config.request_timeout })
    }

    /// The url carrying `request`.
    pub fn request_url(&self, request: &RequestEnvelope) -> TransportResult<Url> {
        let json = request.encode()?;
        let escaped: String = form_urlencoded::byte_serialize(&json).collect();
        let mut url = self.endpoint.clone();
        url.set_query(Some(&escaped));
        Ok(url)
    }
}

#[async_trait]
impl RoutingTransport for HttpTransport {
    async fn call(&self, request: RequestEnvelope) -> TransportResult<RawResponses> {
        let url = self.request_url(&request)?;
        debug!(target: "dr::client", method = %request.method(), %url, "sending request");

        let response = tokio::time::timeout(self.request_timeout, self.client.get(url).send())
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;
        if response.status() != StatusCode::OK {
            return Err(TransportError::Status(response.status()));
        }

        let (tx, rx) = mpsc::channel(1);
        let mut body = Box::pin(response.bytes_stream());
        tokio::spawn(async move {
            let mut decoder = EnvelopeStreamDecoder::<RoutingResponse>::new();
            loop {
                let chunk = tokio::select! {
                    _ = tx.closed() => return,
                    chunk = body.next() => chunk,
                };

                match chunk {
                    Some(Ok(bytes)) => {
                        decoder.push(&bytes);
                        while let Some(item) = decoder.next_envelope() {
                            let item = item.map(Envelope::into_payload).map_err(Into::into);
                            if tx.send(item).await.is_err() {
                                return;
                            }
                        }
                        if decoder.is_poisoned() {
                            warn!(target: "dr::client", "response body cannot be resynchronised");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                    None => {
                        if let Err(e) = decoder.finish() {
                            let _ = tx.send(Err(e.into())).await;
                        }
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
