//! The delegated routing client.

use crate::{
    error::{ClientError, ClientResult, TransportError},
    stream::ResultStream,
    transport::{HttpTransport, RoutingTransport},
    TransportResult,
};
use dr_config::ClientConfig;
use dr_types::{
    AddrInfo, Cid, GetP2PProvideResponse, Multiaddr, Payload as _, PeerId, ProvideRequest,
    RoutingResponse, SignedRequest as _,
};
use futures::StreamExt as _;
use libp2p::multiaddr::Protocol;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// One result of a find-providers request.
pub type FindProvidersAsyncResult = ClientResult<Vec<AddrInfo>>;

/// One result of a provide request: the advisory ttl granted by the router.
pub type ProvideAsyncResult = ClientResult<Duration>;

/// Client for a delegated router.
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
}

impl Client<HttpTransport> {
    /// Create a client for the configured http endpoint.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: RoutingTransport> Client<T> {
    /// Create a new instance of Self.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Publish a signed provider advertisement.
    ///
    /// Fails with [ClientError::UnsignedRequest] before contacting the router if the request
    /// is not signed.
    pub async fn provide(
        &self,
        cancel: CancellationToken,
        request: &ProvideRequest,
    ) -> ClientResult<ResultStream<ProvideAsyncResult>> {
        if !request.is_signed() {
            return Err(ClientError::UnsignedRequest);
        }

        let raw = self.transport.provide(request.to_wire()?).await?;
        Ok(ResultStream::spawn(cancel, raw, translate_provide))
    }

    /// Stream the providers of `cid` as the router finds them.
    pub async fn find_providers_async(
        &self,
        cancel: CancellationToken,
        cid: &Cid,
    ) -> ClientResult<ResultStream<FindProvidersAsyncResult>> {
        let raw = self.transport.find_providers(cid).await?;
        Ok(ResultStream::spawn(cancel, raw, translate_find_providers))
    }

    /// Collect every provider of `cid`.
    ///
    /// Failed results are logged and skipped.
    pub async fn find_providers(
        &self,
        cancel: CancellationToken,
        cid: &Cid,
    ) -> ClientResult<Vec<AddrInfo>> {
        let mut stream = self.find_providers_async(cancel, cid).await?;
        let mut providers = Vec::new();
        while let Some(result) = stream.next().await {
            match result {
                Ok(infos) => providers.extend(infos),
                Err(e) => warn!(target: "dr::client", ?e, %cid, "skipping failed find-providers result"),
            }
        }
        Ok(providers)
    }
}

fn translate_provide(item: TransportResult<RoutingResponse>) -> ProvideAsyncResult {
    match item? {
        RoutingResponse::Provide(response) => Ok(response.ttl()),
        other => Err(TransportError::UnexpectedMethod(other.method()).into()),
    }
}

fn translate_find_providers(item: TransportResult<RoutingResponse>) -> FindProvidersAsyncResult {
    match item? {
        RoutingResponse::GetP2PProvide(response) => group_by_peer(&response),
        other => Err(TransportError::UnexpectedMethod(other.method()).into()),
    }
}

/// Group flattened peer addresses by their trailing `/p2p` component.
///
/// Peers keep the order of their first address. Addresses without a peer component cannot be
/// attributed and are dropped.
fn group_by_peer(response: &GetP2PProvideResponse) -> FindProvidersAsyncResult {
    let mut infos: Vec<AddrInfo> = Vec::new();
    for addr in response.multiaddrs()? {
        let Some((peer, addr)) = split_peer(addr.clone()) else {
            warn!(target: "dr::client", %addr, "dropping provider address without peer id");
            continue;
        };
        match infos.iter_mut().find(|info| info.id == peer) {
            Some(info) => info.addrs.push(addr),
            None => infos.push(AddrInfo::new(peer, vec![addr])),
        }
    }
    Ok(infos)
}

/// Split `/.../p2p/<id>` into the peer and its transport address.
fn split_peer(mut addr: Multiaddr) -> Option<(PeerId, Multiaddr)> {
    match addr.pop()? {
        Protocol::P2p(peer) => Some((peer, addr)),
        _ => None,
    }
}
