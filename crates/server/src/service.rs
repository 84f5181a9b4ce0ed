//! The domain side of the routing endpoint.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use dr_types::{AddrInfo, BitswapWriteProviderRequest, Cid, Method, ProvideRequest};
use std::{future::Future, marker::PhantomData, time::Duration};
use tokio::sync::mpsc;

/// Where a service delivers results. The stream ends when every sender is dropped.
pub type ResultSink<T> = mpsc::Sender<T>;

/// One result for a find-providers request.
pub type FindProvidersAsyncResult = ServiceResult<Vec<AddrInfo>>;

/// One result for a provide request: the advisory ttl granted.
pub type ProvideAsyncResult = ServiceResult<Duration>;

/// A router answering delegated routing requests.
///
/// Every method must return promptly: the handler starts draining the sink only after the
/// method returns, so results are produced from a spawned task. An error returned here means no
/// result was produced. Errors sent into the sink are dropped by the handler.
#[async_trait]
pub trait RoutingService: Send + Sync + 'static {
    /// Start streaming the providers of `cid`.
    async fn find_providers_async(
        &self,
        cid: Cid,
        results: ResultSink<FindProvidersAsyncResult>,
    ) -> ServiceResult<()>;

    /// Accept a verified provider advertisement.
    async fn provide_async(
        &self,
        _request: ProvideRequest,
        _results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        Err(ServiceError::NotServed(Method::Provide))
    }

    /// Accept a verified bitswap provider record.
    async fn bitswap_write_provider_async(
        &self,
        _request: BitswapWriteProviderRequest,
        _results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        Err(ServiceError::NotServed(Method::BitswapWriteProvider))
    }
}

/// A [RoutingService] serving only find-providers through a closure.
pub struct FindProvidersAsyncFn<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FindProvidersAsyncFn<F, Fut>
where
    F: Fn(Cid, ResultSink<FindProvidersAsyncResult>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<()>> + Send + 'static,
{
    /// Create a new instance of Self.
    pub fn new(f: F) -> Self {
        Self { f, _fut: PhantomData }
    }
}

impl<F, Fut> std::fmt::Debug for FindProvidersAsyncFn<F, Fut> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindProvidersAsyncFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RoutingService for FindProvidersAsyncFn<F, Fut>
where
    F: Fn(Cid, ResultSink<FindProvidersAsyncResult>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<()>> + Send + 'static,
{
    async fn find_providers_async(
        &self,
        cid: Cid,
        results: ResultSink<FindProvidersAsyncResult>,
    ) -> ServiceResult<()> {
        (self.f)(cid, results).await
    }
}
