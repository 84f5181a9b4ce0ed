//! Serve routing requests from a static provider table.

use async_trait::async_trait;
use clap::Args;
use dr_config::{
    resolve_path, Config, ConfigFmt, ConfigTrait as _, ProviderIndex, ServerConfig,
    StaticProviders,
};
use dr_server::{
    serve, FindProvidersAsyncResult, ProvideAsyncResult, ResultSink, RoutingService,
    ServiceError, ServiceResult,
};
use dr_types::{AddrInfo, BitswapWriteProviderRequest, Cid, ProvideRequest};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};

/// Start the routing endpoint.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Listen on this address instead of the configured one.
    #[arg(long, value_name = "SOCKET_ADDR")]
    pub listen: Option<SocketAddr>,
}

impl ServeArgs {
    /// Serve until ctrl-c.
    ///
    /// A relative `providers_file` is resolved against `base`.
    pub async fn execute(&self, mut config: ServerConfig, base: &Path) -> eyre::Result<()> {
        if let Some(addr) = self.listen {
            config.listen_addr = addr;
        }

        let index = match &config.providers_file {
            Some(path) => {
                let path = resolve_path(base, path);
                Config::load_from_path::<StaticProviders>(&path, ConfigFmt::YAML)?.index()?
            }
            None => ProviderIndex::default(),
        };
        info!(target: "dr::serve", keys = index.len(), "provider table loaded");

        let listener = TcpListener::bind(config.listen_addr).await?;
        let service = StaticRoutingService::new(index, config.max_advisory_ttl);
        serve(listener, service, shutdown_signal()).await?;
        info!(target: "dr::serve", "routing endpoint stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "dr::serve", ?e, "failed to listen for ctrl-c");
        return;
    }
    info!(target: "dr::serve", "ctrl-c received, shutting down");
}

/// Answers from an in-memory provider index.
///
/// Accepted advertisements are added to the index and served to later lookups. Granted ttls
/// never exceed `max_advisory_ttl`. Entries are never expired.
#[derive(Debug, Clone)]
pub struct StaticRoutingService {
    index: Arc<RwLock<ProviderIndex>>,
    max_advisory_ttl: Duration,
}

impl StaticRoutingService {
    /// Create a new instance of Self.
    pub fn new(index: ProviderIndex, max_advisory_ttl: Duration) -> Self {
        Self { index: Arc::new(RwLock::new(index)), max_advisory_ttl }
    }

    fn grant(&self, requested: Duration) -> Duration {
        requested.min(self.max_advisory_ttl)
    }

    async fn record(&self, keys: impl Iterator<Item = &Cid>, info: &AddrInfo) {
        let mut index = self.index.write().await;
        for key in keys {
            index.insert(key, info.clone());
        }
    }
}

/// Deliver a single result. The sink has room for one item before it is drained.
fn send_one<T>(results: &ResultSink<ServiceResult<T>>, value: T) -> ServiceResult<()> {
    results.try_send(Ok(value)).map_err(|e| ServiceError::Internal(e.to_string()))
}

#[async_trait]
impl RoutingService for StaticRoutingService {
    async fn find_providers_async(
        &self,
        cid: Cid,
        results: ResultSink<FindProvidersAsyncResult>,
    ) -> ServiceResult<()> {
        let providers = self.index.read().await.lookup(&cid).to_vec();
        debug!(target: "dr::serve", %cid, providers = providers.len(), "find providers");
        if providers.is_empty() {
            return Ok(());
        }
        send_one(&results, providers)
    }

    async fn provide_async(
        &self,
        request: ProvideRequest,
        results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        let granted = self.grant(request.ttl);
        self.record(std::iter::once(&request.key), &request.provider.peer).await;
        info!(
            target: "dr::serve",
            key = %request.key,
            peer = %request.provider.peer.id,
            ttl = %humantime::format_duration(granted),
            "provider recorded",
        );
        send_one(&results, granted)
    }

    async fn bitswap_write_provider_async(
        &self,
        request: BitswapWriteProviderRequest,
        results: ResultSink<ProvideAsyncResult>,
    ) -> ServiceResult<()> {
        let payload = request.payload();
        let id = payload
            .id
            .ok_or_else(|| ServiceError::Internal("verified record without identity".into()))?;
        let info = AddrInfo::new(id, payload.addrs.clone());
        self.record(payload.keys.iter().map(|link| link.cid()), &info).await;

        let requested = Duration::from_millis(u64::try_from(payload.advisory_ttl).unwrap_or_default());
        let granted = self.grant(requested);
        info!(
            target: "dr::serve",
            keys = payload.keys.len(),
            peer = %id,
            ttl = %humantime::format_duration(granted),
            "bitswap provider recorded",
        );
        send_one(&results, granted)
    }
}
