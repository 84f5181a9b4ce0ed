//! Commands that talk to a router.

use crate::keytool::read_keypair;
use clap::Args;
use dr_client::{CancellationToken, Client, HttpTransport, ResultStream};
use dr_config::ClientConfig;
use dr_types::{AddrInfo, Cid, Multiaddr, ProvideRequest, Provider, TransferProtocol};
use futures::StreamExt as _;
use std::path::PathBuf;
use tracing::{info, warn};

/// Router connection overrides.
#[derive(Debug, Clone, Args)]
pub struct EndpointArgs {
    /// The router endpoint. Overrides the configured endpoint.
    #[arg(long, value_name = "URL", env = "DR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// How long to wait for the router to answer, e.g. `10s`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<humantime::Duration>,
}

impl EndpointArgs {
    fn client(&self, mut config: ClientConfig) -> eyre::Result<Client<HttpTransport>> {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout.into();
        }
        Ok(Client::from_config(&config)?)
    }
}

/// Stream the providers of one content id.
#[derive(Debug, Clone, Args)]
pub struct FindProvidersArgs {
    /// The content id to look up.
    #[arg(value_name = "CID")]
    pub cid: Cid,

    #[command(flatten)]
    pub router: EndpointArgs,
}

impl FindProvidersArgs {
    /// Print each provider as it arrives, one peer id followed by its addresses.
    pub async fn execute(&self, config: ClientConfig) -> eyre::Result<()> {
        let client = self.router.client(config)?;
        let cancel = CancellationToken::new();
        let stream = client.find_providers_async(cancel.clone(), &self.cid).await?;

        let found = drain_until_ctrl_c(stream, cancel, |infos: Vec<AddrInfo>| {
            for info in infos {
                println!("{}", info.id);
                for addr in info.addrs {
                    println!("  {addr}");
                }
            }
        })
        .await;
        info!(target: "dr::cli", cid = %self.cid, results = found, "find providers finished");
        Ok(())
    }
}

/// Advertise this node as a provider of one or more content ids.
#[derive(Debug, Clone, Args)]
pub struct ProvideArgs {
    /// The content ids to advertise.
    #[arg(value_name = "CID", required = true, num_args = 1..)]
    pub cids: Vec<Cid>,

    /// The identity that signs the advertisements.
    #[arg(long, value_name = "KEY_FILE", default_value = "identity.key")]
    pub key_file: PathBuf,

    /// Addresses the content is retrievable from, comma separated.
    #[arg(long = "addr", value_name = "MULTIADDRS", value_delimiter = ',')]
    pub addrs: Vec<Multiaddr>,

    /// The advisory ttl to request.
    #[arg(long, value_name = "DURATION", default_value = "24h")]
    pub ttl: humantime::Duration,

    #[command(flatten)]
    pub router: EndpointArgs,
}

impl ProvideArgs {
    /// Sign one provide request per content id and print the ttl each was granted.
    pub async fn execute(&self, config: ClientConfig) -> eyre::Result<()> {
        let keypair = read_keypair(&self.key_file)?;
        let client = self.router.client(config)?;
        let provider = Provider::new(
            AddrInfo::new(keypair.public().to_peer_id(), self.addrs.clone()),
            vec![TransferProtocol::bitswap()],
        );

        for cid in &self.cids {
            let mut request = ProvideRequest::new(*cid, provider.clone(), self.ttl.into());
            request.sign(&keypair)?;

            let cancel = CancellationToken::new();
            let stream = client.provide(cancel.clone(), &request).await?;
            let granted = drain_until_ctrl_c(stream, cancel, |ttl| {
                println!("{cid} {}", humantime::format_duration(ttl));
            })
            .await;
            if granted == 0 {
                warn!(target: "dr::cli", %cid, "router granted no ttl");
            }
        }
        Ok(())
    }
}

/// Feed successful results to `on_result` until the stream ends or ctrl-c cancels it.
///
/// Failed results are logged. Returns the number of successful results.
async fn drain_until_ctrl_c<T, E, F>(
    mut stream: ResultStream<Result<T, E>>,
    cancel: CancellationToken,
    mut on_result: F,
) -> usize
where
    E: std::fmt::Debug,
    F: FnMut(T),
{
    let mut count = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!(target: "dr::cli", "interrupted");
                cancel.cancel();
                return count;
            }
            next = stream.next() => match next {
                Some(Ok(value)) => {
                    count += 1;
                    on_result(value);
                }
                Some(Err(e)) => warn!(target: "dr::cli", ?e, "failed result"),
                None => return count,
            }
        }
    }
}
