//! Provide then look up through a live static router.

use delegated_routing::serve::StaticRoutingService;
use dr_client::{CancellationToken, Client};
use dr_config::{ClientConfig, ProviderIndex};
use dr_server::serve;
use dr_types::{
    test_utils::{fixture_cid, fixture_multiaddr, fixture_provide_request},
    AddrInfo, Keypair, PeerId,
};
use futures::StreamExt as _;
use std::time::Duration;
use tokio::{net::TcpListener, sync::oneshot};

#[tokio::test]
async fn test_provide_then_find() -> eyre::Result<()> {
    let listed = fixture_cid(b"listed");
    let listed_peer = PeerId::random();
    let mut index = ProviderIndex::default();
    index.insert(&listed, AddrInfo::new(listed_peer, vec![fixture_multiaddr(9000)]));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let config = ClientConfig {
        endpoint: format!("http://{}/", listener.local_addr()?),
        request_timeout: Duration::from_secs(10),
    };
    let (shutdown, stopped) = oneshot::channel::<()>();
    let router = tokio::spawn(serve(
        listener,
        StaticRoutingService::new(index, Duration::from_secs(3600)),
        async move {
            let _ = stopped.await;
        },
    ));
    let client = Client::from_config(&config)?;

    // table entries are served
    let found = client.find_providers(CancellationToken::new(), &listed).await?;
    assert_eq!(found, vec![AddrInfo::new(listed_peer, vec![fixture_multiaddr(9000)])]);

    // a signed advertisement is granted a capped ttl and served afterwards
    let keypair = Keypair::generate_ed25519();
    let mut request = fixture_provide_request(&keypair, b"advertised");
    request.ttl = Duration::from_secs(7200);
    request.sign(&keypair)?;
    let granted: Vec<_> =
        client.provide(CancellationToken::new(), &request).await?.collect().await;
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].as_ref().ok(), Some(&Duration::from_secs(3600)));

    let found = client.find_providers(CancellationToken::new(), &request.key).await?;
    assert_eq!(found, vec![request.provider.peer.clone()]);

    // unknown content yields an empty stream
    let found = client.find_providers(CancellationToken::new(), &fixture_cid(b"nobody")).await?;
    assert!(found.is_empty());

    let _ = shutdown.send(());
    router.await??;
    Ok(())
}
