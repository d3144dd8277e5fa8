//! In-process gateway server for end-to-end tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sbgw_api::{create_router, AppState};
use sbgw_conv::UnwrapRules;
use sbgw_core::{
    CredentialResolver, DeviceRegistry, FallbackPolicy, StaticCredentialStore,
    StaticRegistry,
};
use sbgw_gateway::{Dispatcher, GatewayContext};
use sbgw_gnmi::{GnmiDriver, GnmiPathMapper, MockGnmiConfig, MockGnmiConnector};
use sbgw_netconf::{MockNetconfConfig, MockNetconfConnector, NetconfDriver};
use serde_json::json;
use tokio::net::TcpListener;

/// Test server bound to a random local port, with mock device transports
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub gnmi: MockGnmiConnector,
    pub netconf: MockNetconfConnector,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

/// Devices known to every test server
pub fn registry() -> DeviceRegistry {
    let entries = [
        (
            "spine1",
            json!({"if": "gnmi", "ip": "192.0.2.1", "port": 6030, "username": "admin",
                   "skipVerify": true, "insecure": true, "encoding": "json_ietf",
                   "rootpath": ["interfaces", "system"]}),
        ),
        (
            "spine2",
            json!({"if": "gnmi", "ip": "192.0.2.2", "port": 6030, "username": "admin",
                   "skipVerify": true, "insecure": true, "encoding": "json_ietf"}),
        ),
        (
            "leaf1",
            json!({"if": "netconf", "ip": "192.0.2.3", "port": 830, "username": "admin",
                   "hostKeyVerify": false}),
        ),
    ]
    .into_iter()
    .map(|(name, entry)| (name.to_string(), entry));
    DeviceRegistry::new(Arc::new(StaticRegistry::from_entries(entries)))
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_latency(0).await
    }

    /// Start with a fixed delay on every mock device RPC
    pub async fn start_with_latency(latency_ms: u64) -> Self {
        let gnmi = MockGnmiConnector::new(MockGnmiConfig { latency_ms });
        let netconf = MockNetconfConnector::new(MockNetconfConfig { latency_ms });

        let context = GatewayContext::new(
            registry(),
            CredentialResolver::new(
                Arc::new(StaticCredentialStore::new()),
                FallbackPolicy::Default("password".to_string()),
            ),
        )
        .with_driver(Arc::new(GnmiDriver::new(
            Arc::new(gnmi.clone()),
            GnmiPathMapper::default(),
        )))
        .with_driver(Arc::new(NetconfDriver::new(
            Arc::new(netconf.clone()),
            UnwrapRules::default(),
        )))
        .with_request_timeout(Duration::from_secs(5));

        let router = create_router(AppState::new(Dispatcher::new(Arc::new(context))));

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            addr,
            client,
            gnmi,
            netconf,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
