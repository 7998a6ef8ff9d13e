//! Shared utilities for integration tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use posalpro_guard::{GuardConfig, HttpServer, SecurityState, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const ADMIN_KEY: &str = "test-admin-key";

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub security: SecurityState,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GuardConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with a known admin key and a short sweep interval.
///
/// Forwarded headers are untrusted, as in production defaults.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.admin.api_key = ADMIN_KEY.into();
    config.rate_limit.cleanup_interval_secs = 1;
    config
}

/// Config where the test client acts as the trusted reverse proxy, so
/// `X-Forwarded-For` names the client.
pub fn behind_proxy_config() -> GuardConfig {
    let mut config = test_config();
    config.security.trusted_proxies = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
    config
}

/// Start a server for `config` and wait until it accepts connections.
pub async fn start_server(config: GuardConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let security = server.security().clone();
    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    TestServer {
        addr,
        security,
        shutdown,
        config_updates,
    }
}

/// Client that never pools or proxies, so each request is a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
