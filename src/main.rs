//! posalpro-guard server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request-id ─▶ trace ─▶ timeout/body limit
//!                        ─▶ security headers ─▶ hardening middleware
//!                              │  audit log (every request)
//!                              │  tier lookup ─▶ fixed-window limiter ─▶ 429
//!                              │  CSRF check (POST/PUT/PATCH/DELETE) ─▶ 403
//!                              ▼
//!                          handlers (health, csrf-token, admin, echo)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use posalpro_guard::config::{load_config, watcher::ConfigWatcher, GuardConfig};
use posalpro_guard::observability::{logging, metrics};
use posalpro_guard::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "posalpro-guard")]
#[command(about = "Rate limiting, audit logging and CSRF protection for PosalPro", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("posalpro-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        csrf_enabled = config.csrf.enabled,
        audit_max_logs = config.audit.max_logs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload of rate-limit tiers; the watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
