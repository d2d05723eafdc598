// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use osp_server::{AppState, ServerConfig, SignatureMode, build_app, register_builtin_skills};
use osp_degradation::SystemSampler;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "osp-server", version, about = "Open Skills Protocol reference server")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Signature enforcement mode: strict (default), soft (test-only), or
    /// disabled.
    #[arg(long, env = "OSP_SIGNATURE_MODE", default_value = "strict")]
    signature_mode: SignatureMode,

    /// Admin key gating the admin endpoints; unset rejects all admin
    /// requests.
    #[arg(long, env = "OSP_ADMIN_KEY")]
    admin_key: Option<String>,

    /// Requests allowed per client IP per window.
    #[arg(long, default_value_t = 100)]
    rate_limit: u32,

    /// Rate-limit window in seconds.
    #[arg(long, default_value_t = 60)]
    rate_window_secs: u64,

    /// Degradation monitor sampling interval in seconds.
    #[arg(long, default_value_t = 5)]
    monitor_interval_secs: u64,

    /// Disable the auto-degradation monitor.
    #[arg(long)]
    no_monitor: bool,

    /// Enable request/response debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("osp=debug,osp_server=debug,tower_http=info")
    } else {
        EnvFilter::new("osp=info,osp_server=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig {
        signature_mode: args.signature_mode,
        admin_key: args.admin_key,
        rate_limit_max: args.rate_limit,
        rate_limit_window: Duration::from_secs(args.rate_window_secs),
        monitor_interval: Duration::from_secs(args.monitor_interval_secs),
    };

    let state = Arc::new(AppState::new(config));
    register_builtin_skills(&state.skills);

    let monitor = if args.no_monitor {
        None
    } else {
        state.degradation.start_monitoring(
            Box::new(SystemSampler::new()),
            state.config.monitor_interval,
        )
    };

    let app = build_app(Arc::clone(&state))
        .into_make_service_with_connect_info::<std::net::SocketAddr>();

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!(bind = args.bind.as_str(), "osp-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;

    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
