//! quota-gateway CLI: load settings, connect to Redis, serve HTTP.
//!
//! Logging: set `RUST_LOG=quota_gateway=debug` to see request-level detail on stderr.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quota_gateway::kv::{ConnectionParams, KvClient, RedisKvClient};
use quota_gateway::{GatewaySettings, build_state, load_settings, run_http};

/// AI-request quota gateway.
#[derive(Parser, Debug)]
#[command(name = "quota-gateway", version, about)]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Path to a YAML settings file; overrides `QUOTA_GATEWAY_CONFIG`.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quota_gateway=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings: GatewaySettings = match &cli.config {
        Some(path) => quota_gateway::config::load_settings_from_path(std::path::Path::new(path)),
        None => load_settings(),
    };
    if let Err(err) = settings.validate() {
        anyhow::bail!("invalid configuration: {err}");
    }
    let settings = Arc::new(settings);

    let redis_client = Arc::new(RedisKvClient::new("quota-gateway"));
    let metrics = redis_client.metrics.clone();
    let connection_params = ConnectionParams {
        username: settings.redis.username.clone(),
        password: settings.redis.password.clone(),
        timeout_ms: settings.redis.timeout,
        database: settings.redis.database,
    };
    if let Err(err) = redis_client.init(&settings.redis.connection_url(), connection_params) {
        tracing::warn!(error = %err, "redis client init failed; will retry lazily on first operation");
    }

    let state = build_state(settings, redis_client, metrics);
    run_http(&cli.bind, state).await
}
