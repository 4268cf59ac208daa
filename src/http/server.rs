//! HTTP Server Harness: binds the Request Classifier's routes to axum,
//! owns the `TcpListener`, and shuts down gracefully on `SIGINT`/`SIGTERM`.
//!
//! Grounded on the reference gateway's `router()`/`run_http()`/`shutdown_signal()`
//! trio: one `Router` built from shared, cloneable state, served with
//! `with_graceful_shutdown`.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware;
use axum::routing::{any, get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admin::AdminContext;
use crate::config::GatewaySettings;
use crate::gate::{CompletionGate, GateCache};
use crate::kv::{ClientMetrics, KvClient};
use crate::store::QuotaStore;

use super::handlers::{
    AppState, handle_catalogue, handle_completion, handle_gate_query, handle_gate_set,
    handle_healthz, handle_pass_through, handle_total_delta, handle_total_query,
    handle_total_refresh, handle_used_delta, handle_used_query, handle_used_refresh,
    log_periodic_metrics,
};

/// Build the application `Router`. The admin sub-routes are laid out at
/// their literal paths rather than constructed from `admin_path` dynamically,
/// since `axum::Router` routes are fixed at build time; `settings.admin_path`
/// is still honoured because the router is (re)built once per process using the
/// already-loaded settings.
pub fn router(state: AppState) -> Router {
    let admin_base = format!("/v1/chat/completions{}", state.admin.settings.admin_path);

    Router::new()
        .route("/v1/chat/completions", post(handle_completion))
        .route("/ai-gateway/api/v1/models", get(handle_catalogue))
        .route("/healthz", get(handle_healthz))
        .route(&admin_base, get(handle_total_query))
        .route(&format!("{admin_base}/refresh"), post(handle_total_refresh))
        .route(&format!("{admin_base}/delta"), post(handle_total_delta))
        .route(&format!("{admin_base}/used"), get(handle_used_query))
        .route(
            &format!("{admin_base}/used/refresh"),
            post(handle_used_refresh),
        )
        .route(&format!("{admin_base}/used/delta"), post(handle_used_delta))
        .route(&format!("{admin_base}/star"), get(handle_gate_query))
        .route(&format!("{admin_base}/star/set"), post(handle_gate_set))
        .fallback(any(handle_pass_through))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            log_periodic_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_state(
    settings: Arc<GatewaySettings>,
    kv_client: Arc<dyn KvClient>,
    metrics: Arc<ClientMetrics>,
) -> AppState {
    let cache = Arc::new(GateCache::new());
    let store = QuotaStore::new(kv_client.clone(), crate::kv::RetryPolicy::default());
    AppState {
        gate: CompletionGate::new(store.clone(), settings.clone(), cache.clone()),
        admin: AdminContext {
            store,
            cache,
            settings,
        },
        kv_client,
        metrics,
        request_count: Arc::new(AtomicU64::new(0)),
    }
}

/// Run the HTTP server; binds to `bind_addr` (e.g. `0.0.0.0:8080`). Graceful
/// shutdown on Ctrl+C (SIGINT) and SIGTERM (Unix); in-flight requests complete
/// before exit.
pub async fn run_http(bind_addr: &str, state: AppState) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = bind_addr, "quota gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server exited with error")?;
    tracing::info!("quota gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
    }
}
