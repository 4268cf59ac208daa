//! Axum handlers binding the Completion Gate, Admin Surface, and Model Catalogue
//! Builder to real routes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;

use serde::{Deserialize, Serialize};

use crate::admin::{self, AdminContext, QuotaKind};
use crate::catalogue::{self, ModelList};
use crate::gate::{CompletionGate, CompletionRequestBody, GateDecision};
use crate::kv::{ClientMetrics, KvClient, MetricsSnapshot};

use super::error::GatewayError;

/// Every this-many requests, the harness logs a metrics snapshot at `info` level
/// for operators without a scrape pipeline.
const METRICS_LOG_INTERVAL: u64 = 100;

/// Shared application state, constructed once at startup. Holds the KV
/// client as a trait object so the harness can be exercised against a fake
/// implementation in tests without a live Redis instance.
#[derive(Clone)]
pub struct AppState {
    pub gate: CompletionGate,
    pub admin: AdminContext,
    pub kv_client: Arc<dyn KvClient>,
    pub metrics: Arc<ClientMetrics>,
    pub request_count: Arc<AtomicU64>,
}

/// Axum middleware: counts inbound requests and logs a metrics snapshot every
/// [`METRICS_LOG_INTERVAL`] of them. Driven by the harness, not the KV client —
/// the client only increments its own dispatch/success/failure counters.
pub async fn log_periodic_metrics(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let count = state.request_count.fetch_add(1, Ordering::Relaxed) + 1;
    if count % METRICS_LOG_INTERVAL == 0 {
        tracing::info!(requests = count, metrics = ?state.metrics.snapshot(), "periodic metrics snapshot");
    }
    next.run(request).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub resumed: bool,
}

pub async fn handle_completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CompletionRequestBody>,
) -> Result<Json<ResumeResponse>, GatewayError> {
    let authorization = header_str(&headers, &state.admin.settings.token_header);
    let deduct_value = header_str(&headers, &state.admin.settings.deduct_header);
    let decision = state.gate.handle(authorization, deduct_value, &body).await?;
    match decision {
        GateDecision::Resume => Ok(Json(ResumeResponse { resumed: true })),
    }
}

pub async fn handle_catalogue(State(state): State<AppState>) -> Json<ModelList> {
    Json(catalogue::build_catalogue(&state.admin.settings))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_ready: bool,
    pub metrics: MetricsSnapshot,
}

pub async fn handle_healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ready = state.kv_client.ready();
    Json(HealthResponse {
        status: if store_ready { "healthy" } else { "degraded" },
        store_ready,
        metrics: state.metrics.snapshot(),
    })
}

fn admin_key_check(state: &AppState, headers: &HeaderMap) -> Result<(), GatewayError> {
    let provided = header_str(headers, &state.admin.settings.admin_header);
    admin::check_admin_key(&state.admin.settings, provided)
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    #[serde(default)]
    pub user_id: String,
}

pub async fn handle_total_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::query_quota(&state.admin.store, &state.admin.settings, QuotaKind::Total, &query.user_id).await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

pub async fn handle_used_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::query_quota(&state.admin.store, &state.admin.settings, QuotaKind::Used, &query.user_id).await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    #[serde(default)]
    pub user_id: String,
    pub quota: i64,
}

async fn refresh_quota_handler(
    state: AppState,
    headers: HeaderMap,
    form: RefreshForm,
    kind: QuotaKind,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::refresh_quota(&state.admin.store, &state.admin.settings, kind, &form.user_id, form.quota).await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

pub async fn handle_total_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<RefreshForm>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    refresh_quota_handler(state, headers, form, QuotaKind::Total).await
}

pub async fn handle_used_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<RefreshForm>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    refresh_quota_handler(state, headers, form, QuotaKind::Used).await
}

#[derive(Debug, Deserialize)]
pub struct DeltaForm {
    #[serde(default)]
    pub user_id: String,
    pub value: i64,
}

async fn delta_quota_handler(
    state: AppState,
    headers: HeaderMap,
    form: DeltaForm,
    kind: QuotaKind,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::delta_quota(&state.admin.store, &state.admin.settings, kind, &form.user_id, form.value).await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

pub async fn handle_total_delta(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<DeltaForm>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    delta_quota_handler(state, headers, form, QuotaKind::Total).await
}

pub async fn handle_used_delta(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<DeltaForm>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    delta_quota_handler(state, headers, form, QuotaKind::Used).await
}

pub async fn handle_gate_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::gate_query(
        &state.admin.store,
        &state.admin.cache,
        &state.admin.settings,
        &query.user_id,
    )
    .await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

#[derive(Debug, Deserialize)]
pub struct GateSetForm {
    #[serde(default)]
    pub user_id: String,
    pub star_value: String,
}

pub async fn handle_gate_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<GateSetForm>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    admin_key_check(&state, &headers)?;
    let result = admin::gate_set(
        &state.admin.store,
        &state.admin.cache,
        &state.admin.settings,
        &form.user_id,
        &form.star_value,
    )
    .await?;
    Ok(Json(serde_json::to_value(result).expect("envelope serializes")))
}

/// Anything not matched by a dedicated route: forwarded
/// unmodified. The real upstream is out of scope, so this is a stub that reports
/// the classifier's decision rather than actually proxying.
///
/// Re-runs the classifier here as a consistency check: the router's static route
/// table is the compiled equivalent of the same path-suffix table, so a
/// request reaching this fallback should always classify as pass-through. If it
/// doesn't, the route table and the classifier have drifted apart.
pub async fn handle_pass_through(
    State(state): State<AppState>,
    axum::extract::OriginalUri(uri): axum::extract::OriginalUri,
) -> Json<HashMap<&'static str, String>> {
    let route = crate::classify::classify(uri.path(), &state.admin.settings.admin_path);
    if !matches!(route, crate::classify::Route::PassThrough) {
        tracing::warn!(
            path = %uri.path(),
            "fallback handler received a path the classifier maps to a dedicated route"
        );
    }
    let mut body = HashMap::new();
    body.insert("pass_through_path", uri.path().to_string());
    Json(body)
}
