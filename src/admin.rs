//! Admin Surface: authenticated query/refresh/delta operations on the total,
//! used, and gate counters. Pure business logic here; header/body/query extraction
//! lives in [`crate::http::handlers`].

use std::sync::Arc;

use serde::Serialize;

use crate::config::GatewaySettings;
use crate::gate::GateCache;
use crate::http::error::GatewayError;
use crate::store::QuotaStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Total,
    Used,
}

impl QuotaKind {
    fn key(self, settings: &GatewaySettings, identity: &str) -> String {
        match self {
            QuotaKind::Total => settings.total_key(identity),
            QuotaKind::Used => settings.used_key(identity),
        }
    }

    fn type_label(self) -> &'static str {
        match self {
            QuotaKind::Total => "total_quota",
            QuotaKind::Used => "used_quota",
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuotaData {
    pub user_id: String,
    pub quota: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GateData {
    pub user_id: String,
    pub star_value: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AdminEnvelope<T: Serialize> {
    pub code: &'static str,
    pub message: String,
    pub success: bool,
    pub data: Option<T>,
}

impl<T: Serialize> AdminEnvelope<T> {
    fn ok(code: &'static str, message: impl Into<String>, data: T) -> Self {
        Self {
            code,
            message: message.into(),
            success: true,
            data: Some(data),
        }
    }
}

fn require_user_id(user_id: &str) -> Result<(), GatewayError> {
    if user_id.trim().is_empty() {
        return Err(GatewayError::InvalidParams(
            "user_id is required".to_string(),
        ));
    }
    Ok(())
}

pub fn check_admin_key(settings: &GatewaySettings, provided: Option<&str>) -> Result<(), GatewayError> {
    match (&settings.admin_key, provided) {
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

pub async fn query_quota(
    store: &QuotaStore,
    settings: &GatewaySettings,
    kind: QuotaKind,
    user_id: &str,
) -> Result<AdminEnvelope<QuotaData>, GatewayError> {
    require_user_id(user_id)?;
    // A store transport failure on the admin surface is a 503, not the Gate's
    // phase-specific 403 (that mapping is reserved for the Completion Gate).
    let quota = store
        .read_int(&kind.key(settings, user_id))
        .await
        .map_err(|e| match e {
            crate::store::ReadIntError::Store(err) => GatewayError::StoreError(err.to_string()),
            crate::store::ReadIntError::Malformed(_) => match kind {
                QuotaKind::Total => GatewayError::InvalidTotalQuota,
                QuotaKind::Used => GatewayError::InvalidUsedQuota,
            },
        })?;
    Ok(AdminEnvelope::ok(
        "admin.query_quota",
        "success",
        QuotaData {
            user_id: user_id.to_string(),
            quota,
            kind: kind.type_label(),
        },
    ))
}

pub async fn refresh_quota(
    store: &QuotaStore,
    settings: &GatewaySettings,
    kind: QuotaKind,
    user_id: &str,
    quota: i64,
) -> Result<AdminEnvelope<()>, GatewayError> {
    require_user_id(user_id)?;
    if quota < 0 {
        return Err(GatewayError::InvalidQuotaValue(
            "quota must be non-negative".to_string(),
        ));
    }
    store
        .write_int(&kind.key(settings, user_id), quota)
        .await
        .map_err(|e| GatewayError::StoreError(e.to_string()))?;
    Ok(AdminEnvelope::ok("admin.refresh_quota", "success", ()))
}

pub async fn delta_quota(
    store: &QuotaStore,
    settings: &GatewaySettings,
    kind: QuotaKind,
    user_id: &str,
    value: i64,
) -> Result<AdminEnvelope<()>, GatewayError> {
    require_user_id(user_id)?;
    store
        .delta(&kind.key(settings, user_id), value)
        .await
        .map_err(|e| GatewayError::StoreError(e.to_string()))?;
    Ok(AdminEnvelope::ok("admin.delta_quota", "success", ()))
}

pub async fn gate_query(
    store: &QuotaStore,
    cache: &GateCache,
    settings: &GatewaySettings,
    user_id: &str,
) -> Result<AdminEnvelope<GateData>, GatewayError> {
    require_user_id(user_id)?;
    if cache.is_cached_true(user_id) {
        return Ok(AdminEnvelope::ok(
            "admin.gate_query",
            "success",
            GateData {
                user_id: user_id.to_string(),
                star_value: "true",
            },
        ));
    }
    let stored = store
        .read_string(&settings.gate_key(user_id))
        .await
        .map_err(|e| GatewayError::StoreError(e.to_string()))?;
    let star_value = match stored.as_deref() {
        Some("true") => "true",
        Some("false") | None => "false",
        Some(other) => {
            tracing::warn!(user_id, value = other, "unexpected gate flag value; reporting false");
            "false"
        }
    };
    Ok(AdminEnvelope::ok(
        "admin.gate_query",
        "success",
        GateData {
            user_id: user_id.to_string(),
            star_value,
        },
    ))
}

pub async fn gate_set(
    store: &QuotaStore,
    cache: &GateCache,
    settings: &GatewaySettings,
    user_id: &str,
    star_value: &str,
) -> Result<AdminEnvelope<()>, GatewayError> {
    require_user_id(user_id)?;
    if star_value != "true" && star_value != "false" {
        return Err(GatewayError::InvalidParams(
            "star_value must be \"true\" or \"false\"".to_string(),
        ));
    }
    // Invalidate before writing: the cache never observes a stale
    // positive entry after this call returns.
    cache.invalidate(user_id);
    store
        .set_string(&settings.gate_key(user_id), star_value)
        .await
        .map_err(|e| GatewayError::StoreError(e.to_string()))?;
    Ok(AdminEnvelope::ok("admin.gate_set", "success", ()))
}

/// Convenience bundle so the HTTP layer holds one clonable handle.
#[derive(Clone)]
pub struct AdminContext {
    pub store: QuotaStore,
    pub cache: Arc<GateCache>,
    pub settings: Arc<GatewaySettings>,
}
