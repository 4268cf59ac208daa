//! Layered gateway settings: built-in defaults, an optional YAML file,
//! then a handful of environment-variable overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_admin_path() -> String {
    "/quota".to_string()
}
fn default_token_header() -> String {
    "authorization".to_string()
}
fn default_admin_header() -> String {
    "x-admin-key".to_string()
}
fn default_deduct_header() -> String {
    "x-quota-identity".to_string()
}
fn default_deduct_header_value() -> String {
    "user".to_string()
}
fn default_redis_key_prefix() -> String {
    "chat_quota:".to_string()
}
fn default_redis_used_prefix() -> String {
    "chat_quota_used:".to_string()
}
fn default_redis_star_prefix() -> String {
    "chat_quota_star:".to_string()
}
fn default_check_github_star() -> bool {
    false
}
fn default_redis_service_name() -> String {
    "127.0.0.1".to_string()
}
fn default_redis_service_port() -> u16 {
    6379
}
fn default_redis_timeout() -> u64 {
    2_000
}
fn default_redis_database() -> i64 {
    0
}
fn default_provider_type() -> String {
    "openai".to_string()
}

/// `provider.{type, modelMapping}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,
    #[serde(default, rename = "modelMapping")]
    pub model_mapping: HashMap<String, String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model_mapping: HashMap::new(),
        }
    }
}

/// `redis.{service_name, service_port, username, password, timeout, database}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_service_name")]
    pub service_name: String,
    #[serde(default = "default_redis_service_port")]
    pub service_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_redis_timeout")]
    pub timeout: u64,
    #[serde(default = "default_redis_database")]
    pub database: i64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            service_name: default_redis_service_name(),
            service_port: default_redis_service_port(),
            username: None,
            password: None,
            timeout: default_redis_timeout(),
            database: default_redis_database(),
        }
    }
}

impl RedisSettings {
    pub fn connection_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.service_name, self.service_port, self.database
        )
    }
}

/// Runtime settings for the gateway. `admin_key` has no built-in default: its
/// absence after all layers are applied is a startup-time hard error, checked by
/// [`GatewaySettings::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_admin_path")]
    pub admin_path: String,
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_admin_header")]
    pub admin_header: String,
    #[serde(default)]
    pub admin_key: Option<String>,
    #[serde(default = "default_deduct_header")]
    pub deduct_header: String,
    #[serde(default = "default_deduct_header_value")]
    pub deduct_header_value: String,
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,
    #[serde(default = "default_redis_used_prefix")]
    pub redis_used_prefix: String,
    #[serde(default = "default_redis_star_prefix")]
    pub redis_star_prefix: String,
    #[serde(default = "default_check_github_star")]
    pub check_github_star: bool,
    #[serde(default)]
    pub model_quota_weights: HashMap<String, i64>,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            admin_path: default_admin_path(),
            token_header: default_token_header(),
            admin_header: default_admin_header(),
            admin_key: None,
            deduct_header: default_deduct_header(),
            deduct_header_value: default_deduct_header_value(),
            redis_key_prefix: default_redis_key_prefix(),
            redis_used_prefix: default_redis_used_prefix(),
            redis_star_prefix: default_redis_star_prefix(),
            check_github_star: default_check_github_star(),
            model_quota_weights: HashMap::new(),
            provider: ProviderSettings::default(),
            redis: RedisSettings::default(),
        }
    }
}

impl GatewaySettings {
    /// `total ⊕ identity`, the full key used for the total-quota counter.
    pub fn total_key(&self, identity: &str) -> String {
        format!("{}{}", self.redis_key_prefix, identity)
    }
    pub fn used_key(&self, identity: &str) -> String {
        format!("{}{}", self.redis_used_prefix, identity)
    }
    pub fn gate_key(&self, identity: &str) -> String {
        format!("{}{}", self.redis_star_prefix, identity)
    }

    pub fn weight_for(&self, model: &str) -> i64 {
        self.model_quota_weights.get(model).copied().unwrap_or(0)
    }

    /// Aborts startup with a descriptive error rather than serving a gateway that
    /// authenticates nothing.
    pub fn validate(&self) -> Result<(), String> {
        match &self.admin_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err("admin_key is required but was not set in any settings layer".to_string()),
        }
    }

    fn merge(self, overlay: PartialGatewaySettings) -> Self {
        Self {
            admin_path: overlay.admin_path.unwrap_or(self.admin_path),
            token_header: overlay.token_header.unwrap_or(self.token_header),
            admin_header: overlay.admin_header.unwrap_or(self.admin_header),
            admin_key: overlay.admin_key.or(self.admin_key),
            deduct_header: overlay.deduct_header.unwrap_or(self.deduct_header),
            deduct_header_value: overlay
                .deduct_header_value
                .unwrap_or(self.deduct_header_value),
            redis_key_prefix: overlay.redis_key_prefix.unwrap_or(self.redis_key_prefix),
            redis_used_prefix: overlay.redis_used_prefix.unwrap_or(self.redis_used_prefix),
            redis_star_prefix: overlay.redis_star_prefix.unwrap_or(self.redis_star_prefix),
            check_github_star: overlay.check_github_star.unwrap_or(self.check_github_star),
            model_quota_weights: if overlay.model_quota_weights.is_empty() {
                self.model_quota_weights
            } else {
                overlay.model_quota_weights
            },
            provider: overlay.provider.unwrap_or(self.provider),
            redis: overlay.redis.unwrap_or(self.redis),
        }
    }
}

/// Deserialization target for the optional settings file: every field optional so a
/// file that sets only `admin_key` doesn't clobber the rest with defaults.
#[derive(Debug, Default, Deserialize)]
struct PartialGatewaySettings {
    admin_path: Option<String>,
    token_header: Option<String>,
    admin_header: Option<String>,
    admin_key: Option<String>,
    deduct_header: Option<String>,
    deduct_header_value: Option<String>,
    redis_key_prefix: Option<String>,
    redis_used_prefix: Option<String>,
    redis_star_prefix: Option<String>,
    check_github_star: Option<bool>,
    #[serde(default)]
    model_quota_weights: HashMap<String, i64>,
    provider: Option<ProviderSettings>,
    redis: Option<RedisSettings>,
}

const SETTINGS_PATH_ENV: &str = "QUOTA_GATEWAY_CONFIG";
const DEFAULT_SETTINGS_PATH: &str = "/etc/quota-gateway/settings.yaml";

fn settings_file_path() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

fn load_file(path: &Path) -> PartialGatewaySettings {
    if !path.exists() {
        return PartialGatewaySettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "failed to read settings file; ignoring");
            return PartialGatewaySettings::default();
        }
    };
    match serde_yaml::from_str(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "failed to parse settings yaml; ignoring file");
            PartialGatewaySettings::default()
        }
    }
}

/// Environment-variable overrides for the handful of values operators need to flip
/// without redeploying a file: `admin_key` and the Redis connection params.
fn apply_env_overrides(mut settings: GatewaySettings) -> GatewaySettings {
    if let Ok(v) = std::env::var("QUOTA_GATEWAY_ADMIN_KEY") {
        if !v.is_empty() {
            settings.admin_key = Some(v);
        }
    }
    if let Ok(v) = std::env::var("QUOTA_GATEWAY_REDIS_HOST") {
        if !v.is_empty() {
            settings.redis.service_name = v;
        }
    }
    if let Ok(v) = std::env::var("QUOTA_GATEWAY_REDIS_PORT") {
        if let Ok(port) = v.parse() {
            settings.redis.service_port = port;
        }
    }
    if let Ok(v) = std::env::var("QUOTA_GATEWAY_REDIS_PASSWORD") {
        if !v.is_empty() {
            settings.redis.password = Some(v);
        }
    }
    settings
}

/// Defaults → optional YAML file (path from `QUOTA_GATEWAY_CONFIG` or the
/// conventional default path; missing file is not an error) → environment overrides.
pub fn load_settings() -> GatewaySettings {
    load_settings_from_path(&settings_file_path())
}

pub fn load_settings_from_path(path: &Path) -> GatewaySettings {
    let merged = GatewaySettings::default().merge(load_file(path));
    apply_env_overrides(merged)
}
