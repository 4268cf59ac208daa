//! Completion Gate: the main state machine executed on chat-completion
//! requests. Implemented as one linear `async fn` awaiting each Store call in
//! turn, so the "at most one Store call in flight per request" rule holds by
//! construction — there is no point in this function where two `.await`s on Store
//! calls are outstanding at once.

mod token;

pub use token::{ClaimError, HeaderError, extract_bearer_token, extract_identity};

use std::sync::Arc;

use dashmap::DashSet;
use serde::Deserialize;

use crate::config::GatewaySettings;
use crate::http::error::GatewayError;
use crate::store::QuotaStore;

/// Process-local monotone set of identities known to have a `"true"` gate flag
/// Only positive entries are ever cached; a miss forces a store read.
#[derive(Default)]
pub struct GateCache {
    known_true: DashSet<String>,
}

impl GateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached_true(&self, identity: &str) -> bool {
        self.known_true.contains(identity)
    }

    pub fn mark_true(&self, identity: &str) {
        self.known_true.insert(identity.to_string());
    }

    /// Invalidate before any admin write to the underlying gate flag.
    pub fn invalidate(&self, identity: &str) {
        self.known_true.remove(identity);
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequestBody {
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request proceed upstream unmodified.
    Resume,
}

#[derive(Clone)]
pub struct CompletionGate {
    store: QuotaStore,
    settings: Arc<GatewaySettings>,
    cache: Arc<GateCache>,
}

impl CompletionGate {
    pub fn new(store: QuotaStore, settings: Arc<GatewaySettings>, cache: Arc<GateCache>) -> Self {
        Self {
            store,
            settings,
            cache,
        }
    }

    /// Run the full HeaderPhase → BodyPhase → GateCheck → QuotaCheck → Decision
    /// chain for one request.
    pub async fn handle(
        &self,
        authorization_header: Option<&str>,
        deduct_header_value: Option<&str>,
        body: &CompletionRequestBody,
    ) -> Result<GateDecision, GatewayError> {
        // HeaderPhase.
        let token = extract_bearer_token(authorization_header).map_err(|e| match e {
            HeaderError::NoToken => GatewayError::NoToken,
            HeaderError::InvalidToken => GatewayError::InvalidToken,
        })?;
        let identity = extract_identity(&token).map_err(|e| match e {
            ClaimError::TokenParseFailed => GatewayError::TokenParseFailed,
            ClaimError::NoUserId => GatewayError::NoUserId,
        })?;

        // BodyPhase.
        let weight = self.settings.weight_for(&body.model);
        if weight == 0 {
            return Ok(GateDecision::Resume);
        }

        // GateCheck, only when gating is enabled.
        if self.settings.check_github_star {
            self.run_gate_check(&identity).await?;
        }

        // QuotaCheck.
        let should_deduct = deduct_header_value
            .map(|v| v == self.settings.deduct_header_value)
            .unwrap_or(false);
        let total = self
            .store
            .read_int(&self.settings.total_key(&identity))
            .await
            .map_err(GatewayError::from_total_read)?;
        let used = self
            .store
            .read_int(&self.settings.used_key(&identity))
            .await
            .map_err(GatewayError::from_used_read)?;
        let remaining = total - used;

        if used > total + weight {
            tracing::warn!(
                identity = %identity,
                total,
                used,
                weight,
                "used quota significantly exceeds total; allowing arithmetic to proceed"
            );
        }

        // Decision.
        if remaining < weight {
            return Err(GatewayError::InsufficientQuota {
                required: weight,
                available: remaining,
            });
        }
        if !should_deduct {
            return Ok(GateDecision::Resume);
        }

        let new_used = self
            .store
            .delta(&self.settings.used_key(&identity), weight)
            .await
            .map_err(|e| GatewayError::DeductionFailed(e.to_string()))?;
        if new_used < weight {
            return Err(GatewayError::DeductionInconsistent);
        }
        tracing::debug!(
            identity = %identity,
            weight,
            new_used,
            "deducted quota"
        );
        Ok(GateDecision::Resume)
    }

    async fn run_gate_check(&self, identity: &str) -> Result<(), GatewayError> {
        if self.cache.is_cached_true(identity) {
            return Ok(());
        }
        match self.store.read_string(&self.settings.gate_key(identity)).await {
            // Fail-open: the sole documented exception to "errors terminate the
            // request".
            Err(err) => {
                tracing::warn!(
                    identity = %identity,
                    error = %err,
                    "gate flag read failed; failing open"
                );
                Ok(())
            }
            Ok(Some(value)) if value == "true" => {
                self.cache.mark_true(identity);
                Ok(())
            }
            Ok(_) => Err(GatewayError::StarRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{CommandArg, ConnectionParams, KvClient, RespValue, RetryPolicy};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<VecDeque<RespValue>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<RespValue>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl KvClient for ScriptedClient {
        fn init(&self, _url: &str, _params: ConnectionParams) -> Result<(), String> {
            Ok(())
        }
        fn ready(&self) -> bool {
            true
        }
        async fn call(
            &self,
            _op_name: &'static str,
            _key_label: &str,
            _args: Vec<CommandArg>,
            _retry_policy: RetryPolicy,
        ) -> RespValue {
            self.responses.lock().unwrap().pop_front().unwrap()
        }
        async fn eval(
            &self,
            _op_name: &'static str,
            _script: &str,
            _keys: &[String],
            _args: Vec<CommandArg>,
            _retry_policy: RetryPolicy,
        ) -> RespValue {
            self.responses.lock().unwrap().pop_front().unwrap()
        }
    }

    fn gate_with(responses: Vec<RespValue>, settings: GatewaySettings) -> CompletionGate {
        let store = QuotaStore::new(Arc::new(ScriptedClient::new(responses)), RetryPolicy::default());
        CompletionGate::new(store, Arc::new(settings), Arc::new(GateCache::new()))
    }

    fn settings_with_weight(model: &str, weight: i64) -> GatewaySettings {
        let mut settings = GatewaySettings::default();
        settings.model_quota_weights.insert(model.to_string(), weight);
        settings
    }

    fn token_for(identity: &str) -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = format!(r#"{{"universal_id":"{identity}"}}"#);
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.as_bytes()))
    }

    #[tokio::test]
    async fn missing_token_rejects_401() {
        let gate = gate_with(vec![], settings_with_weight("gpt-4", 1));
        let body = CompletionRequestBody {
            model: "gpt-4".to_string(),
        };
        let result = gate.handle(None, None, &body).await;
        assert_eq!(result, Err(GatewayError::NoToken));
    }

    #[tokio::test]
    async fn zero_weight_model_bypasses_everything() {
        let gate = gate_with(vec![], GatewaySettings::default());
        let token = token_for("u1");
        let header = format!("Bearer {token}");
        let body = CompletionRequestBody {
            model: "untracked-model".to_string(),
        };
        let result = gate.handle(Some(&header), None, &body).await;
        assert_eq!(result, Ok(GateDecision::Resume));
    }

    #[tokio::test]
    async fn sufficient_quota_with_deduction_resumes() {
        let settings = settings_with_weight("gpt-4", 2);
        let gate = gate_with(
            vec![
                RespValue::Integer(10),
                RespValue::Integer(3),
                RespValue::Integer(5),
            ],
            settings.clone(),
        );
        let token = token_for("u1");
        let header = format!("Bearer {token}");
        let body = CompletionRequestBody {
            model: "gpt-4".to_string(),
        };
        let result = gate
            .handle(Some(&header), Some(&settings.deduct_header_value), &body)
            .await;
        assert_eq!(result, Ok(GateDecision::Resume));
    }

    #[tokio::test]
    async fn insufficient_quota_rejects_403_with_literal_message() {
        let settings = settings_with_weight("gpt-4", 2);
        let gate = gate_with(vec![RespValue::Integer(4), RespValue::Integer(3)], settings);
        let token = token_for("u2");
        let header = format!("Bearer {token}");
        let body = CompletionRequestBody {
            model: "gpt-4".to_string(),
        };
        let result = gate.handle(Some(&header), None, &body).await;
        assert_eq!(
            result,
            Err(GatewayError::InsufficientQuota {
                required: 2,
                available: 1
            })
        );
    }

    #[tokio::test]
    async fn gate_check_fails_open_on_store_error() {
        use crate::kv::StoreError;
        let mut settings = settings_with_weight("gpt-4", 1);
        settings.check_github_star = true;
        let gate = gate_with(
            vec![
                RespValue::Error(StoreError::Connection("down".into())),
                RespValue::Integer(10),
                RespValue::Integer(0),
                RespValue::Integer(1),
            ],
            settings.clone(),
        );
        let token = token_for("u3");
        let header = format!("Bearer {token}");
        let body = CompletionRequestBody {
            model: "gpt-4".to_string(),
        };
        let result = gate
            .handle(Some(&header), Some(&settings.deduct_header_value), &body)
            .await;
        assert_eq!(result, Ok(GateDecision::Resume));
    }
}
