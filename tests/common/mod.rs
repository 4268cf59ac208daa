//! Shared test fixture: an in-memory `KvClient` standing in for Redis, so the
//! HTTP harness can be exercised end-to-end without a live store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use quota_gateway::kv::{CommandArg, ConnectionParams, KvClient, RespValue, RetryPolicy, format_arg};

#[derive(Default)]
pub struct FakeKvClient {
    values: Mutex<HashMap<String, String>>,
}

impl FakeKvClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, value: impl Into<String>) {
        self.values.lock().unwrap().insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KvClient for FakeKvClient {
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
        args: Vec<CommandArg>,
        _retry_policy: RetryPolicy,
    ) -> RespValue {
        let formatted: Vec<String> = args.iter().map(format_arg).collect();
        let mut values = self.values.lock().unwrap();
        match formatted.first().map(String::as_str) {
            Some("GET") => match values.get(&formatted[1]) {
                Some(v) => RespValue::BulkString(v.clone().into_bytes()),
                None => RespValue::Null,
            },
            Some("SET") => {
                values.insert(formatted[1].clone(), formatted[2].clone());
                RespValue::SimpleString(b"OK".to_vec())
            }
            Some(op @ ("INCRBY" | "DECRBY")) => {
                let current: i64 = values
                    .get(&formatted[1])
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let delta: i64 = formatted[2].parse().unwrap_or(0);
                let new_value = if op == "INCRBY" {
                    current + delta
                } else {
                    current - delta
                };
                values.insert(formatted[1].clone(), new_value.to_string());
                RespValue::Integer(new_value)
            }
            _ => RespValue::Error(quota_gateway::kv::StoreError::Protocol(format!(
                "unsupported fake command: {formatted:?}"
            ))),
        }
    }

    async fn eval(
        &self,
        _op_name: &'static str,
        _script: &str,
        _keys: &[String],
        _args: Vec<CommandArg>,
        _retry_policy: RetryPolicy,
    ) -> RespValue {
        RespValue::Error(quota_gateway::kv::StoreError::Protocol(
            "fake client does not implement EVAL".to_string(),
        ))
    }
}

pub fn encode_jwt(identity: &str) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let payload = format!(r#"{{"universal_id":"{identity}"}}"#);
    format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.as_bytes()))
}
