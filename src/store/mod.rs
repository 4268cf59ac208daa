//! Quota Store Adapter: fixed-shape operations layered on the KV client.

use std::sync::Arc;

use crate::kv::{CommandArg, KvClient, RespValue, RetryPolicy, StoreError};

/// Either a transport/protocol failure, or a value present in the store but not a
/// well-formed non-negative integer. Kept distinct from [`StoreError`] because the
/// Completion Gate and Admin Surface map the two to different HTTP status codes.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadIntError {
    Store(StoreError),
    Malformed(String),
}

impl std::fmt::Display for ReadIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadIntError::Store(e) => write!(f, "{e}"),
            ReadIntError::Malformed(v) => write!(f, "malformed integer value: {v:?}"),
        }
    }
}

/// Decision bit from [`QuotaStore::atomic_gate`]: whether the deduction occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicGateOutcome {
    pub total: i64,
    pub used_before: i64,
    pub remaining: i64,
    pub deducted: bool,
}

/// Script for the compound "read both counters, compare, conditionally increment"
/// operation. Returns `[total, used_before, remaining, 0|1]`.
const ATOMIC_GATE_SCRIPT: &str = r#"
local total = tonumber(redis.call("GET", KEYS[1])) or 0
local used = tonumber(redis.call("GET", KEYS[2])) or 0
local weight = tonumber(ARGV[1])
local remaining = total - used
local deducted = 0
if remaining >= weight then
  redis.call("INCRBY", KEYS[2], weight)
  deducted = 1
end
return {total, used, remaining, deducted}
"#;

#[derive(Clone)]
pub struct QuotaStore {
    client: Arc<dyn KvClient>,
    retry_policy: RetryPolicy,
}

impl QuotaStore {
    pub fn new(client: Arc<dyn KvClient>, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// Interpret `Null` as `0`. Error if the value is present but not a decimal
    /// integer, or negative (`total ≥ 0 ∧ used ≥ 0`).
    pub async fn read_int(&self, key: &str) -> Result<i64, ReadIntError> {
        let value = self
            .client
            .call(
                "read_int",
                key,
                vec![CommandArg::from("GET"), CommandArg::from(key)],
                self.retry_policy,
            )
            .await;
        match value {
            RespValue::Null => Ok(0),
            RespValue::Error(e) => Err(ReadIntError::Store(e)),
            other => {
                let raw = other.as_bulk_str().map(str::to_string).or_else(|| {
                    other.as_integer().map(|i| i.to_string())
                });
                let Some(raw) = raw else {
                    return Err(ReadIntError::Malformed(format!("{other:?}")));
                };
                match raw.parse::<i64>() {
                    Ok(n) if n >= 0 => Ok(n),
                    _ => Err(ReadIntError::Malformed(raw)),
                }
            }
        }
    }

    pub async fn write_int(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let result = self
            .client
            .call(
                "write_int",
                key,
                vec![
                    CommandArg::from("SET"),
                    CommandArg::from(key),
                    CommandArg::from(value),
                ],
                self.retry_policy,
            )
            .await;
        self.expect_ok(result)
    }

    pub async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .call(
                "set_string",
                key,
                vec![
                    CommandArg::from("SET"),
                    CommandArg::from(key),
                    CommandArg::from(value),
                ],
                self.retry_policy,
            )
            .await;
        self.expect_ok(result)
    }

    pub async fn read_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .client
            .call(
                "read_string",
                key,
                vec![CommandArg::from("GET"), CommandArg::from(key)],
                self.retry_policy,
            )
            .await;
        match value {
            RespValue::Null => Ok(None),
            RespValue::Error(e) => Err(e),
            other => Ok(other.as_bulk_str().map(str::to_string)),
        }
    }

    /// Atomic add for `signed_delta >= 0`, atomic subtract otherwise; `|delta|` is
    /// always sent as a non-negative operand. Returns the counter's new value.
    pub async fn delta(&self, key: &str, signed_delta: i64) -> Result<i64, StoreError> {
        let (op, magnitude) = if signed_delta >= 0 {
            ("INCRBY", signed_delta)
        } else {
            ("DECRBY", -signed_delta)
        };
        let result = self
            .client
            .call(
                "delta",
                key,
                vec![
                    CommandArg::from(op),
                    CommandArg::from(key),
                    CommandArg::from(magnitude),
                ],
                self.retry_policy,
            )
            .await;
        match result {
            RespValue::Error(e) => Err(e),
            other => other
                .as_integer()
                .ok_or_else(|| StoreError::Unknown(format!("non-integer delta reply: {other:?}"))),
        }
    }

    /// Preferred deduction primitive: read both counters, compute remaining,
    /// and on `remaining >= weight` perform the increment, all in one round trip.
    pub async fn atomic_gate(
        &self,
        total_key: &str,
        used_key: &str,
        weight: i64,
    ) -> Result<AtomicGateOutcome, StoreError> {
        let result = self
            .client
            .eval(
                "atomic_gate",
                ATOMIC_GATE_SCRIPT,
                &[total_key.to_string(), used_key.to_string()],
                vec![CommandArg::from(weight)],
                self.retry_policy,
            )
            .await;
        match result {
            RespValue::Error(e) => Err(e),
            RespValue::Array(items) if items.len() == 4 => {
                let get = |i: usize| items[i].as_integer().unwrap_or(0);
                Ok(AtomicGateOutcome {
                    total: get(0),
                    used_before: get(1),
                    remaining: get(2),
                    deducted: get(3) != 0,
                })
            }
            other => Err(StoreError::Unknown(format!(
                "unexpected atomic_gate reply shape: {other:?}"
            ))),
        }
    }

    fn expect_ok(&self, value: RespValue) -> Result<(), StoreError> {
        match value {
            RespValue::Error(e) => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::ConnectionParams;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// A fake [`KvClient`] that replays scripted responses keyed by op name, for
    /// exercising the Store Adapter's parsing logic without a real Redis instance.
    struct FakeClient {
        responses: Mutex<Vec<RespValue>>,
    }

    impl FakeClient {
        fn new(responses: Vec<RespValue>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl KvClient for FakeClient {
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
            self.responses.lock().unwrap().remove(0)
        }
        async fn eval(
            &self,
            _op_name: &'static str,
            _script: &str,
            _keys: &[String],
            _args: Vec<CommandArg>,
            _retry_policy: RetryPolicy,
        ) -> RespValue {
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn store_with(responses: Vec<RespValue>) -> QuotaStore {
        QuotaStore::new(Arc::new(FakeClient::new(responses)), RetryPolicy::default())
    }

    #[tokio::test]
    async fn read_int_treats_missing_key_as_zero() {
        let store = store_with(vec![RespValue::Null]);
        assert_eq!(store.read_int("k").await, Ok(0));
    }

    #[tokio::test]
    async fn read_int_rejects_negative_values() {
        let store = store_with(vec![RespValue::BulkString(b"-5".to_vec())]);
        assert!(matches!(
            store.read_int("k").await,
            Err(ReadIntError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn read_int_rejects_non_numeric_values() {
        let store = store_with(vec![RespValue::BulkString(b"banana".to_vec())]);
        assert!(matches!(
            store.read_int("k").await,
            Err(ReadIntError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn read_int_surfaces_store_errors() {
        let store = store_with(vec![RespValue::Error(StoreError::Timeout("x".into()))]);
        assert_eq!(
            store.read_int("k").await,
            Err(ReadIntError::Store(StoreError::Timeout("x".into())))
        );
    }

    #[tokio::test]
    async fn delta_picks_incrby_or_decrby_by_sign() {
        let store = store_with(vec![RespValue::Integer(10), RespValue::Integer(3)]);
        assert_eq!(store.delta("used", 5).await, Ok(10));
        assert_eq!(store.delta("used", -2).await, Ok(3));
    }

    #[tokio::test]
    async fn atomic_gate_parses_four_element_array() {
        let store = store_with(vec![RespValue::Array(vec![
            RespValue::Integer(10),
            RespValue::Integer(3),
            RespValue::Integer(7),
            RespValue::Integer(1),
        ])]);
        let outcome = store.atomic_gate("total", "used", 2).await.unwrap();
        assert_eq!(
            outcome,
            AtomicGateOutcome {
                total: 10,
                used_before: 3,
                remaining: 7,
                deducted: true,
            }
        );
    }
}
