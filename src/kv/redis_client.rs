//! Concrete `KvClient` over a real async `redis`-protocol connection.
//!
//! Grounded on the reference codebase's Valkey-backed session store: a
//! lazily-established, mutex-guarded [`redis::aio::MultiplexedConnection`] that is
//! dropped and reconnected on failure rather than retried indefinitely in place.
//! One reconnect attempt per call, then the classified error surfaces to the caller
//! — the caller (Store Adapter, Gate, Admin Surface) decides whether to reissue, per
//! the abstract contract's retry semantics.

use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use super::client::{ConnectionParams, KvClient};
use super::error::StoreError;
use super::metrics::ClientMetrics;
use super::retry::RetryPolicy;
use super::value::{CommandArg, RespValue, format_arg};

/// Closure captured when `init` fails, reattempted on the next operation.
struct DeferredInit {
    url: String,
}

pub struct RedisKvClient {
    cluster_name: String,
    client: OnceLock<redis::Client>,
    deferred: StdMutex<Option<DeferredInit>>,
    connection: AsyncMutex<Option<redis::aio::MultiplexedConnection>>,
    pub metrics: Arc<ClientMetrics>,
}

impl RedisKvClient {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            client: OnceLock::new(),
            deferred: StdMutex::new(None),
            connection: AsyncMutex::new(None),
            metrics: Arc::new(ClientMetrics::default()),
        }
    }

    fn try_build_client(&self, url: &str) -> Result<(), String> {
        let client = redis::Client::open(url).map_err(|e| e.to_string())?;
        let _ = self.client.set(client);
        Ok(())
    }

    /// Reattempt a previously-failed `init` if one is pending. Never blocks.
    fn reattempt_deferred_init(&self) {
        if self.client.get().is_some() {
            return;
        }
        let pending = {
            let mut guard = self.deferred.lock().expect("deferred init mutex poisoned");
            guard.take()
        };
        if let Some(deferred) = pending {
            if self.try_build_client(&deferred.url).is_err() {
                let mut guard = self.deferred.lock().expect("deferred init mutex poisoned");
                *guard = Some(deferred);
            }
        }
    }

    async fn ensure_connection(&self) -> Result<(), StoreError> {
        self.reattempt_deferred_init();
        let client = self
            .client
            .get()
            .ok_or(StoreError::NotReady)?;
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::from_message(e.to_string()))?;
        *guard = Some(conn);
        tracing::debug!(
            cluster = %self.cluster_name,
            "redis kv client connected"
        );
        Ok(())
    }

    /// Run one command, reconnecting exactly once on failure before surfacing a
    /// classified error.
    async fn run(&self, op_name: &'static str, cmd: redis::Cmd) -> RespValue {
        let request_id = uuid::Uuid::new_v4();
        self.metrics.record_dispatch();
        for attempt in 0..2 {
            if let Err(err) = self.ensure_connection().await {
                self.metrics.record_failure();
                tracing::warn!(
                    request_id = %request_id,
                    operation = op_name,
                    error = %err,
                    "redis kv client not ready"
                );
                return RespValue::Error(err);
            }
            let mut guard = self.connection.lock().await;
            let Some(conn) = guard.as_mut() else {
                self.metrics.record_failure();
                return RespValue::Error(StoreError::NotReady);
            };
            let result: redis::RedisResult<redis::Value> = cmd.query_async(conn).await;
            match result {
                Ok(value) => {
                    self.metrics.record_success();
                    return from_redis_value(value);
                }
                Err(err) => {
                    *guard = None;
                    drop(guard);
                    self.metrics.record_retry();
                    tracing::warn!(
                        request_id = %request_id,
                        operation = op_name,
                        attempt,
                        error = %err,
                        "redis kv client command failed; reconnecting"
                    );
                    if attempt == 0 {
                        continue;
                    }
                    self.metrics.record_failure();
                    return RespValue::Error(StoreError::from_message(err.to_string()));
                }
            }
        }
        unreachable!("loop always returns within two attempts")
    }
}

fn from_redis_value(value: redis::Value) -> RespValue {
    match value {
        redis::Value::Nil => RespValue::Null,
        redis::Value::Int(i) => RespValue::Integer(i),
        redis::Value::BulkString(bytes) => RespValue::BulkString(bytes),
        redis::Value::SimpleString(s) => RespValue::SimpleString(s.into_bytes()),
        redis::Value::Okay => RespValue::SimpleString(b"OK".to_vec()),
        redis::Value::Array(items) | redis::Value::Set(items) => {
            RespValue::Array(items.into_iter().map(from_redis_value).collect())
        }
        other => RespValue::SimpleString(format!("{other:?}").into_bytes()),
    }
}

fn build_cmd(args: &[CommandArg]) -> redis::Cmd {
    let mut iter = args.iter();
    let name = iter.next().map(format_arg).unwrap_or_default();
    let mut cmd = redis::cmd(&name);
    for arg in iter {
        cmd.arg(format_arg(arg));
    }
    cmd
}

#[async_trait]
impl KvClient for RedisKvClient {
    fn init(&self, url: &str, _params: ConnectionParams) -> Result<(), String> {
        match self.try_build_client(url) {
            Ok(()) => Ok(()),
            Err(err) => {
                let mut guard = self.deferred.lock().expect("deferred init mutex poisoned");
                *guard = Some(DeferredInit { url: url.to_string() });
                Err(err)
            }
        }
    }

    fn ready(&self) -> bool {
        self.client.get().is_some()
    }

    async fn call(
        &self,
        op_name: &'static str,
        _key_label: &str,
        args: Vec<CommandArg>,
        _retry_policy: RetryPolicy,
    ) -> RespValue {
        self.run(op_name, build_cmd(&args)).await
    }

    async fn eval(
        &self,
        op_name: &'static str,
        script: &str,
        keys: &[String],
        args: Vec<CommandArg>,
        _retry_policy: RetryPolicy,
    ) -> RespValue {
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(script).arg(keys.len() as i64);
        for key in keys {
            cmd.arg(key);
        }
        for arg in &args {
            cmd.arg(format_arg(arg));
        }
        self.run(op_name, cmd).await
    }
}
