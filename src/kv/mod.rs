//! Async KV Client: command encoding, tagged response values, error
//! classification, retry policy, process metrics, and a concrete redis-backed
//! implementation of the callback-driven contract.

mod client;
mod error;
mod metrics;
mod redis_client;
mod retry;
mod value;

pub use client::{ClusterDescriptor, ConnectionParams, KvClient, NamedCluster};
pub use error::StoreError;
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use redis_client::RedisKvClient;
pub use retry::RetryPolicy;
pub use value::{CommandArg, RespValue, encode_command, format_arg};
