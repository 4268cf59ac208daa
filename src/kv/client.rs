//! Async KV client contract: one operation, one eventual resolution.
//!
//! The originating host only offers callbacks, so the abstract contract is phrased as
//! "submit a command, a continuation fires exactly once with a [`RespValue`]". This
//! crate targets `tokio`'s structured concurrency, where `.await` on an `async fn`
//! *is* that continuation: the Gate and Admin Surface never hold two outstanding
//! Store calls at once, which is exactly the discipline the abstract contract
//! requires. `KvClient::call`/`KvClient::eval` therefore resolve to a `RespValue`
//! directly rather than taking an explicit callback closure; transport/protocol
//! failures are represented as `RespValue::Error`, never a Rust-level `Err`, so a
//! caller that forgets to branch on the value still observes the classified error.

use async_trait::async_trait;

use super::retry::RetryPolicy;
use super::value::{CommandArg, RespValue};

/// Capability a Store cluster descriptor must supply. Kept minimal so the client can
/// be generic over whatever cluster-addressing scheme a host provides.
pub trait ClusterDescriptor: Send + Sync {
    fn cluster_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct NamedCluster(pub String);

impl ClusterDescriptor for NamedCluster {
    fn cluster_name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: u64,
    pub database: i64,
}

/// The async KV client contract. One `call`/`eval` submits one command and resolves
/// to exactly one [`RespValue`] (possibly `Error`).
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Register connection parameters. On failure the implementation records a
    /// deferred-init closure that reattempts on the first subsequent operation;
    /// never blocks.
    fn init(&self, url: &str, params: ConnectionParams) -> Result<(), String>;

    /// `false` until `init` has succeeded (directly, or via deferred retry).
    fn ready(&self) -> bool;

    /// Submit one command; resolves to exactly one value. Operations issued while
    /// not-ready fail fast with `RespValue::Error(StoreError::NotReady)`.
    async fn call(
        &self,
        op_name: &'static str,
        key_label: &str,
        args: Vec<CommandArg>,
        retry_policy: RetryPolicy,
    ) -> RespValue;

    /// Forward a server-side script (compound operations).
    async fn eval(
        &self,
        op_name: &'static str,
        script: &str,
        keys: &[String],
        args: Vec<CommandArg>,
        retry_policy: RetryPolicy,
    ) -> RespValue;
}
