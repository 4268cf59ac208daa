//! HTTP Server Harness and the HTTP-boundary error taxonomy.

pub mod error;
mod handlers;
mod server;

pub use error::GatewayError;
pub use handlers::AppState;
pub use server::{build_state, router, run_http};
