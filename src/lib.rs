//! AI-request quota gateway: bearer-auth identity extraction, Redis-backed quota
//! enforcement, and an admin surface, in front of an upstream chat-completion API.
//!
//! Module layout mirrors the component order of the design this crate implements:
//! a leaf-level async KV client, a fixed-shape store adapter on top of it, a pure
//! path classifier, the completion gate state machine, the admin surface, the model
//! catalogue builder, layered configuration, and finally the `axum` HTTP harness.

pub mod admin;
pub mod catalogue;
pub mod classify;
pub mod config;
pub mod gate;
pub mod http;
pub mod kv;
pub mod store;

pub use config::{GatewaySettings, load_settings};
pub use http::{AppState, build_state, router, run_http};
