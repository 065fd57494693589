//! Backend HTTP API
//!
//! Provides:
//! - Daemon catalog endpoints
//! - Suggestion, rewrite and answer endpoints backed by the LLM
//! - Wire types shared with the HTTP client

pub mod server;
pub mod wire;

pub use server::{router, ApiError, ApiServer, AppState};
