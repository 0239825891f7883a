//! HTTP API module.
//!
//! This module provides the HTTP server, its request/response types and the
//! pipeline log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
