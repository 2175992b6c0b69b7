//! # Gateway Module
//!
//! HTTP surface of the service: routing, shared state and the server loop.

pub mod server;

pub use server::{build_router, AppServer, AppState};
