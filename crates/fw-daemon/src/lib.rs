//! fw-daemon library target.
//!
//! Exposes the router, state and background tasks for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod notify;
pub mod routes;
pub mod state;
pub mod tasks;
