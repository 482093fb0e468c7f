//! proximity-server
//!
//! Multi-client async TCP server that keeps a live proximity index of
//! connected users.

pub mod config;
pub mod directory;
pub mod types;
pub mod server;
pub mod hub_task;

// internal module, not re-exported
mod client;
