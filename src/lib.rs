// ABOUTME: Library root for bgctl - exposes the promotion engine for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod hooks;
pub mod output;
pub mod promotion;
pub mod provider;
pub mod resolve;
pub mod routing;
pub mod supervisor;
pub mod types;
