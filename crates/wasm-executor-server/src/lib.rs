//! HTTP server for wasm-executor.
//!
//! This crate exposes the module registry over HTTP. It handles:
//!
//! - Module registration, guarded by an optional admin token
//! - Instance and function listings
//! - Typed invocation of exported functions
//! - Health and readiness checks
//!
//! # Quick Start
//!
//! ```ignore
//! use wasm_executor_common::{AdminConfig, LoaderConfig, RuntimeConfig};
//! use wasm_executor_server::{AppState, ExecutorServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::new(
//!         &RuntimeConfig::default(),
//!         &LoaderConfig::default(),
//!         &AdminConfig::default(),
//!     )?;
//!
//!     ExecutorServer::new(state, ServerConfig::default()).run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod handler;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use response::ApiError;
pub use router::build_router;
pub use server::{ExecutorServer, ServerConfig, TestHandle};
pub use state::AppState;
