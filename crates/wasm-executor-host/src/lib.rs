//! Host-facing adapters for wasm-executor.
//!
//! This crate connects the registry in `wasm-executor-core` to an embedding
//! host (the HTTP server, the CLI, or a database extension):
//!
//! - [`permissions`]: who may load modules, and from where
//! - [`paths`]: canonicalization of user-supplied module paths
//! - [`rows`]: serializable rows for instance and function listings
//! - [`api`]: the [`HostApi`] facade, including fixed-arity `invoke_N` calls
//!
//! # Security Model
//!
//! Listing and invoking are unprivileged. Loading requires
//! [`Permissions::load_enabled`], and the canonical module path must lie in
//! one of [`Permissions::allowed_dirs`] when that list is non-empty.

pub mod api;
pub mod paths;
pub mod permissions;
pub mod rows;

pub use api::{CreateOutcome, HostApi};
pub use paths::PathResolver;
pub use permissions::{Permissions, PermissionsBuilder};
pub use rows::{FunctionRow, InstanceRow};
