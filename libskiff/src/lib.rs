//! Skiff - OCI Registry Client Library
//!
//! Skiff resolves container image references and talks to OCI-compliant
//! registries, handling the registry authentication dance for you.
//!
//! # Quick Start
//!
//! ```no_run
//! use libskiff::{Client, ClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientOptions::new())?;
//!
//!     // Follows a multi-platform index to the linux/amd64 manifest
//!     let manifest = client.get_manifest("alpine:3.20", None).await?;
//!     println!("{} layers", manifest.layers().len());
//!
//!     let digest = client.get_digest("alpine:3.20").await?;
//!     println!("{}", digest);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Reference parsing**: Docker-compatible names, default registry and
//!   tag, registry rewrites, plain HTTP for private-network registries
//! - **Authentication**: Basic and Bearer challenges, token exchange, and a
//!   scope-aware credential cache with expiry
//! - **Credentials**: anonymous, static, or read from `~/.docker/config.json`
//!
//! # Main Types
//!
//! - [`Client`] - Manifest, config, digest, blob and copy operations
//! - [`Reference`] - Image reference parsing and manipulation
//! - [`AuthenticatingTransport`] - Authentication over any [`transport::Transport`]
//! - [`Config`] - Layered configuration

#![warn(clippy::all)]

/// Returns the libskiff crate version.
///
/// # Examples
///
/// ```
/// let version = libskiff::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use client::{Client, ClientOptions, PlatformSpec};
pub use config::Config;
pub use error::{Result, SkiffError};
pub use oci::ManifestOrIndex;
pub use reference::{Reference, Registry, Repository};
pub use transport::AuthenticatingTransport;

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod oci;
pub mod reference;
pub mod transport;
