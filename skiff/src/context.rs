//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables (`SKIFF_*`)
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::config;
use crate::format::OutputFormat;
use libskiff::auth::{RegistryAuthentication, StaticAuthenticator};
use libskiff::{Client, ClientOptions, Config};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// How much diagnostic output to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Normal,
    Verbose,
    Debug,
    Trace,
}

impl VerbosityLevel {
    /// Map the number of `-v` flags to a level
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Default tracing filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v` flags.
pub fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    /// Output format for command results
    pub format: OutputFormat,
    /// Username and password given on the command line
    pub credentials: Option<(String, String)>,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars > CLI flags
    pub fn build(
        cli_config: Option<&Path>,
        format: OutputFormat,
        credentials: Option<(String, String)>,
    ) -> Result<Self, String> {
        let config_path = config::resolve_config_path(cli_config);
        if let Some(path) = &config_path {
            tracing::info!(path = %path.display(), "loading configuration");
        }

        let config = Config::load(config_path.as_deref()).map_err(|e| e.to_string())?;

        Ok(Self {
            config,
            format,
            credentials,
        })
    }

    /// Context over an already loaded configuration
    #[cfg(test)]
    pub fn with_config(config: Config, format: OutputFormat) -> Self {
        Self {
            config,
            format,
            credentials: None,
        }
    }

    /// Create a registry client from this context.
    ///
    /// Credentials given on the command line replace Docker credentials and
    /// are offered to every registry.
    pub fn client(&self) -> Result<Client, String> {
        let mut options = ClientOptions::from_config(&self.config);
        if let Some((username, password)) = &self.credentials {
            let authenticator = StaticAuthenticator::new()
                .with_fallback(RegistryAuthentication::basic(username, password));
            options = options.with_authenticator(Arc::new(authenticator));
        }

        Client::new(options).map_err(|e| format!("Failed to create client: {}", e))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
