//! Credentials from the local Docker configuration.
//!
//! Registries logged into with `docker login` are listed under `auths` in
//! `config.json`, found in `$DOCKER_CONFIG` or `~/.docker`.

use crate::auth::{Authenticator, RegistryAuthentication};
use crate::error::Result;
use crate::reference::{DEFAULT_REGISTRY_HOST, Registry};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;

/// Key under which `docker login` stores Docker Hub credentials.
const LEGACY_DOCKER_HUB_KEY: &str = "https://index.docker.io/v1/";

#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, RegistryAuthentication>,
}

/// Reads credentials from a Docker `config.json`.
///
/// The file is read on every lookup so that a `docker login` performed while
/// the process runs is picked up. A missing or malformed file yields no
/// credentials rather than an error.
#[derive(Debug, Clone, Default)]
pub struct DockerAuthenticator {
    path: Option<PathBuf>,
}

impl DockerAuthenticator {
    /// Uses `$DOCKER_CONFIG/config.json`, falling back to
    /// `~/.docker/config.json`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the config file at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the config file this authenticator reads, if one can be
    /// located.
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }

        let dir = match std::env::var_os("DOCKER_CONFIG") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()?.join(".docker"),
        };
        Some(dir.join("config.json"))
    }

    async fn read_config(path: &Path) -> Option<DockerConfig> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no docker config file");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read docker config");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse docker config");
                None
            }
        }
    }
}

#[async_trait]
impl Authenticator for DockerAuthenticator {
    async fn auth_for_registry(&self, registry: &Registry) -> Result<RegistryAuthentication> {
        let Some(path) = self.config_path() else {
            return Ok(RegistryAuthentication::default());
        };
        let Some(mut config) = Self::read_config(&path).await else {
            return Ok(RegistryAuthentication::default());
        };

        let mut auth = config.auths.remove(registry.host());
        if auth.is_none() && registry.host() == DEFAULT_REGISTRY_HOST {
            auth = config.auths.remove(LEGACY_DOCKER_HUB_KEY);
        }

        Ok(auth.unwrap_or_default())
    }
}
