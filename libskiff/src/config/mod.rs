//! Client configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `SKIFF_`-prefixed environment variables, where `__` separates nested keys
//! (`SKIFF_NETWORK__TIMEOUT=60`).

use crate::auth::DockerAuthenticator;
use crate::error::{Result, SkiffError};
use crate::reference::{DEFAULT_REGISTRY, DEFAULT_TAG, ReferenceParseOptions, RegistryParseOptions};
use crate::transport::TransportConfig;
use config::{Config as ConfigRs, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};


const ENV_PREFIX: &str = "SKIFF";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub reference: Reference,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub auth: Auth,
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Parses a `Config` from a YAML string, over the defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from defaults, the file at `path` if given, and the
    /// environment.
    ///
    /// A given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading environment variables from `env`
    /// instead of the process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Self::defaults()?;
        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        Self::from_builder(builder, path)
    }

    fn defaults() -> Result<Builder> {
        Ok(ConfigRs::builder().add_source(ConfigRs::try_from(&Config::default())?))
    }

    fn from_builder(builder: Builder, path: Option<&Path>) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                SkiffError::config_with_source(
                    "Failed to load configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }

    /// Returns the options used to parse image references.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::config::Config;
    ///
    /// let config = Config::from_yaml_str("reference:\n  default_tag: stable\n").unwrap();
    /// assert_eq!(config.parse_options().default_tag.as_deref(), Some("stable"));
    /// ```
    pub fn parse_options(&self) -> ReferenceParseOptions {
        ReferenceParseOptions {
            default_tag: Some(self.reference.default_tag.clone()),
            registry: RegistryParseOptions {
                default: Some(self.registry.default.clone()),
                rewrites: self
                    .registry
                    .rewrites
                    .iter()
                    .map(|r| (r.from.clone(), r.to.clone()))
                    .collect(),
                insecure: self.registry.insecure,
            },
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new()
            .with_timeout(self.network.timeout)
            .with_max_idle_per_host(self.network.max_idle_per_host)
    }

    /// Returns the Docker credential reader this configuration points at.
    pub fn docker_authenticator(&self) -> DockerAuthenticator {
        match &self.auth.docker_config {
            Some(path) => DockerAuthenticator::with_path(path),
            None => DockerAuthenticator::new(),
        }
    }
}

/// Registry name resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    /// Registry used when a reference names none.
    #[serde(default = "default_registry")]
    pub default: String,

    /// Forces plain HTTP (`true`) or TLS (`false`) for every registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Registry name rewrites, applied over the built-in `docker.io` one.
    #[serde(default)]
    pub rewrites: Vec<Rewrite>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            default: default_registry(),
            insecure: None,
            rewrites: Vec::new(),
        }
    }
}

fn default_registry() -> String {
    DEFAULT_REGISTRY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rewrite {
    pub from: String,
    pub to: String,
}

/// Reference parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(default = "default_tag")]
    pub default_tag: String,
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            default_tag: default_tag(),
        }
    }
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_max_idle_per_host() -> usize {
    10
}

/// Credential settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Auth {
    /// Docker `config.json` to read instead of the default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<PathBuf>,
}
