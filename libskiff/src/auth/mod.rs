//! Authentication handling for OCI registries.
//!
//! This module provides the pieces of the registry authentication flow:
//!
//! - [`Authenticator`] supplies raw credential material for a registry
//!   ([`AnonymousAuthenticator`], [`StaticAuthenticator`],
//!   [`DockerAuthenticator`]).
//! - [`AuthenticationChallenge`] parses `WWW-Authenticate` headers.
//! - [`AuthenticationCache`] keeps acquired credentials per registry and scope.
//!
//! The flow itself (attach, challenge, acquire, retry) lives in
//! [`crate::transport::AuthenticatingTransport`].

use crate::error::Result;
use crate::reference::Registry;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod cache;
pub mod challenge;
pub mod docker;


pub use cache::{AuthenticationCache, Clock, ManualClock, SystemClock, normalize_scopes};
pub use challenge::AuthenticationChallenge;
pub use docker::DockerAuthenticator;

/// Credential material for one registry, as stored by `docker login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAuthentication {
    /// Base64 encoded `username:password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identitytoken: Option<String>,

    /// A bearer token to send directly to the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrytoken: Option<String>,
}

impl RegistryAuthentication {
    /// Creates username/password credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::auth::RegistryAuthentication;
    ///
    /// let auth = RegistryAuthentication::basic("user", "pass");
    /// assert_eq!(auth.credential().as_deref(), Some("Basic dXNlcjpwYXNz"));
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    /// Returns the `Authorization` header value for these credentials.
    ///
    /// A registry token wins over a pre-encoded `auth` field, which wins over
    /// a username and password pair. Empty fields are ignored.
    pub fn credential(&self) -> Option<String> {
        if let Some(token) = non_empty(&self.registrytoken) {
            return Some(format!("Bearer {}", token));
        }

        if let Some(auth) = non_empty(&self.auth) {
            return Some(format!("Basic {}", auth));
        }

        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(username), Some(password)) => {
                let encoded = general_purpose::STANDARD.encode(format!("{}:{}", username, password));
                Some(format!("Basic {}", encoded))
            }
            _ => None,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Supplies credentials for registries.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the credentials to use with `registry`.
    ///
    /// Registries without credentials yield an empty
    /// [`RegistryAuthentication`]; errors abort the request being
    /// authenticated.
    async fn auth_for_registry(&self, registry: &Registry) -> Result<RegistryAuthentication>;
}

/// Never provides any credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn auth_for_registry(&self, _registry: &Registry) -> Result<RegistryAuthentication> {
        Ok(RegistryAuthentication::default())
    }
}

/// Provides fixed credentials, keyed by registry host.
///
/// # Examples
///
/// ```
/// use libskiff::auth::{RegistryAuthentication, StaticAuthenticator};
///
/// let auth = StaticAuthenticator::new()
///     .with_registry("ghcr.io", RegistryAuthentication::basic("user", "token"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    registries: HashMap<String, RegistryAuthentication>,
    fallback: Option<RegistryAuthentication>,
}

impl StaticAuthenticator {
    /// Creates an authenticator with no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds credentials for one registry host.
    pub fn with_registry(mut self, host: impl Into<String>, auth: RegistryAuthentication) -> Self {
        self.registries.insert(host.into(), auth);
        self
    }

    /// Sets credentials used for every host without its own entry.
    pub fn with_fallback(mut self, auth: RegistryAuthentication) -> Self {
        self.fallback = Some(auth);
        self
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn auth_for_registry(&self, registry: &Registry) -> Result<RegistryAuthentication> {
        Ok(self
            .registries
            .get(registry.host())
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_default())
    }
}
