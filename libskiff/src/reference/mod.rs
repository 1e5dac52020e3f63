//! Image reference parsing and manipulation.
//!
//! A reference such as `ghcr.io/user/repo:latest` is resolved into three
//! layered values: the [`Registry`] that hosts it, the [`Repository`] inside
//! that registry, and the [`Reference`] that pins a single manifest by tag or
//! digest. Parsing never performs I/O.
//!
//! Names without an explicit registry resolve to Docker Hub, and the bare
//! `docker.io` name is rewritten to its canonical index host:
//!
//! ```
//! use libskiff::reference::Reference;
//!
//! let reference: Reference = "ubuntu".parse().unwrap();
//! assert_eq!(reference.to_string(), "index.docker.io/ubuntu:latest");
//! assert_eq!(reference.repository().qualified_name(), "library/ubuntu");
//! ```

use crate::error::{Result, SkiffError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub mod network;


pub use network::is_local_registry;

/// Registry used when a reference does not name one.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Canonical host of the default registry.
pub const DEFAULT_REGISTRY_HOST: &str = "index.docker.io";

/// Tag used when a reference has neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

const TAG_SEPARATOR: char = ':';
const DIGEST_SEPARATOR: char = '@';

/// Options controlling how registry names are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryParseOptions {
    /// Registry name used when none is given (defaults to `docker.io`).
    pub default: Option<String>,
    /// Extra name rewrites, merged over the built-in `docker.io` rewrite.
    pub rewrites: HashMap<String, String>,
    /// Forces plaintext (`true`) or TLS (`false`) regardless of the host.
    pub insecure: Option<bool>,
}

/// Options controlling how image references are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceParseOptions {
    /// Tag used when the reference names neither tag nor digest.
    pub default_tag: Option<String>,
    /// Options for the registry part of the reference.
    pub registry: RegistryParseOptions,
}

/// A container registry endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registry {
    host: String,
    insecure: bool,
}

impl Registry {
    /// Creates a registry from an already resolved host.
    pub fn new(host: impl Into<String>, insecure: bool) -> Self {
        Self {
            host: host.into(),
            insecure,
        }
    }

    /// Resolves a registry name.
    ///
    /// An empty name selects the default registry; the name is then passed
    /// through the rewrite table. Unless `opts.insecure` says otherwise,
    /// loopback and private-network hosts are addressed over plain HTTP.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::reference::{Registry, RegistryParseOptions};
    ///
    /// let opts = RegistryParseOptions::default();
    /// assert_eq!(Registry::parse("docker.io", &opts).host(), "index.docker.io");
    /// assert!(Registry::parse("127.0.0.1:5000", &opts).insecure());
    /// assert!(!Registry::parse("gcr.io", &opts).insecure());
    /// ```
    pub fn parse(name: &str, opts: &RegistryParseOptions) -> Self {
        let name = if name.is_empty() {
            opts.default.as_deref().unwrap_or(DEFAULT_REGISTRY)
        } else {
            name
        };

        let host = match opts.rewrites.get(name) {
            Some(rewritten) => rewritten.as_str(),
            None if name == DEFAULT_REGISTRY => DEFAULT_REGISTRY_HOST,
            None => name,
        };

        let insecure = opts.insecure.unwrap_or_else(|| is_local_registry(host));
        Self::new(host, insecure)
    }

    /// Returns the registry host, possibly including a port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns whether the registry is addressed over plain HTTP.
    pub fn insecure(&self) -> bool {
        self.insecure
    }

    /// Returns the URL scheme used to reach the registry.
    pub fn scheme(&self) -> &'static str {
        if self.insecure { "http" } else { "https" }
    }

    /// Returns the base URL of the registry API, e.g. `https://gcr.io/v2`.
    pub fn url(&self) -> String {
        format!("{}://{}/v2", self.scheme(), self.host)
    }
}

impl FromStr for Registry {
    type Err = SkiffError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s, &RegistryParseOptions::default()))
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// A named collection of manifests within one registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    registry: Registry,
    name: String,
}

impl Repository {
    /// Creates a repository from its parts.
    pub fn new(registry: Registry, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
        }
    }

    /// Resolves a repository name, optionally prefixed by a registry host.
    ///
    /// The first path segment names the registry only when it contains a
    /// `.`; otherwise the whole string is a path on the default registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::reference::{Repository, RegistryParseOptions};
    ///
    /// let repo = Repository::parse("gcr.io/google/wave", &RegistryParseOptions::default()).unwrap();
    /// assert_eq!(repo.url(), "https://gcr.io/v2/google/wave");
    /// ```
    pub fn parse(name: &str, opts: &RegistryParseOptions) -> Result<Self> {
        let (registry_name, repository_name) = match name.split_once('/') {
            Some((first, rest)) if first.contains('.') => (first, rest),
            _ => ("", name),
        };

        if repository_name.is_empty() {
            return Err(SkiffError::parse("repository name is empty", name));
        }

        Ok(Self::new(
            Registry::parse(registry_name, opts),
            repository_name,
        ))
    }

    /// Returns the registry hosting this repository.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the repository path as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the repository path as the registry API expects it.
    ///
    /// Single-segment names on the default registry live under `library/`.
    pub fn qualified_name(&self) -> String {
        if self.registry.host == DEFAULT_REGISTRY_HOST && !self.name.contains('/') {
            format!("library/{}", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Returns the base API URL of this repository.
    pub fn url(&self) -> String {
        format!("{}/{}", self.registry.url(), self.qualified_name())
    }

    /// Returns the API URL of a blob in this repository.
    pub fn blob_url(&self, digest: &str) -> String {
        format!("{}/blobs/{}", self.url(), digest)
    }

    /// Returns the authorization scope for `action` on this repository.
    ///
    /// ```
    /// use libskiff::reference::Repository;
    ///
    /// let repo: Repository = "ubuntu".parse().unwrap();
    /// assert_eq!(repo.scope("pull"), "repository:library/ubuntu:pull");
    /// ```
    pub fn scope(&self, action: &str) -> String {
        format!("repository:{}:{}", self.qualified_name(), action)
    }
}

impl FromStr for Repository {
    type Err = SkiffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, &RegistryParseOptions::default())
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.name)
    }
}

/// Identifies one manifest within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// A mutable tag such as `latest`.
    Tag(String),
    /// A content digest such as `sha256:...`.
    Digest(String),
}

impl Identifier {
    /// Returns the tag or digest string.
    pub fn value(&self) -> &str {
        match self {
            Self::Tag(value) | Self::Digest(value) => value,
        }
    }

    /// Returns whether this identifier is a digest.
    pub fn is_digest(&self) -> bool {
        matches!(self, Self::Digest(_))
    }

    fn separator(&self) -> char {
        match self {
            Self::Tag(_) => TAG_SEPARATOR,
            Self::Digest(_) => DIGEST_SEPARATOR,
        }
    }
}

/// A fully qualified pointer to one image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    repository: Repository,
    identifier: Identifier,
}

impl Reference {
    /// Creates a reference from its parts.
    pub fn new(repository: Repository, identifier: Identifier) -> Self {
        Self {
            repository,
            identifier,
        }
    }

    /// Parses an image reference.
    ///
    /// A trailing `@<algorithm>:<hex>` selects a digest. Otherwise the text
    /// after the last `:` is a tag, unless it contains a `/` (then the colon
    /// belonged to a `host:port`) in which case the default tag is used.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::reference::{Identifier, Reference, ReferenceParseOptions};
    ///
    /// let opts = ReferenceParseOptions::default();
    /// let reference = Reference::parse("localhost.localdomain:5000/app", &opts).unwrap();
    /// assert_eq!(reference.identifier(), &Identifier::Tag("latest".to_string()));
    /// assert_eq!(reference.registry().host(), "localhost.localdomain:5000");
    /// ```
    pub fn parse(name: &str, opts: &ReferenceParseOptions) -> Result<Self> {
        if name.is_empty() {
            return Err(SkiffError::parse("image reference is empty", name));
        }

        let (base, identifier) = match split_digest(name) {
            Some((base, digest)) => (base, Identifier::Digest(digest.to_string())),
            None => match name.rsplit_once(TAG_SEPARATOR) {
                Some((base, tag)) if !tag.contains('/') => {
                    if tag.is_empty() {
                        return Err(SkiffError::parse("image tag is empty", name));
                    }
                    (base, Identifier::Tag(tag.to_string()))
                }
                _ => {
                    let tag = opts.default_tag.as_deref().unwrap_or(DEFAULT_TAG);
                    (name, Identifier::Tag(tag.to_string()))
                }
            },
        };

        let repository = Repository::parse(base, &opts.registry)?;
        Ok(Self::new(repository, identifier))
    }

    /// Returns the repository holding the manifest.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Returns the registry hosting the manifest.
    pub fn registry(&self) -> &Registry {
        self.repository.registry()
    }

    /// Returns the tag or digest of the manifest.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the tag, if this reference is by tag.
    pub fn tag(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Tag(tag) => Some(tag),
            Identifier::Digest(_) => None,
        }
    }

    /// Returns the digest, if this reference is by digest.
    pub fn digest(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Digest(digest) => Some(digest),
            Identifier::Tag(_) => None,
        }
    }

    /// Returns the API URL of the manifest.
    pub fn manifest_url(&self) -> String {
        format!(
            "{}/manifests/{}",
            self.repository.url(),
            self.identifier.value()
        )
    }

    /// Returns the authorization scope for `action` on the repository.
    pub fn scope(&self, action: &str) -> String {
        self.repository.scope(action)
    }

    /// Returns a reference to `digest` in the same repository.
    pub fn at_digest(&self, digest: impl Into<String>) -> Self {
        Self::new(self.repository.clone(), Identifier::Digest(digest.into()))
    }
}

impl FromStr for Reference {
    type Err = SkiffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, &ReferenceParseOptions::default())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.repository,
            self.identifier.separator(),
            self.identifier.value()
        )
    }
}

/// Something that registry credentials can be scoped to.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Registry(&'a Registry),
    Repository(&'a Repository),
    Reference(&'a Reference),
}

impl<'a> Resource<'a> {
    /// Returns the registry that authenticates requests for this resource.
    pub fn registry(&self) -> &'a Registry {
        match self {
            Self::Registry(registry) => registry,
            Self::Repository(repository) => repository.registry(),
            Self::Reference(reference) => reference.registry(),
        }
    }
}

impl<'a> From<&'a Registry> for Resource<'a> {
    fn from(registry: &'a Registry) -> Self {
        Self::Registry(registry)
    }
}

impl<'a> From<&'a Repository> for Resource<'a> {
    fn from(repository: &'a Repository) -> Self {
        Self::Repository(repository)
    }
}

impl<'a> From<&'a Reference> for Resource<'a> {
    fn from(reference: &'a Reference) -> Self {
        Self::Reference(reference)
    }
}

/// Splits `name` into base and digest when it ends in `@<algorithm>:<hex>`.
fn split_digest(name: &str) -> Option<(&str, &str)> {
    let (base, digest) = name.rsplit_once(DIGEST_SEPARATOR)?;
    let (algorithm, hex) = digest.split_once(':')?;

    let algorithm_ok = !algorithm.is_empty()
        && algorithm
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    let hex_ok = !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());

    (algorithm_ok && hex_ok).then_some((base, digest))
}
