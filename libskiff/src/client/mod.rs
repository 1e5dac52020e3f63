//! High-level registry client.
//!
//! [`Client`] resolves image references into manifests, configurations and
//! blobs on top of an [`AuthenticatingTransport`]. Every call authenticates
//! for exactly the scopes it needs: `pull` for reads, `push` for writes.

use crate::auth::{AnonymousAuthenticator, Authenticator, Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, SkiffError};
use crate::oci::{self, ImageConfiguration, ImageManifest, ManifestOrIndex};
use crate::reference::{Reference, ReferenceParseOptions, Repository};
use crate::transport::{
    AuthenticatingTransport, HttpTransport, Request, Response, Transport, TransportConfig,
};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use std::fmt;
use std::sync::Arc;

pub mod platform;


pub use platform::PlatformSpec;

/// Header carrying the digest of a manifest.
pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Indexes nested deeper than this are rejected.
const MAX_INDEX_DEPTH: usize = 8;

/// Something that names an image reference.
///
/// Strings are parsed with the client's parse options.
pub trait IntoReference {
    fn into_reference(self, opts: &ReferenceParseOptions) -> Result<Reference>;
}

impl IntoReference for Reference {
    fn into_reference(self, _opts: &ReferenceParseOptions) -> Result<Reference> {
        Ok(self)
    }
}

impl IntoReference for &Reference {
    fn into_reference(self, _opts: &ReferenceParseOptions) -> Result<Reference> {
        Ok(self.clone())
    }
}

impl IntoReference for &str {
    fn into_reference(self, opts: &ReferenceParseOptions) -> Result<Reference> {
        Reference::parse(self, opts)
    }
}

impl IntoReference for &String {
    fn into_reference(self, opts: &ReferenceParseOptions) -> Result<Reference> {
        Reference::parse(self, opts)
    }
}

/// Something that names a repository.
pub trait IntoRepository {
    fn into_repository(self, opts: &ReferenceParseOptions) -> Result<Repository>;
}

impl IntoRepository for Repository {
    fn into_repository(self, _opts: &ReferenceParseOptions) -> Result<Repository> {
        Ok(self)
    }
}

impl IntoRepository for &Repository {
    fn into_repository(self, _opts: &ReferenceParseOptions) -> Result<Repository> {
        Ok(self.clone())
    }
}

impl IntoRepository for &str {
    fn into_repository(self, opts: &ReferenceParseOptions) -> Result<Repository> {
        Repository::parse(self, &opts.registry)
    }
}

impl IntoRepository for &String {
    fn into_repository(self, opts: &ReferenceParseOptions) -> Result<Repository> {
        Repository::parse(self, &opts.registry)
    }
}

/// Options for building a [`Client`].
///
/// # Examples
///
/// ```
/// use libskiff::auth::DockerAuthenticator;
/// use libskiff::client::{Client, ClientOptions};
/// use libskiff::transport::TransportConfig;
/// use std::sync::Arc;
///
/// let options = ClientOptions::new()
///     .with_authenticator(Arc::new(DockerAuthenticator::new()))
///     .with_transport_config(TransportConfig::new().with_timeout(60));
/// let client = Client::new(options).unwrap();
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    pub authenticator: Arc<dyn Authenticator>,
    /// Transport to send requests with; an [`HttpTransport`] built from
    /// `transport_config` when unset.
    pub transport: Option<Arc<dyn Transport>>,
    pub transport_config: TransportConfig,
    /// Time source for credential expiry.
    pub clock: Arc<dyn Clock>,
    pub parse_options: ReferenceParseOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            authenticator: Arc::new(AnonymousAuthenticator),
            transport: None,
            transport_config: TransportConfig::default(),
            clock: Arc::new(SystemClock),
            parse_options: ReferenceParseOptions::default(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("transport_config", &self.transport_config)
            .field("clock", &self.clock)
            .field("parse_options", &self.parse_options)
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    /// Anonymous access over HTTP with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options described by a configuration: its parse options, network
    /// settings, and Docker credentials.
    pub fn from_config(config: &Config) -> Self {
        Self {
            authenticator: Arc::new(config.docker_authenticator()),
            transport_config: config.transport_config(),
            parse_options: config.parse_options(),
            ..Self::default()
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_parse_options(mut self, parse_options: ReferenceParseOptions) -> Self {
        self.parse_options = parse_options;
        self
    }
}

/// Client for OCI registry operations.
///
/// A client is cheap to share: wrap it in an `Arc` and use it from any
/// number of tasks. Credentials acquired by one call are reused by the next.
#[derive(Debug)]
pub struct Client {
    transport: AuthenticatingTransport,
    parse_options: ReferenceParseOptions,
}

impl Client {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Fails when the default HTTP transport cannot be built.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let inner: Arc<dyn Transport> = match options.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_config(options.transport_config)?),
        };

        Ok(Self {
            transport: AuthenticatingTransport::with_clock(
                inner,
                options.authenticator,
                options.clock,
            ),
            parse_options: options.parse_options,
        })
    }

    /// Creates a client configured by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ClientOptions::from_config(config))
    }

    /// Returns the options references are parsed with.
    pub fn parse_options(&self) -> &ReferenceParseOptions {
        &self.parse_options
    }

    /// Parses an image reference with this client's options.
    pub fn parse_reference(&self, name: &str) -> Result<Reference> {
        Reference::parse(name, &self.parse_options)
    }

    /// Returns the authenticating transport used for requests.
    pub fn transport(&self) -> &AuthenticatingTransport {
        &self.transport
    }

    /// Fetches the manifest or index a reference points at.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libskiff::client::{Client, ClientOptions};
    ///
    /// # async fn example() -> libskiff::error::Result<()> {
    /// let client = Client::new(ClientOptions::new())?;
    /// let resolved = client.get("alpine:3.20").await?;
    /// println!("index: {}", resolved.is_index());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, reference: impl IntoReference) -> Result<ManifestOrIndex> {
        let reference = reference.into_reference(&self.parse_options)?;
        let response = error_for_status(self.resolve(&reference, "pull").await?)?;

        ManifestOrIndex::from_bytes_with_content_type(
            response.bytes(),
            response.header(CONTENT_TYPE),
        )
    }

    /// Fetches the single-platform manifest of a reference.
    ///
    /// When the reference names an index, the first entry matching
    /// `platform` (default `linux/amd64`) is followed.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::Validation`] when no entry of an index matches.
    pub async fn get_manifest(
        &self,
        reference: impl IntoReference,
        platform: Option<&PlatformSpec>,
    ) -> Result<ImageManifest> {
        let mut reference = reference.into_reference(&self.parse_options)?;
        let default_platform = PlatformSpec::default();
        let platform = platform.unwrap_or(&default_platform);

        for _ in 0..MAX_INDEX_DEPTH {
            let index = match self.get(&reference).await? {
                ManifestOrIndex::Manifest(manifest) => return Ok(manifest),
                ManifestOrIndex::Index(index) => index,
            };

            let descriptor = index
                .manifests()
                .iter()
                .find(|d| d.platform().as_ref().is_some_and(|p| platform.matches(p)))
                .ok_or_else(|| {
                    SkiffError::validation(format!(
                        "No manifest in {} matched platform {}",
                        reference, platform
                    ))
                })?;

            tracing::debug!(
                reference = %reference,
                platform = %platform,
                digest = %descriptor.digest(),
                "selected manifest from index"
            );
            reference = reference.at_digest(descriptor.digest().to_string());
        }

        Err(SkiffError::validation(format!(
            "Indexes nested more than {} levels deep at {}",
            MAX_INDEX_DEPTH, reference
        )))
    }

    /// Fetches the image configuration of a reference.
    pub async fn get_config(
        &self,
        reference: impl IntoReference,
        platform: Option<&PlatformSpec>,
    ) -> Result<ImageConfiguration> {
        let reference = reference.into_reference(&self.parse_options)?;
        let manifest = self.get_manifest(&reference, platform).await?;

        let digest = manifest.config().digest().to_string();
        let response = error_for_status(self.get_blob(reference.repository(), &digest).await?)?;
        response.json()
    }

    /// Returns the digest of the manifest a reference points at.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::Protocol`] when the registry omits the
    /// `Docker-Content-Digest` header.
    pub async fn get_digest(&self, reference: impl IntoReference) -> Result<String> {
        let reference = reference.into_reference(&self.parse_options)?;
        let request = Request::head(reference.manifest_url())
            .with_header(ACCEPT, &oci::reference_accept_header());
        let response = error_for_status(
            self.transport
                .send(request, &reference, &[reference.scope("pull")])
                .await?,
        )?;

        match response.header(DOCKER_CONTENT_DIGEST) {
            Some(digest) => Ok(digest.to_string()),
            None => Err(SkiffError::protocol(
                format!("Failed to get digest for {}", reference),
                response,
            )),
        }
    }

    /// Fetches a blob.
    ///
    /// The response is returned whatever its status; redirects to storage
    /// backends have already been followed.
    pub async fn get_blob(
        &self,
        repository: impl IntoRepository,
        digest: &str,
    ) -> Result<Response> {
        let repository = repository.into_repository(&self.parse_options)?;
        self.transport
            .send(
                Request::get(repository.blob_url(digest)),
                &repository,
                &[repository.scope("pull")],
            )
            .await
    }

    /// Copies a manifest or index to another reference.
    ///
    /// Only the manifest document is copied: every blob it refers to must
    /// already exist in the destination repository.
    pub async fn copy(&self, src: impl IntoReference, dest: impl IntoReference) -> Result<()> {
        let src = src.into_reference(&self.parse_options)?;
        let dest = dest.into_reference(&self.parse_options)?;

        let source = error_for_status(self.resolve(&src, "pull,push").await?)?;
        if source.status() != StatusCode::OK {
            return Err(SkiffError::protocol(format!("Failed to get {}", src), source));
        }

        let mut request = Request::put(dest.manifest_url()).with_body(source.bytes().to_vec());
        if let Some(content_type) = source.header(CONTENT_TYPE) {
            request.set_header(CONTENT_TYPE, content_type);
        }

        tracing::debug!(src = %src, dest = %dest, "copying manifest");
        let response = error_for_status(
            self.transport
                .send(request, &dest, &[dest.scope("push")])
                .await?,
        )?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            _ => Err(SkiffError::protocol(
                format!("Failed to copy {} to {}", src, dest),
                response,
            )),
        }
    }

    async fn resolve(&self, reference: &Reference, action: &str) -> Result<Response> {
        let request = Request::get(reference.manifest_url())
            .with_header(ACCEPT, &oci::reference_accept_header());
        self.transport
            .send(request, reference, &[reference.scope(action)])
            .await
    }
}

/// Turns a non-success response into the matching error.
///
/// # Examples
///
/// ```
/// use libskiff::client::error_for_status;
/// use libskiff::error::SkiffError;
/// use libskiff::transport::Response;
/// use reqwest::StatusCode;
/// use reqwest::header::HeaderMap;
///
/// let response = Response::new(
///     StatusCode::NOT_FOUND,
///     "https://ghcr.io/v2/x",
///     HeaderMap::new(),
///     vec![],
/// );
/// assert!(matches!(error_for_status(response), Err(SkiffError::NotFound { .. })));
/// ```
pub fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text();

    match status {
        StatusCode::UNAUTHORIZED => Err(SkiffError::authentication(
            format!("Authentication required for {}: {}", url, body),
            Some(401),
        )),
        StatusCode::FORBIDDEN => Err(SkiffError::authentication(
            format!("Access forbidden for {}: {}", url, body),
            Some(403),
        )),
        StatusCode::NOT_FOUND => Err(SkiffError::not_found("resource".to_string(), url)),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .header(RETRY_AFTER)
                .and_then(|v| v.trim().parse::<u64>().ok());
            Err(SkiffError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            ))
        }
        status if status.is_server_error() => Err(SkiffError::server(
            format!("Server error from {}: {}", url, body),
            status.as_u16(),
        )),
        _ => Err(SkiffError::network(format!(
            "HTTP {} from {}: {}",
            status.as_u16(),
            url,
            body
        ))),
    }
}
