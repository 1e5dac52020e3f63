//! Registry authentication on top of a [`Transport`].
//!
//! Each request first carries whatever credential the cache holds for its
//! registry and scopes. A `401` is answered once: the `WWW-Authenticate`
//! challenge decides whether to send Basic credentials or to exchange them
//! for a Bearer token at the challenge realm, and the request is replayed
//! with the new credential. A second `401` is handed back to the caller.

use crate::auth::{
    AuthenticationCache, AuthenticationChallenge, Authenticator, Clock, SystemClock,
};
use crate::error::{Result, SkiffError};
use crate::reference::{Registry, Resource};
use crate::transport::{Request, Response, Transport};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::{ParseError, Url};

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

/// Body returned by a token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<f64>,
}

impl TokenResponse {
    fn token(&self) -> Option<&str> {
        [&self.access_token, &self.token]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }

    /// Absent means no expiry. A lifetime that is not positive, or too
    /// large to represent, expires immediately.
    fn ttl(&self) -> Option<Duration> {
        self.expires_in
            .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
    }
}

/// A [`Transport`] wrapper that answers registry authentication challenges.
///
/// # Examples
///
/// ```no_run
/// use libskiff::auth::DockerAuthenticator;
/// use libskiff::reference::Reference;
/// use libskiff::transport::{AuthenticatingTransport, HttpTransport, Request};
/// use std::sync::Arc;
///
/// # async fn example() -> libskiff::error::Result<()> {
/// let transport = AuthenticatingTransport::new(
///     Arc::new(HttpTransport::new()?),
///     Arc::new(DockerAuthenticator::new()),
/// );
///
/// let reference: Reference = "alpine:3.20".parse()?;
/// let response = transport
///     .send(
///         Request::get(reference.manifest_url()),
///         &reference,
///         &[reference.scope("pull")],
///     )
///     .await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
pub struct AuthenticatingTransport {
    inner: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    cache: AuthenticationCache,
}

impl fmt::Debug for AuthenticatingTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatingTransport")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AuthenticatingTransport {
    /// Wraps `inner`, taking credentials from `authenticator`.
    pub fn new(inner: Arc<dyn Transport>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self::with_clock(inner, authenticator, Arc::new(SystemClock))
    }

    /// Like [`AuthenticatingTransport::new`], with token expiry measured by
    /// `clock`.
    pub fn with_clock(
        inner: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            authenticator,
            cache: AuthenticationCache::new(clock),
        }
    }

    /// Returns the credential cache.
    pub fn cache(&self) -> &AuthenticationCache {
        &self.cache
    }

    /// Sends `request` to the registry of `target`, authenticating for
    /// `scopes`.
    ///
    /// Any response other than a `401` is returned as is, whatever its
    /// status. A `401` that cannot be answered (no credentials for a Basic
    /// challenge, or the credential was already rejected) is returned too.
    ///
    /// # Errors
    ///
    /// Network errors from the inner transport, a malformed challenge
    /// ([`SkiffError::Parse`]) and a registry that breaks the challenge or
    /// token protocol ([`SkiffError::Protocol`]).
    pub async fn send<'a, S>(
        &self,
        request: Request,
        target: impl Into<Resource<'a>>,
        scopes: &[S],
    ) -> Result<Response>
    where
        S: AsRef<str> + Sync,
    {
        let registry = target.into().registry();
        let mut credential = self.cache.get(registry, scopes);
        let mut challenged = false;

        loop {
            let mut attempt = request.clone();
            if let Some(credential) = &credential {
                attempt.set_header(AUTHORIZATION, credential);
            }

            tracing::debug!(
                method = %attempt.method,
                url = %attempt.url,
                authenticated = credential.is_some(),
                "sending registry request"
            );
            let response = self.inner.send(attempt).await?;

            if response.status() != StatusCode::UNAUTHORIZED || challenged {
                return Ok(response);
            }
            challenged = true;

            match self
                .answer_challenge(response, registry, scopes, credential.is_some())
                .await?
            {
                Answer::Retry(fresh) => credential = Some(fresh),
                Answer::GiveUp(response) => return Ok(response),
            }
        }
    }

    async fn answer_challenge<S>(
        &self,
        response: Response,
        registry: &Registry,
        scopes: &[S],
        attached: bool,
    ) -> Result<Answer>
    where
        S: AsRef<str> + Sync,
    {
        let Some(header) = response.header(WWW_AUTHENTICATE) else {
            return Err(SkiffError::protocol(
                "missing WWW-Authenticate header",
                response,
            ));
        };
        let challenge = AuthenticationChallenge::parse(header)?;
        tracing::debug!(
            registry = %registry,
            scheme = challenge.scheme(),
            "received authentication challenge"
        );

        match challenge.scheme() {
            "basic" => {
                if attached {
                    return Ok(Answer::GiveUp(response));
                }
                let auth = self.authenticator.auth_for_registry(registry).await?;
                let Some(credential) = auth.credential() else {
                    return Ok(Answer::GiveUp(response));
                };
                self.cache.put(registry, credential.clone(), scopes, None);
                Ok(Answer::Retry(credential))
            }
            "bearer" => {
                let credential = self
                    .fetch_bearer_token(&challenge, response, registry, scopes)
                    .await?;
                Ok(Answer::Retry(credential))
            }
            scheme => {
                let message = format!("unknown challenge: {}", scheme);
                Err(SkiffError::protocol(message, response))
            }
        }
    }

    /// Exchanges the provider's credential for a token at the challenge realm.
    async fn fetch_bearer_token<S>(
        &self,
        challenge: &AuthenticationChallenge,
        response: Response,
        registry: &Registry,
        scopes: &[S],
    ) -> Result<String>
    where
        S: AsRef<str> + Sync,
    {
        let Some(realm) = challenge.realm() else {
            return Err(SkiffError::protocol(
                "bearer challenge is missing a realm",
                response,
            ));
        };
        let service = challenge.service().unwrap_or(registry.host());
        let scope = scopes
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let url = match token_url(realm, &scope, service) {
            Ok(url) => url,
            Err(e) => {
                let message = format!("invalid realm {:?}: {}", realm, e);
                return Err(SkiffError::protocol(message, response));
            }
        };

        let mut request = Request::get(url.as_str());
        let auth = self.authenticator.auth_for_registry(registry).await?;
        if let Some(credential) = auth.credential() {
            request.set_header(AUTHORIZATION, &credential);
        }

        tracing::debug!(
            url = %url,
            authenticated = request.headers.contains_key(AUTHORIZATION),
            "requesting bearer token"
        );
        let token_response = self.inner.send(request).await?;
        if token_response.status() != StatusCode::OK {
            let message = format!(
                "token endpoint {} returned {}",
                url,
                token_response.status()
            );
            return Err(SkiffError::protocol(message, token_response));
        }

        let body: TokenResponse = match token_response.json() {
            Ok(body) => body,
            Err(_) => {
                return Err(SkiffError::protocol(
                    "token endpoint returned invalid JSON",
                    token_response,
                ));
            }
        };
        let Some(token) = body.token() else {
            return Err(SkiffError::protocol(
                "token endpoint returned no token",
                token_response,
            ));
        };

        let credential = format!("Bearer {}", token);
        self.cache.put(registry, credential.clone(), scopes, body.ttl());
        Ok(credential)
    }
}

enum Answer {
    Retry(String),
    GiveUp(Response),
}

/// Sets the `scope` and `service` parameters on the realm URL, keeping any
/// other parameters it already has.
fn token_url(realm: &str, scope: &str, service: &str) -> std::result::Result<Url, ParseError> {
    let mut url = Url::parse(realm)?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "scope" && key != "service")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("scope", scope)
        .append_pair("service", service);

    Ok(url)
}
