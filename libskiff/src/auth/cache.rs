//! Scoped credential cache.
//!
//! Credentials acquired from a registry are stored per registry host together
//! with the set of scopes they were issued for, and optionally an expiry.
//! Lookups return the newest unexpired credential whose scopes cover the
//! request; expired entries are purged lazily on every access.
//!
//! Each host has its own lock, so requests against unrelated registries never
//! contend with each other.

use crate::reference::Registry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;

/// Source of the current time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use libskiff::auth::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(1_000);
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(clock.now_millis(), 3_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// One cached credential.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthenticationToken {
    /// Ready-to-use `Authorization` header value.
    credential: String,
    scopes: HashSet<String>,
    /// Expiry in epoch milliseconds; `None` never expires.
    expires: Option<u64>,
}

impl AuthenticationToken {
    fn is_expired(&self, now: u64) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// Newest first.
type TokenList = Arc<Mutex<Vec<AuthenticationToken>>>;

/// Credentials keyed by registry host and scope set.
pub struct AuthenticationCache {
    registries: RwLock<HashMap<String, TokenList>>,
    clock: Arc<dyn Clock>,
}

impl AuthenticationCache {
    /// Creates an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the newest unexpired credential for `registry` that covers
    /// every scope in `scopes`.
    pub fn get<S: AsRef<str>>(&self, registry: &Registry, scopes: &[S]) -> Option<String> {
        let tokens = self.tokens_for(registry.host())?;
        let scopes = normalize_scopes(scopes);

        let mut tokens = tokens.lock().unwrap_or_else(PoisonError::into_inner);
        purge_expired(&mut tokens, self.clock.now_millis());

        tokens
            .iter()
            .find(|token| token.covers(&scopes))
            .map(|token| token.credential.clone())
    }

    /// Stores `credential` for `registry` and `scopes`.
    ///
    /// With a `ttl` the credential expires that long from now; without one it
    /// lives as long as the cache.
    pub fn put<S: AsRef<str>>(
        &self,
        registry: &Registry,
        credential: impl Into<String>,
        scopes: &[S],
        ttl: Option<Duration>,
    ) {
        let now = self.clock.now_millis();
        let token = AuthenticationToken {
            credential: credential.into(),
            scopes: normalize_scopes(scopes).into_iter().collect(),
            expires: ttl.map(|ttl| now.saturating_add(ttl.as_millis() as u64)),
        };

        let tokens = self.tokens_for_insert(registry.host());
        let mut tokens = tokens.lock().unwrap_or_else(PoisonError::into_inner);
        purge_expired(&mut tokens, now);
        tokens.insert(0, token);
    }

    /// Returns the number of unexpired credentials held for `registry`.
    pub fn len(&self, registry: &Registry) -> usize {
        let Some(tokens) = self.tokens_for(registry.host()) else {
            return 0;
        };

        let mut tokens = tokens.lock().unwrap_or_else(PoisonError::into_inner);
        purge_expired(&mut tokens, self.clock.now_millis());
        tokens.len()
    }

    fn tokens_for(&self, host: &str) -> Option<TokenList> {
        self.registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
    }

    fn tokens_for_insert(&self, host: &str) -> TokenList {
        if let Some(tokens) = self.tokens_for(host) {
            return tokens;
        }

        self.registries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(host.to_string())
            .or_default()
            .clone()
    }
}

impl Default for AuthenticationCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for AuthenticationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hosts: Vec<String> = self
            .registries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();

        f.debug_struct("AuthenticationCache")
            .field("hosts", &hosts)
            .field("clock", &self.clock)
            .finish()
    }
}

fn purge_expired(tokens: &mut Vec<AuthenticationToken>, now: u64) {
    let before = tokens.len();
    tokens.retain(|token| !token.is_expired(now));

    let purged = before - tokens.len();
    if purged > 0 {
        tracing::trace!(purged, "purged expired registry credentials");
    }
}

/// Expands compact scopes into one scope per action.
///
/// `repository:foo:pull,push` becomes `repository:foo:pull` and
/// `repository:foo:push`; scopes without a `:` are kept as they are.
///
/// # Examples
///
/// ```
/// use libskiff::auth::normalize_scopes;
///
/// let scopes = normalize_scopes(&["repository:foo:pull,push"]);
/// assert_eq!(scopes, vec!["repository:foo:pull", "repository:foo:push"]);
/// ```
pub fn normalize_scopes<S: AsRef<str>>(scopes: &[S]) -> Vec<String> {
    scopes
        .iter()
        .flat_map(|scope| {
            let scope = scope.as_ref();
            match scope.rsplit_once(':') {
                Some((prefix, actions)) => actions
                    .split(',')
                    .map(|action| format!("{}:{}", prefix, action))
                    .collect::<Vec<_>>(),
                None => vec![scope.to_string()],
            }
        })
        .collect()
}
