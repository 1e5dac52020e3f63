//! Error types for Skiff
//!
//! This module provides error handling for all Skiff operations. Every error
//! implements the standard Error trait; protocol errors additionally carry the
//! HTTP response that triggered them so callers can inspect it.

use crate::transport::Response;
use thiserror::Error;


/// Main error type for Skiff operations
#[derive(Error, Debug)]
pub enum SkiffError {
    /// Malformed caller input (image reference, challenge header)
    #[error("Parse error: {message} (input: {input:?})")]
    Parse { message: String, input: String },

    /// The registry violated the authentication protocol
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        response: Box<Response>,
    },

    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, credential provider failures)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (404)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (invalid manifest JSON, unmatched platform, etc.)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for Skiff operations
pub type Result<T> = std::result::Result<T, SkiffError>;

impl SkiffError {
    /// Creates a new parse error for the given input.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::error::SkiffError;
    ///
    /// let err = SkiffError::parse("empty tag", "ubuntu:");
    /// assert!(matches!(err, SkiffError::Parse { .. }));
    /// ```
    pub fn parse<M: Into<String>, I: Into<String>>(message: M, input: I) -> Self {
        Self::Parse {
            message: message.into(),
            input: input.into(),
        }
    }

    /// Creates a new protocol error with the offending response attached.
    pub fn protocol<S: Into<String>>(message: S, response: Response) -> Self {
        Self::Protocol {
            message: message.into(),
            response: Box::new(response),
        }
    }

    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::error::SkiffError;
    ///
    /// let err = SkiffError::network("connection refused");
    /// assert!(matches!(err, SkiffError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::error::SkiffError;
    ///
    /// let err = SkiffError::authentication("invalid credentials", Some(401));
    /// assert!(matches!(err, SkiffError::Authentication { .. }));
    /// ```
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::error::SkiffError;
    ///
    /// let err = SkiffError::validation("invalid manifest format");
    /// assert!(matches!(err, SkiffError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the HTTP response attached to a protocol error.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Protocol { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for SkiffError {
    fn from(err: config::ConfigError) -> Self {
        SkiffError::config_with_source("Configuration error", None, err)
    }
}
