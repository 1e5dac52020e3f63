//! `WWW-Authenticate` challenge parsing.
//!
//! Registries answer unauthenticated requests with a challenge such as
//!
//! ```text
//! Bearer realm="https://auth.example.com/token",service="registry.example.com"
//! ```
//!
//! The grammar accepted is `<scheme> <key>=<value>(,<key>=<value>)*` where
//! values are bare words or double-quoted strings with backslash escapes.
//! Anything else is rejected as a whole.

use crate::error::{Result, SkiffError};
use std::collections::HashMap;

#[cfg(test)]
#[path = "challenge_tests.rs"]
mod tests;

/// A parsed `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationChallenge {
    scheme: String,
    params: HashMap<String, String>,
}

impl AuthenticationChallenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// The scheme is normalized to lowercase; parameter names are kept as
    /// sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use libskiff::auth::AuthenticationChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthenticationChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme(), "bearer");
    /// assert_eq!(challenge.realm(), Some("https://auth.example.com/token"));
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let invalid = || SkiffError::parse("invalid WWW-Authenticate header", header);

        let mut cursor = Cursor::new(header);
        let scheme = cursor.word().ok_or_else(invalid)?.to_ascii_lowercase();
        cursor.skip_whitespace();

        let mut params = HashMap::new();
        while !cursor.is_empty() {
            let key = cursor.word().ok_or_else(invalid)?;
            if !cursor.eat('=') {
                return Err(invalid());
            }

            let value = if cursor.peek() == Some('"') {
                cursor.quoted().ok_or_else(invalid)?
            } else {
                cursor.word().ok_or_else(invalid)?.to_string()
            };

            cursor.eat(',');
            cursor.skip_whitespace();
            params.insert(key.to_string(), value);
        }

        Ok(Self { scheme, params })
    }

    /// Returns the lowercase challenge scheme, e.g. `basic` or `bearer`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns a challenge parameter by name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns all challenge parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns the `realm` parameter.
    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }

    /// Returns the `service` parameter.
    pub fn service(&self) -> Option<&str> {
        self.param("service")
    }
}

/// Forward-only view over the unparsed remainder of a header.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Consumes one or more ASCII word characters.
    fn word(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }

        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Consumes a double-quoted string and returns it unescaped.
    fn quoted(&mut self) -> Option<String> {
        let mut chars = self.rest.char_indices().skip(1);
        let end = loop {
            match chars.next()? {
                (_, '\\') => {
                    chars.next()?;
                }
                (i, '"') => break i + 1,
                _ => {}
            }
        };

        let (literal, rest) = self.rest.split_at(end);
        let value = serde_json::from_str::<String>(literal).ok()?;
        self.rest = rest;
        Some(value)
    }
}
