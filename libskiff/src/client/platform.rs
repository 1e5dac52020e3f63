//! Platform selection within image indexes.

use crate::error::{Result, SkiffError};
use crate::oci::Platform;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;

/// A requested platform, written `os/architecture[/variant]`.
///
/// Only the fields that are set take part in matching, so `linux/arm64`
/// matches every `linux/arm64` variant.
///
/// # Examples
///
/// ```
/// use libskiff::client::PlatformSpec;
///
/// let platform: PlatformSpec = "linux/arm64/v8".parse().unwrap();
/// assert_eq!(platform.to_string(), "linux/arm64/v8");
/// assert_eq!(PlatformSpec::default().to_string(), "linux/amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSpec {
    pub os: Option<String>,
    pub architecture: Option<String>,
    pub variant: Option<String>,
}

impl Default for PlatformSpec {
    fn default() -> Self {
        Self::new("linux", "amd64")
    }
}

impl PlatformSpec {
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: Some(os.into()),
            architecture: Some(architecture.into()),
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Returns whether `platform` agrees with every field set here.
    pub fn matches(&self, platform: &Platform) -> bool {
        let os = platform.os().to_string();
        let architecture = platform.architecture().to_string();

        field_matches(&self.os, Some(os.as_str()))
            && field_matches(&self.architecture, Some(architecture.as_str()))
            && field_matches(&self.variant, platform.variant().as_deref())
    }
}

fn field_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => actual == Some(wanted.as_str()),
        None => true,
    }
}

impl FromStr for PlatformSpec {
    type Err = SkiffError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        let (Some(os), Some(architecture)) = (parts.next(), parts.next()) else {
            return Err(SkiffError::parse("invalid platform", s));
        };
        let variant = parts.next();

        if os.is_empty() || architecture.is_empty() || parts.next().is_some() {
            return Err(SkiffError::parse("invalid platform", s));
        }

        Ok(Self {
            os: Some(os.to_string()),
            architecture: Some(architecture.to_string()),
            variant: variant.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [&self.os, &self.architecture, &self.variant];
        let parts: Vec<&str> = fields.into_iter().flatten().map(String::as_str).collect();
        f.write_str(&parts.join("/"))
    }
}
