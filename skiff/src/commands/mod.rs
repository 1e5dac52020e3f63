/// Blob download
pub mod blob;

/// Manifest copy between references
pub mod copy;

/// Manifest, config and digest lookups
pub mod manifest;

/// Reference parsing
pub mod parse;

/// Version command handlers
pub mod version;

use libskiff::PlatformSpec;

/// Parse an optional `--platform` argument
pub(crate) fn parse_platform(platform: Option<&str>) -> Result<Option<PlatformSpec>, String> {
    platform
        .map(|p| {
            p.parse::<PlatformSpec>()
                .map_err(|e| format!("Invalid platform '{}': {}", p, e))
        })
        .transpose()
}
