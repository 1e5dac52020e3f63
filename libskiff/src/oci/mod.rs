//! OCI specification data structures.
//!
//! This module re-exports the image types from the `oci-spec` crate together
//! with the media types a registry can answer a manifest request with.

pub use oci_spec::image::{Descriptor, ImageConfiguration, ImageIndex, ImageManifest, Platform};

use crate::error::{Result, SkiffError};


pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_MANIFEST_LIST_V2: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";

/// Media types of multi-platform indexes.
pub const INDEX_MEDIA_TYPES: [&str; 2] = [OCI_INDEX_V1, DOCKER_MANIFEST_LIST_V2];

/// Media types of single-platform manifests.
pub const MANIFEST_MEDIA_TYPES: [&str; 2] = [OCI_MANIFEST_V1, DOCKER_MANIFEST_V2];

/// Media types accepted when resolving a reference, indexes first.
pub const REFERENCE_MEDIA_TYPES: [&str; 4] = [
    OCI_INDEX_V1,
    DOCKER_MANIFEST_LIST_V2,
    OCI_MANIFEST_V1,
    DOCKER_MANIFEST_V2,
];

/// Returns the `Accept` header value for manifest requests.
///
/// ```
/// use libskiff::oci::reference_accept_header;
///
/// assert!(reference_accept_header().starts_with("application/vnd.oci.image.index.v1+json,"));
/// ```
pub fn reference_accept_header() -> String {
    REFERENCE_MEDIA_TYPES.join(",")
}

/// Either a single-platform image manifest or a multi-platform image index.
///
/// # Examples
///
/// ```no_run
/// use libskiff::oci::ManifestOrIndex;
///
/// # fn example(manifest_or_index: ManifestOrIndex) {
/// match manifest_or_index {
///     ManifestOrIndex::Manifest(manifest) => {
///         println!("Single-platform image with {} layers", manifest.layers().len());
///     }
///     ManifestOrIndex::Index(index) => {
///         for manifest in index.manifests() {
///             if let Some(platform) = manifest.platform() {
///                 println!("  - {}/{}", platform.os(), platform.architecture());
///             }
///         }
///     }
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum ManifestOrIndex {
    Manifest(ImageManifest),
    Index(ImageIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Manifest,
    Index,
}

fn kind_of_media_type(media_type: &str) -> Option<Kind> {
    // Content-Type may carry parameters such as a charset.
    let media_type = media_type.split(';').next().unwrap_or_default().trim();
    if INDEX_MEDIA_TYPES.contains(&media_type) {
        Some(Kind::Index)
    } else if MANIFEST_MEDIA_TYPES.contains(&media_type) {
        Some(Kind::Manifest)
    } else {
        None
    }
}

impl ManifestOrIndex {
    /// Parses manifest bytes, telling manifests and indexes apart by their
    /// `mediaType` field or, failing that, by their structure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_content_type(bytes, None)
    }

    /// Like [`ManifestOrIndex::from_bytes`], using the response
    /// `Content-Type` when the document does not name its media type.
    pub fn from_bytes_with_content_type(
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| SkiffError::validation_with_source("Failed to parse manifest JSON", e))?;

        let declared = value
            .get("mediaType")
            .and_then(|v| v.as_str())
            .and_then(kind_of_media_type)
            .or_else(|| content_type.and_then(kind_of_media_type));

        let kind = match declared {
            Some(kind) => kind,
            None if value.get("manifests").is_some() => Kind::Index,
            None if value.get("layers").is_some() || value.get("config").is_some() => {
                Kind::Manifest
            }
            None => {
                return Err(SkiffError::validation(
                    "Unable to determine if content is a manifest or index",
                ));
            }
        };

        match kind {
            Kind::Index => serde_json::from_value(value)
                .map(ManifestOrIndex::Index)
                .map_err(|e| SkiffError::validation_with_source("Failed to parse image index", e)),
            Kind::Manifest => serde_json::from_value(value)
                .map(ManifestOrIndex::Manifest)
                .map_err(|e| {
                    SkiffError::validation_with_source("Failed to parse image manifest", e)
                }),
        }
    }

    pub fn is_manifest(&self) -> bool {
        matches!(self, ManifestOrIndex::Manifest(_))
    }

    pub fn is_index(&self) -> bool {
        matches!(self, ManifestOrIndex::Index(_))
    }

    pub fn as_manifest(&self) -> Option<&ImageManifest> {
        match self {
            ManifestOrIndex::Manifest(m) => Some(m),
            ManifestOrIndex::Index(_) => None,
        }
    }

    /// Returns the platforms listed by an index, with their descriptors.
    ///
    /// A single-platform manifest lists none.
    pub fn platforms(&self) -> Vec<(&Platform, &Descriptor)> {
        match self {
            ManifestOrIndex::Manifest(_) => vec![],
            ManifestOrIndex::Index(index) => index
                .manifests()
                .iter()
                .filter_map(|desc| desc.platform().as_ref().map(|platform| (platform, desc)))
                .collect(),
        }
    }
}

impl serde::Serialize for ManifestOrIndex {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ManifestOrIndex::Manifest(manifest) => serde::Serialize::serialize(manifest, serializer),
            ManifestOrIndex::Index(index) => serde::Serialize::serialize(index, serializer),
        }
    }
}
