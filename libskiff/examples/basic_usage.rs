//! Basic usage example for the Skiff library.
//!
//! Resolves an image on Docker Hub, picks the manifest for a platform and
//! prints a short summary. Credentials are read from `~/.docker/config.json`
//! when present.
//!
//! Run with: cargo run --example basic_usage -- alpine:3.20 linux/arm64

use libskiff::auth::DockerAuthenticator;
use libskiff::{Client, ClientOptions, ManifestOrIndex, PlatformSpec};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let image = args.next().unwrap_or_else(|| "alpine:latest".to_string());
    let platform: PlatformSpec = match args.next() {
        Some(p) => p.parse()?,
        None => PlatformSpec::default(),
    };

    let client = Client::new(
        ClientOptions::new().with_authenticator(Arc::new(DockerAuthenticator::new())),
    )?;

    let reference = client.parse_reference(&image)?;
    println!("Reference: {}", reference);
    println!("Manifest URL: {}\n", reference.manifest_url());

    match client.get(&reference).await? {
        ManifestOrIndex::Index(index) => {
            println!("Multi-platform index with {} entries:", index.manifests().len());
            for descriptor in index.manifests() {
                if let Some(p) = descriptor.platform() {
                    println!("  - {}/{}", p.os(), p.architecture());
                }
            }
            println!();
        }
        ManifestOrIndex::Manifest(_) => println!("Single-platform image\n"),
    }

    let digest = client.get_digest(&reference).await?;
    println!("Digest: {}", digest);

    let manifest = client.get_manifest(&reference, Some(&platform)).await?;
    println!("Manifest for {}: {} layers", platform, manifest.layers().len());

    let config = client.get_config(&reference, Some(&platform)).await?;
    println!("Created: {}", config.created().as_deref().unwrap_or("unknown"));

    Ok(())
}
