use super::parse_platform;
use crate::context::AppContext;
use crate::format::{self, Formattable, format_size};
use libskiff::oci::{ImageConfiguration, ImageManifest};
use serde::Serialize;

/// An image manifest, printed as a layer summary in pretty mode
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ManifestOutput(pub ImageManifest);

impl Formattable for ManifestOutput {
    fn format_pretty(&self) -> String {
        let manifest = &self.0;
        let mut output = String::new();

        if let Some(media_type) = manifest.media_type() {
            output.push_str(&format!("Media Type: {}\n", media_type));
        }
        let config = manifest.config();
        output.push_str(&format!(
            "Config:     {} ({})\n",
            config.digest(),
            format_size(config.size())
        ));

        let total: u64 = manifest.layers().iter().map(|layer| layer.size()).sum();
        output.push_str(&format!(
            "Layers:     {} ({})\n",
            manifest.layers().len(),
            format_size(total)
        ));
        for layer in manifest.layers() {
            output.push_str(&format!(
                "  {}  {}\n",
                layer.digest(),
                format_size(layer.size())
            ));
        }

        output
    }
}

/// An image configuration, printed as its runtime settings in pretty mode
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput(pub ImageConfiguration);

impl Formattable for ConfigOutput {
    fn format_pretty(&self) -> String {
        let image = &self.0;
        let mut platform = format!("{}/{}", image.os(), image.architecture());
        if let Some(variant) = image.variant() {
            platform.push('/');
            platform.push_str(variant);
        }

        let mut output = format!("Platform:   {}\n", platform);
        if let Some(created) = image.created() {
            output.push_str(&format!("Created:    {}\n", created));
        }

        if let Some(config) = image.config() {
            if let Some(entrypoint) = config.entrypoint() {
                output.push_str(&format!("Entrypoint: {}\n", entrypoint.join(" ")));
            }
            if let Some(cmd) = config.cmd() {
                output.push_str(&format!("Cmd:        {}\n", cmd.join(" ")));
            }
            if let Some(working_dir) = config.working_dir() {
                output.push_str(&format!("WorkingDir: {}\n", working_dir));
            }
            if let Some(env) = config.env()
                && !env.is_empty()
            {
                output.push_str("Env:\n");
                for var in env {
                    output.push_str(&format!("  {}\n", var));
                }
            }
        }

        output.push_str(&format!("Layers:     {}\n", image.rootfs().diff_ids().len()));
        output
    }
}

/// A reference and the digest the registry reports for it
#[derive(Debug, Serialize, PartialEq)]
pub struct DigestOutput {
    pub reference: String,
    pub digest: String,
}

impl Formattable for DigestOutput {
    fn format_pretty(&self) -> String {
        self.digest.clone()
    }
}

/// Fetch the manifest for a platform
pub async fn get_manifest(
    ctx: &AppContext,
    reference: &str,
    platform: Option<&str>,
) -> Result<ManifestOutput, String> {
    let platform = parse_platform(platform)?;
    let client = ctx.client()?;

    client
        .get_manifest(reference, platform.as_ref())
        .await
        .map(ManifestOutput)
        .map_err(|e| format!("Failed to fetch manifest for '{}': {}", reference, e))
}

/// Fetch the image configuration for a platform
pub async fn get_config(
    ctx: &AppContext,
    reference: &str,
    platform: Option<&str>,
) -> Result<ConfigOutput, String> {
    let platform = parse_platform(platform)?;
    let client = ctx.client()?;

    client
        .get_config(reference, platform.as_ref())
        .await
        .map(ConfigOutput)
        .map_err(|e| format!("Failed to fetch config for '{}': {}", reference, e))
}

/// Fetch the content digest of a reference
pub async fn get_digest(ctx: &AppContext, reference: &str) -> Result<DigestOutput, String> {
    let client = ctx.client()?;
    let parsed = client
        .parse_reference(reference)
        .map_err(|e| format!("Invalid image reference '{}': {}", reference, e))?;

    let digest = client
        .get_digest(&parsed)
        .await
        .map_err(|e| format!("Failed to fetch digest for '{}': {}", reference, e))?;

    Ok(DigestOutput {
        reference: parsed.to_string(),
        digest,
    })
}

/// Handle the manifest command
pub async fn handle_manifest(ctx: &AppContext, reference: &str, platform: Option<&str>) {
    match get_manifest(ctx, reference, platform).await {
        Ok(manifest) => format::print_output(&manifest, ctx.format),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

/// Handle the config command
pub async fn handle_config(ctx: &AppContext, reference: &str, platform: Option<&str>) {
    match get_config(ctx, reference, platform).await {
        Ok(config) => format::print_output(&config, ctx.format),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

/// Handle the digest command
pub async fn handle_digest(ctx: &AppContext, reference: &str) {
    match get_digest(ctx, reference).await {
        Ok(digest) => format::print_output(&digest, ctx.format),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
