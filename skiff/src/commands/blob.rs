use crate::context::AppContext;
use crate::format::{self, format_size};
use libskiff::client::error_for_status;
use std::io::Write;
use std::path::Path;

/// Download a blob into memory
pub async fn fetch_blob(
    ctx: &AppContext,
    repository: &str,
    digest: &str,
) -> Result<Vec<u8>, String> {
    let client = ctx.client()?;
    let response = client
        .get_blob(repository, digest)
        .await
        .and_then(error_for_status)
        .map_err(|e| format!("Failed to fetch blob {} from '{}': {}", digest, repository, e))?;

    Ok(response.into_bytes())
}

/// Write blob content to a file or stdout
pub fn write_blob(content: &[u8], output: Option<&Path>) -> Result<(), String> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e)),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content)
                .and_then(|_| stdout.flush())
                .map_err(|e| format!("Failed to write blob to stdout: {}", e))
        }
    }
}

/// Handle the blob command
pub async fn handle_blob(ctx: &AppContext, repository: &str, digest: &str, output: Option<&Path>) {
    let result = match fetch_blob(ctx, repository, digest).await {
        Ok(content) => write_blob(&content, output).map(|_| content.len()),
        Err(e) => Err(e),
    };

    match result {
        Ok(size) => {
            if let Some(path) = output {
                format::success(&format!(
                    "Wrote {} ({}) to {}",
                    digest,
                    format_size(size as u64),
                    path.display()
                ));
            }
        }
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "blob_tests.rs"]
mod tests;
