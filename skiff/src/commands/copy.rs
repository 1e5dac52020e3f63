use crate::context::AppContext;
use crate::format;

/// Copy the manifest or index at `source` to `destination`
pub async fn copy_reference(
    ctx: &AppContext,
    source: &str,
    destination: &str,
) -> Result<(), String> {
    let client = ctx.client()?;
    client
        .copy(source, destination)
        .await
        .map_err(|e| format!("Failed to copy '{}' to '{}': {}", source, destination, e))
}

/// Handle the copy command
pub async fn handle_copy(ctx: &AppContext, source: &str, destination: &str) {
    match copy_reference(ctx, source, destination).await {
        Ok(()) => format::success(&format!("Copied {} to {}", source, destination)),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "copy_tests.rs"]
mod tests;
