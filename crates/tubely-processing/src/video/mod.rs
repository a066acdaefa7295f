//! ffprobe/ffmpeg adapters

pub mod probe;
pub mod remux;

use anyhow::{anyhow, Result};

/// Reject tool paths that could smuggle shell syntax.
pub(crate) fn validate_tool_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.trim().is_empty() {
        return Err(anyhow!("Tool path is empty"));
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Tool path contains dangerous characters: {}", path));
    }
    Ok(())
}

/// Last `max` bytes of a tool's stderr, lossily decoded and trimmed.
pub(crate) fn stderr_tail(stderr: &[u8], max: usize) -> String {
    let start = stderr.len().saturating_sub(max);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
