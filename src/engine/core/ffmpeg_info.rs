use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Run `<tool> -version` and return the first line of its banner
fn tool_version(tool: &Path, name: &str) -> Result<String> {
    let output = Command::new(tool)
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} ({}). Is it installed and in PATH?",
                name,
                tool.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!("{} command failed with status: {}", name, output.status);
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    let first_line = version_output.lines().next().unwrap_or("Unknown version");

    Ok(first_line.to_string())
}

/// Check if ffmpeg is available and return its version
pub fn ffmpeg_version(ffmpeg: &Path) -> Result<String> {
    tool_version(ffmpeg, "ffmpeg")
}

/// Check if ffprobe is available and return its version
pub fn ffprobe_version(ffprobe: &Path) -> Result<String> {
    tool_version(ffprobe, "ffprobe")
}
