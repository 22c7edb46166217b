use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `triada.log` in the current directory
pub fn default_log_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()
        .context("Could not determine current directory")?
        .join("triada.log"))
}

/// Append a timestamped entry to the debug log, creating it if needed.
/// Multi-line messages (full encoder output) are written verbatim after the stamp.
pub fn write_debug_log(log_path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open debug log {}", log_path.display()))?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] {}", timestamp, message.trim_end())?;
    Ok(())
}
