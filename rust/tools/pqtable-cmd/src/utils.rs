//! Helpers shared by the commands.

use std::path::PathBuf;

use anyhow::Result;

/// Resolves the input file argument, failing early on missing files and
/// directories.
pub fn input_file(path: &str) -> Result<PathBuf> {
    let path = PathBuf::from(path);
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Path is not a file: {}", path.display());
    }
    Ok(path)
}

/// Formats a byte count with a binary unit.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut scaled = size as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }
    match unit {
        0 => format!("{size} B"),
        _ => format!("{scaled:.2} {}", UNITS[unit]),
    }
}

/// Rate of `amount` per second, `None` for intervals too short to measure.
pub fn per_second(amount: f64, elapsed: std::time::Duration) -> Option<f64> {
    (elapsed.as_millis() > 0).then(|| amount / elapsed.as_secs_f64())
}
