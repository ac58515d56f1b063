use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glob::glob;
use tracing::debug;

/// Finds the most recently modified `*.{extension}` file directly under `dir`.
///
/// Returns `Ok(None)` when nothing matches; the caller decides whether that is
/// worth more than a warning. On equal modification times the first match in
/// glob order wins, which keeps repeated runs deterministic.
pub fn latest_report(dir: &Path, extension: &str) -> Result<Option<PathBuf>> {
    let pattern = format!("{}/*.{}", dir.display(), extension);
    debug!(pattern = %pattern, "scanning for report files");

    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in glob(&pattern).context("invalid glob pattern for report directory")? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "skipping unreadable glob entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("failed to stat {}", path.display()))?;
        match &newest {
            Some((_, best)) if modified <= *best => {}
            _ => newest = Some((path, modified)),
        }
    }

    Ok(newest.map(|(path, _)| path))
}
