//! Counter persistence across restarts.

use std::path::Path;

use {
    anyhow::{Context, Result},
    herald_metrics::{BotStats, StatsSnapshot},
    tracing::{debug, info},
};

/// Restore counters from `path`. A missing file leaves the counters untouched.
pub fn restore(stats: &BotStats, path: &Path) -> Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "no stats snapshot yet");
        return Ok(());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot: StatsSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse stats snapshot {}", path.display()))?;
    stats.restore(&snapshot);
    info!(path = %path.display(), taken_at = ?snapshot.taken_at, "stats restored");
    Ok(())
}

pub fn save(stats: &BotStats, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&stats.snapshot())?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "stats saved");
    Ok(())
}
