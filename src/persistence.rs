use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct WatchlistFile {
    symbols: Vec<String>,
}

fn watchlist_path(dir: &Path, user: &str) -> PathBuf {
    dir.join(format!("watchlist_{}.json", user))
}

fn alerts_path(dir: &Path, user: &str) -> PathBuf {
    dir.join(format!("alerts_{}.json", user))
}

/// Loads a user's watchlist. A missing file is an empty watchlist, not an
/// error.
pub fn load_watchlist(dir: &Path, user: &str) -> Result<Vec<String>> {
    let path = watchlist_path(dir, user);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read watchlist file {}", path.display()))?;
    let file: WatchlistFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse watchlist file {}", path.display()))?;
    Ok(file.symbols)
}

pub fn save_watchlist(dir: &Path, user: &str, symbols: &[String]) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create data directory")?;
    let path = watchlist_path(dir, user);
    let json = serde_json::to_string_pretty(&WatchlistFile {
        symbols: symbols.to_vec(),
    })
    .context("Failed to serialize watchlist")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write watchlist file {}", path.display()))
}

/// Loads a user's alert thresholds (symbol -> threshold). A missing file is an
/// empty set.
pub fn load_alerts(dir: &Path, user: &str) -> Result<BTreeMap<String, f64>> {
    let path = alerts_path(dir, user);
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read alerts file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse alerts file {}", path.display()))
}

pub fn save_alerts(dir: &Path, user: &str, alerts: &BTreeMap<String, f64>) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create data directory")?;
    let path = alerts_path(dir, user);
    let json = serde_json::to_string_pretty(alerts).context("Failed to serialize alerts")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write alerts file {}", path.display()))
}
