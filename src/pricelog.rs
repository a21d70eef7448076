use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Append-only CSV log of fetched prices.
///
/// Best-effort: callers are expected to log a warning and keep polling when
/// an append fails.
pub struct PriceLogger {
    path: PathBuf,
    lock: Mutex<()>, // serializes appends from concurrent pollers
}

impl PriceLogger {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let is_new = file
            .metadata()
            .map(|meta| meta.len() == 0)
            .unwrap_or(false);
        if is_new {
            file.write_all(b"Timestamp,Symbol,Price\n")
                .context("Failed to write log header")?;
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn append(&self, symbol: &str, price: f64) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))?;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "{},{},{}", timestamp, symbol, price)
            .context("Failed to append log row")?;
        file.flush().context("Failed to flush log file")
    }
}
