use crate::persistence;
use anyhow::Result;
use log::warn;
use std::path::PathBuf;

/// Splits comma-separated symbol input, trimming whitespace and dropping
/// empty tokens.
pub fn parse_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Per-user watchlists, persisted as JSON on every mutation.
pub struct WatchlistManager {
    data_dir: PathBuf,
}

impl WatchlistManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the user's watchlist; an unreadable file degrades to an empty
    /// list with a warning.
    pub fn get(&self, user: &str) -> Vec<String> {
        match persistence::load_watchlist(&self.data_dir, user) {
            Ok(symbols) => symbols,
            Err(err) => {
                warn!("Failed to load watchlist for {}: {:#}", user, err);
                Vec::new()
            }
        }
    }

    /// Adds symbols to the watchlist, skipping duplicates.
    pub fn add(&self, user: &str, symbols: &[String]) -> Result<()> {
        let mut current = self.get(user);
        for symbol in symbols {
            if !current.contains(symbol) {
                current.push(symbol.clone());
            }
        }
        persistence::save_watchlist(&self.data_dir, user, &current)
    }

    /// Removes symbols from the watchlist. Unknown symbols are ignored.
    pub fn remove(&self, user: &str, symbols: &[String]) -> Result<()> {
        let mut current = self.get(user);
        current.retain(|symbol| !symbols.contains(symbol));
        persistence::save_watchlist(&self.data_dir, user, &current)
    }
}
