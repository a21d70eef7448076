use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest known price for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub symbol: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    entries: BTreeMap<String, f64>, // symbol -> latest price
}

impl PriceTable {
    /// Creates a new, empty price table.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts or replaces the entry for a symbol. Last write wins.
    pub fn update(&mut self, symbol: &str, price: f64) {
        self.entries.insert(symbol.to_string(), price);
    }

    /// Returns the latest price for a symbol, if one has been fetched.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.entries.get(symbol).copied()
    }

    /// Point-in-time copy of every entry, ordered by symbol.
    pub fn snapshot(&self) -> Vec<PriceEntry> {
        self.entries
            .iter()
            .map(|(symbol, &price)| PriceEntry {
                symbol: symbol.clone(),
                price,
            })
            .collect()
    }

    /// Drops all entries. Used when a fresh session starts.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thread-safe wrapper for the price table using Arc<RwLock<_>>.
///
/// All pollers write through the same lock; readers take a full snapshot so
/// the lock is never held during rendering or alert evaluation.
#[derive(Debug, Clone)]
pub struct ConcurrentPriceTable {
    inner: Arc<RwLock<PriceTable>>,
}

impl ConcurrentPriceTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PriceTable::new())),
        }
    }

    pub async fn update(&self, symbol: &str, price: f64) {
        let mut table = self.inner.write().await;
        table.update(symbol, price);
    }

    pub async fn get(&self, symbol: &str) -> Option<f64> {
        let table = self.inner.read().await;
        table.get(symbol)
    }

    pub async fn snapshot(&self) -> Vec<PriceEntry> {
        let table = self.inner.read().await;
        table.snapshot()
    }

    pub async fn clear(&self) {
        let mut table = self.inner.write().await;
        table.clear();
    }

    pub async fn len(&self) -> usize {
        let table = self.inner.read().await;
        table.len()
    }

    pub async fn is_empty(&self) -> bool {
        let table = self.inner.read().await;
        table.is_empty()
    }
}

impl Default for ConcurrentPriceTable {
    fn default() -> Self {
        Self::new()
    }
}
