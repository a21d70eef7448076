use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A threshold crossing reported to the caller for rendering and logging.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrigger {
    pub symbol: String,
    pub price: f64,
    pub threshold: f64,
}

/// Per-user alert thresholds plus the last-seen price memory used to detect
/// crossings.
///
/// Both maps live behind the same lock (see [`ConcurrentAlertBook`]): the
/// check-then-update sequence in [`check_and_trigger`](AlertBook::check_and_trigger)
/// and the rule removal on fire must be one exclusive-access unit, otherwise
/// two concurrent evaluations for the same (user, symbol) could both fire.
#[derive(Debug, Clone, Default)]
pub struct AlertBook {
    rules: BTreeMap<String, BTreeMap<String, f64>>, // user -> symbol -> threshold
    last_seen: BTreeMap<(String, String), f64>,     // (user, symbol) -> last observed price
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's rules with a freshly loaded set.
    pub fn load_user(&mut self, user: &str, rules: BTreeMap<String, f64>) {
        self.rules.insert(user.to_string(), rules);
    }

    /// Arms (or re-arms) an alert. At most one rule exists per (user, symbol).
    pub fn set(&mut self, user: &str, symbol: &str, threshold: f64) {
        self.rules
            .entry(user.to_string())
            .or_default()
            .insert(symbol.to_string(), threshold);
    }

    /// Removes a rule. Returns false when no rule was present; removing twice
    /// is not an error.
    pub fn remove(&mut self, user: &str, symbol: &str) -> bool {
        self.rules
            .get_mut(user)
            .map(|rules| rules.remove(symbol).is_some())
            .unwrap_or(false)
    }

    /// Currently armed rules for a user, ordered by symbol.
    pub fn list(&self, user: &str) -> Vec<(String, f64)> {
        self.rules
            .get(user)
            .map(|rules| {
                rules
                    .iter()
                    .map(|(symbol, &threshold)| (symbol.clone(), threshold))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy of a user's rule map, in the shape the persistence layer stores.
    pub fn rules_for_user(&self, user: &str) -> BTreeMap<String, f64> {
        self.rules.get(user).cloned().unwrap_or_default()
    }

    /// Forgets all last-seen prices. Called when a fresh watch session starts
    /// so observations never leak across sessions or users.
    pub fn reset_observations(&mut self) {
        self.last_seen.clear();
    }

    /// Evaluates one price observation against the armed rule, if any.
    ///
    /// The first observation for a (user, symbol) only establishes the
    /// baseline and can never fire. A crossing fires when the threshold lies
    /// between the previous and current price, boundary included in the
    /// direction of travel. The rule is consumed on fire; re-arming requires
    /// a new [`set`](AlertBook::set).
    pub fn check_and_trigger(
        &mut self,
        user: &str,
        symbol: &str,
        current: f64,
    ) -> Option<AlertTrigger> {
        let threshold = *self.rules.get(user)?.get(symbol)?;

        let key = (user.to_string(), symbol.to_string());
        let prev = match self.last_seen.insert(key, current) {
            Some(prev) => prev,
            None => return None, // first observation, no previous price to cross from
        };

        let crossed = (prev < threshold && current >= threshold)
            || (prev > threshold && current <= threshold);
        if !crossed {
            return None;
        }

        if let Some(rules) = self.rules.get_mut(user) {
            rules.remove(symbol);
        }
        Some(AlertTrigger {
            symbol: symbol.to_string(),
            price: current,
            threshold,
        })
    }
}

/// Thread-safe wrapper for the alert book using Arc<RwLock<_>>.
///
/// Shared by every caller of the evaluator (pollers and the display task);
/// `check_and_trigger` holds the write lock for the whole check-update-remove
/// sequence, which is what makes firing at-most-once per arming.
#[derive(Debug, Clone)]
pub struct ConcurrentAlertBook {
    inner: Arc<RwLock<AlertBook>>,
}

impl ConcurrentAlertBook {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(AlertBook::new())),
        }
    }

    pub async fn load_user(&self, user: &str, rules: BTreeMap<String, f64>) {
        let mut book = self.inner.write().await;
        book.load_user(user, rules);
    }

    pub async fn set(&self, user: &str, symbol: &str, threshold: f64) {
        let mut book = self.inner.write().await;
        book.set(user, symbol, threshold);
    }

    pub async fn remove(&self, user: &str, symbol: &str) -> bool {
        let mut book = self.inner.write().await;
        book.remove(user, symbol)
    }

    pub async fn list(&self, user: &str) -> Vec<(String, f64)> {
        let book = self.inner.read().await;
        book.list(user)
    }

    pub async fn rules_for_user(&self, user: &str) -> BTreeMap<String, f64> {
        let book = self.inner.read().await;
        book.rules_for_user(user)
    }

    pub async fn reset_observations(&self) {
        let mut book = self.inner.write().await;
        book.reset_observations();
    }

    pub async fn check_and_trigger(
        &self,
        user: &str,
        symbol: &str,
        current: f64,
    ) -> Option<AlertTrigger> {
        let mut book = self.inner.write().await;
        book.check_and_trigger(user, symbol, current)
    }
}

impl Default for ConcurrentAlertBook {
    fn default() -> Self {
        Self::new()
    }
}
