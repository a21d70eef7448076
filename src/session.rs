use crate::alerts::ConcurrentAlertBook;
use crate::api::PriceFetcher;
use crate::display::DisplayTask;
use crate::fsm::SessionFsm;
use crate::notify::Notifier;
use crate::persistence;
use crate::poller::SymbolPoller;
use crate::pricelog::PriceLogger;
use crate::pricetable::ConcurrentPriceTable;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use crate::fsm::SessionMode;

const LOG_FILE: &str = "stock_log.csv";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot start a session with an empty symbol set")]
    EmptySymbolSet,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub display_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            display_interval: Duration::from_secs(10),
        }
    }
}

/// State shared by every task a session spawns.
///
/// Lock discipline: the price table lock and the alert book lock are never
/// held at the same time. Readers take a price table snapshot first, release
/// it, then evaluate alerts.
pub struct SessionShared {
    pub mode: SessionMode,
    pub user: Option<String>,
    pub prices: ConcurrentPriceTable,
    pub alerts: ConcurrentAlertBook,
    pub fetcher: Arc<dyn PriceFetcher>,
    pub logger: Option<Arc<PriceLogger>>,
    pub notifier: Notifier,
    pub data_dir: PathBuf,
}

impl SessionShared {
    /// Evaluates one price observation for the session user. Fired alerts are
    /// rendered through the notifier and the surviving rule set is persisted.
    /// Returns true when an alert fired.
    pub async fn check_alerts(&self, symbol: &str, price: f64) -> bool {
        let user = match &self.user {
            Some(user) => user,
            None => return false, // lookup sessions have no alert rules
        };

        let trigger = match self.alerts.check_and_trigger(user, symbol, price).await {
            Some(trigger) => trigger,
            None => return false,
        };

        self.notifier.notify(&trigger);
        let rules = self.alerts.rules_for_user(user).await;
        if let Err(err) = persistence::save_alerts(&self.data_dir, user, &rules) {
            warn!("Failed to persist alerts for {}: {:#}", user, err);
        }
        true
    }
}

/// Handle to a running set of poller tasks plus the display task.
pub struct Session {
    shared: Arc<SessionShared>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    fsm: SessionFsm,
}

impl Session {
    pub fn mode(&self) -> SessionMode {
        self.shared.mode
    }

    pub fn is_running(&self) -> bool {
        self.fsm.is_running()
    }

    pub fn prices(&self) -> ConcurrentPriceTable {
        self.shared.prices.clone()
    }

    pub fn alerts(&self) -> ConcurrentAlertBook {
        self.shared.alerts.clone()
    }

    /// Broadcasts shutdown, wakes every sleeping task, and waits for all of
    /// them to exit. No task outlives this call.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                error!("Session task panicked: {}", err);
            }
        }
        if let Some(mode) = self.fsm.stop() {
            info!("✅ Session stopped ({:?} mode)", mode);
        }
    }
}

/// Starts and stops poller/display task sets for watch and lookup modes.
pub struct SessionController {
    fetcher: Arc<dyn PriceFetcher>,
    data_dir: PathBuf,
    sound_path: Option<PathBuf>,
    config: SessionConfig,
}

impl SessionController {
    pub fn new(
        fetcher: Arc<dyn PriceFetcher>,
        data_dir: impl Into<PathBuf>,
        config: SessionConfig,
    ) -> Self {
        Self {
            fetcher,
            data_dir: data_dir.into(),
            sound_path: None,
            config,
        }
    }

    pub fn with_sound(mut self, path: impl Into<PathBuf>) -> Self {
        self.sound_path = Some(path.into());
        self
    }

    /// Starts a watch session: one poller per watchlist symbol plus the
    /// display task, CSV logging enabled, alerts evaluated for `user`.
    pub async fn start_watch(
        &self,
        user: &str,
        symbols: Vec<String>,
        alerts: ConcurrentAlertBook,
    ) -> Result<Session, SessionError> {
        let symbols = dedupe(symbols);
        if symbols.is_empty() {
            return Err(SessionError::EmptySymbolSet);
        }

        let logger = match PriceLogger::new(self.data_dir.join(LOG_FILE)) {
            Ok(logger) => Some(Arc::new(logger)),
            Err(err) => {
                warn!("Price log unavailable, polling without it: {:#}", err);
                None
            }
        };

        // Fresh session: no stale prices, no stale crossing baselines.
        alerts.reset_observations().await;

        let shared = Arc::new(SessionShared {
            mode: SessionMode::Watch,
            user: Some(user.to_string()),
            prices: ConcurrentPriceTable::new(),
            alerts,
            fetcher: Arc::clone(&self.fetcher),
            logger,
            notifier: Notifier::new(self.sound_path.clone()),
            data_dir: self.data_dir.clone(),
        });

        info!("👀 Watch session starting for {} ({} symbols)", user, symbols.len());
        Ok(self.spawn(symbols, shared))
    }

    /// Starts a lookup session: ad-hoc symbols, no user, no CSV log.
    pub async fn start_lookup(&self, symbols: Vec<String>) -> Result<Session, SessionError> {
        let symbols = dedupe(symbols);
        if symbols.is_empty() {
            return Err(SessionError::EmptySymbolSet);
        }

        let shared = Arc::new(SessionShared {
            mode: SessionMode::Lookup,
            user: None,
            prices: ConcurrentPriceTable::new(),
            alerts: ConcurrentAlertBook::new(),
            fetcher: Arc::clone(&self.fetcher),
            logger: None,
            notifier: Notifier::new(self.sound_path.clone()),
            data_dir: self.data_dir.clone(),
        });

        info!("🔍 Lookup session starting ({} symbols)", symbols.len());
        Ok(self.spawn(symbols, shared))
    }

    fn spawn(&self, symbols: Vec<String>, shared: Arc<SessionShared>) -> Session {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::with_capacity(symbols.len() + 1);
        for symbol in symbols {
            let poller = SymbolPoller::new(
                symbol,
                Arc::clone(&shared),
                self.config.poll_interval,
                shutdown_rx.clone(),
            );
            tasks.push(tokio::spawn(poller.run()));
        }

        let display = DisplayTask::new(
            Arc::clone(&shared),
            self.config.display_interval,
            shutdown_rx,
        );
        tasks.push(tokio::spawn(display.run()));

        let mut fsm = SessionFsm::new();
        fsm.start(shared.mode);

        Session {
            shared,
            shutdown_tx,
            tasks,
            fsm,
        }
    }
}

// One poller per symbol: drop duplicates, keep first-seen order.
fn dedupe(symbols: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if !seen.contains(&symbol) {
            seen.push(symbol);
        }
    }
    seen
}
