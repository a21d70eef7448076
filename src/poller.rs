use crate::session::{SessionMode, SessionShared};
use log::{debug, info, warn};
use metrics::{Counter, Gauge};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;

pub struct PollerMetrics {
    pub prices_fetched: Counter,
    pub fetch_errors: Counter,
    pub alerts_fired: Counter,
    pub active_pollers: Gauge,
}

/// One polling task per symbol: fetch, update the price table, append to the
/// log, evaluate alerts, sleep until the next cycle or shutdown.
pub struct SymbolPoller {
    symbol: String,
    shared: Arc<SessionShared>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    metrics: PollerMetrics,
}

impl SymbolPoller {
    pub fn new(
        symbol: String,
        shared: Arc<SessionShared>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            symbol,
            shared,
            interval,
            shutdown,
            metrics: PollerMetrics {
                prices_fetched: metrics::register_counter!("poller_prices_fetched"),
                fetch_errors: metrics::register_counter!("poller_fetch_errors"),
                alerts_fired: metrics::register_counter!("poller_alerts_fired"),
                active_pollers: metrics::register_gauge!("poller_active"),
            },
        }
    }

    pub async fn run(mut self) {
        info!("Poller started for {}", self.symbol);
        self.metrics.active_pollers.increment(1.0);

        while !*self.shutdown.borrow() {
            self.poll_once().await;

            // Interruptible sleep: wake on the next cycle or on shutdown,
            // whichever comes first.
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.shutdown.changed() => {}
            }
        }

        self.metrics.active_pollers.decrement(1.0);
        info!("Poller stopped for {}", self.symbol);
    }

    /// A failed cycle leaves the price table and alert book untouched.
    async fn poll_once(&self) {
        let start = Instant::now();

        let price = match self.shared.fetcher.fetch(&self.symbol).await {
            Ok(price) => price,
            Err(err) => {
                self.metrics.fetch_errors.increment(1);
                warn!("⚠️ Fetch failed for {}: {}", self.symbol, err);
                return;
            }
        };
        self.metrics.prices_fetched.increment(1);

        self.shared.prices.update(&self.symbol, price).await;

        if let Some(logger) = &self.shared.logger {
            if let Err(err) = logger.append(&self.symbol, price) {
                warn!("Failed to log {} price: {:#}", self.symbol, err);
            }
        }
        if let Some(line) = lookup_line(self.shared.mode, &self.symbol, price) {
            println!("{}", line);
        }

        if self.shared.check_alerts(&self.symbol, price).await {
            self.metrics.alerts_fired.increment(1);
        }

        debug!("Poll cycle for {} completed in {:?}", self.symbol, start.elapsed());
    }
}

/// Lookup sessions echo every fetch to the console; watch sessions stay quiet
/// between display ticks, whether or not the CSV log is available.
fn lookup_line(mode: SessionMode, symbol: &str, price: f64) -> Option<String> {
    match mode {
        SessionMode::Lookup => Some(format!("[LOOKUP] {} = ${:.2}", symbol, price)),
        SessionMode::Watch => None,
    }
}
