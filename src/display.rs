use crate::session::SessionShared;
use chrono::Local;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodic renderer: snapshots the price table, prints it, then runs a
/// second alert-evaluation pass over every symbol in the snapshot.
pub struct DisplayTask {
    shared: Arc<SessionShared>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl DisplayTask {
    pub fn new(
        shared: Arc<SessionShared>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            shared,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("Display task started");

        loop {
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.shutdown.changed() => {}
            }
            if *self.shutdown.borrow() {
                break;
            }

            // Snapshot outside the lock, render, then evaluate alerts. The
            // price table lock is released before the alert book is touched.
            let entries = self.shared.prices.snapshot().await;
            let stamp = Local::now().format("%H:%M:%S");
            for entry in &entries {
                println!("[{}] {:<6} = ${:.2}", stamp, entry.symbol, entry.price);
            }

            for entry in entries {
                self.shared.check_alerts(&entry.symbol, entry.price).await;
            }
        }

        info!("Display task stopped");
    }
}
