use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stockwatch::alerts::ConcurrentAlertBook;
use stockwatch::api::{FetchError, PriceFetcher};
use stockwatch::persistence;
use stockwatch::session::{SessionConfig, SessionController, SessionError, SessionMode};
use tempfile::tempdir;
use tokio::time::sleep;

/// Replays a fixed per-symbol price sequence; the final step repeats forever.
/// `None` steps simulate fetch failures.
struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Option<f64>>>>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    fn with_script(self, symbol: &str, steps: &[Option<f64>]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(symbol.to_string(), steps.iter().copied().collect());
        self
    }
}

#[async_trait]
impl PriceFetcher for ScriptedFetcher {
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchError> {
        let mut scripts = self.scripts.lock().unwrap();
        let steps = scripts
            .get_mut(symbol)
            .ok_or_else(|| FetchError::MissingPrice(symbol.to_string()))?;
        let step = if steps.len() > 1 {
            steps.pop_front().flatten()
        } else {
            steps.front().copied().flatten()
        };
        step.ok_or_else(|| FetchError::MissingPrice(symbol.to_string()))
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::from_millis(20),
        // Keep the display quiet unless a test needs it
        display_interval: Duration::from_secs(3600),
    }
}

fn controller(fetcher: ScriptedFetcher, data_dir: &std::path::Path) -> SessionController {
    let fetcher: Arc<dyn PriceFetcher> = Arc::new(fetcher);
    SessionController::new(fetcher, data_dir, fast_config())
}

#[tokio::test]
async fn test_empty_symbol_set_is_rejected() {
    let dir = tempdir().unwrap();
    let controller = controller(ScriptedFetcher::new(), dir.path());

    assert!(matches!(
        controller.start_lookup(Vec::new()).await,
        Err(SessionError::EmptySymbolSet)
    ));
    assert!(matches!(
        controller
            .start_watch("alice", Vec::new(), ConcurrentAlertBook::new())
            .await,
        Err(SessionError::EmptySymbolSet)
    ));
}

#[tokio::test]
async fn test_lookup_session_populates_price_table() {
    let dir = tempdir().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with_script("AAPL", &[Some(150.0)])
        .with_script("MSFT", &[Some(300.0)]);
    let controller = controller(fetcher, dir.path());

    let session = controller
        .start_lookup(vec!["AAPL".to_string(), "MSFT".to_string()])
        .await
        .unwrap();
    assert_eq!(session.mode(), SessionMode::Lookup);
    assert!(session.is_running());

    sleep(Duration::from_millis(100)).await;

    let prices = session.prices();
    assert_eq!(prices.get("AAPL").await, Some(150.0));
    assert_eq!(prices.get("MSFT").await, Some(300.0));

    session.stop().await;
}

#[tokio::test]
async fn test_stop_is_prompt_despite_long_poll_interval() {
    let dir = tempdir().unwrap();
    let fetcher = ScriptedFetcher::new().with_script("AAPL", &[Some(150.0)]);
    let fetcher: Arc<dyn PriceFetcher> = Arc::new(fetcher);
    let config = SessionConfig {
        poll_interval: Duration::from_secs(10),
        display_interval: Duration::from_secs(10),
    };
    let controller = SessionController::new(fetcher, dir.path(), config);

    let session = controller
        .start_lookup(vec!["AAPL".to_string()])
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await; // every task is now mid-sleep

    let start = Instant::now();
    session.stop().await;
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "stop took {:?}, tasks must wake on the broadcast, not the interval",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_fetch_failures_skip_the_cycle() {
    let dir = tempdir().unwrap();
    let fetcher = ScriptedFetcher::new()
        .with_script("GOOD", &[Some(42.0)])
        .with_script("BAD", &[None]);
    let controller = controller(fetcher, dir.path());

    let session = controller
        .start_lookup(vec!["GOOD".to_string(), "BAD".to_string()])
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    let prices = session.prices();
    assert_eq!(prices.get("GOOD").await, Some(42.0));
    assert_eq!(prices.get("BAD").await, None, "failed cycles leave no entry");

    session.stop().await;
}

#[tokio::test]
async fn test_watch_session_fires_alert_once_and_persists() {
    let dir = tempdir().unwrap();
    let fetcher = ScriptedFetcher::new().with_script(
        "AAPL",
        &[Some(148.0), Some(149.0), Some(151.0), Some(149.0)],
    );
    let controller = controller(fetcher, dir.path());

    let alerts = ConcurrentAlertBook::new();
    alerts.set("alice", "AAPL", 150.0).await;

    let session = controller
        .start_watch("alice", vec!["AAPL".to_string()], alerts.clone())
        .await
        .unwrap();
    assert_eq!(session.mode(), SessionMode::Watch);
    let session_alerts = session.alerts();

    sleep(Duration::from_millis(400)).await;
    session.stop().await;

    // The 149 -> 151 crossing consumed the rule, and the removal was saved.
    // The session handle and the caller's handle see the same book.
    assert!(session_alerts.rules_for_user("alice").await.is_empty());
    assert!(alerts.rules_for_user("alice").await.is_empty());
    let persisted = persistence::load_alerts(dir.path(), "alice").unwrap();
    assert!(persisted.is_empty());
}

#[tokio::test]
async fn test_watch_session_appends_to_csv_log() {
    let dir = tempdir().unwrap();
    let fetcher = ScriptedFetcher::new().with_script("AAPL", &[Some(150.0)]);
    let controller = controller(fetcher, dir.path());

    let session = controller
        .start_watch("alice", vec!["AAPL".to_string()], ConcurrentAlertBook::new())
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    session.stop().await;

    let log = std::fs::read_to_string(dir.path().join("stock_log.csv")).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("Timestamp,Symbol,Price"));
    assert!(lines.next().unwrap().contains(",AAPL,150"));
}

#[tokio::test]
async fn test_watch_session_survives_unwritable_log() {
    let dir = tempdir().unwrap();
    // A plain file where the data directory should be makes the CSV log
    // impossible to create.
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();

    let fetcher = ScriptedFetcher::new().with_script("AAPL", &[Some(150.0)]);
    let controller = controller(fetcher, &blocked);

    let session = controller
        .start_watch("alice", vec!["AAPL".to_string()], ConcurrentAlertBook::new())
        .await
        .unwrap();
    // Still a watch session, just without the log
    assert_eq!(session.mode(), SessionMode::Watch);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(session.prices().get("AAPL").await, Some(150.0));
    session.stop().await;
}
