use anyhow::Result;
use log::warn;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use stockwatch::alerts::ConcurrentAlertBook;
use stockwatch::api::{PriceFetcher, TwelveDataClient};
use stockwatch::persistence;
use stockwatch::session::{Session, SessionConfig, SessionController};
use stockwatch::watchlist::{parse_symbols, WatchlistManager};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const DATA_DIR: &str = "data";
const SOUND_FILE: &str = "sound/alert.wav";
const SYMBOLS_FILE: &str = "nasdaq_symbols.txt";
const API_KEY_ENV: &str = "TWELVEDATA_API_KEY";

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
    if api_key.is_empty() {
        warn!("{} is not set; price fetches will fail", API_KEY_ENV);
    }

    let fetcher: Arc<dyn PriceFetcher> = Arc::new(TwelveDataClient::new(api_key)?);
    let controller =
        SessionController::new(fetcher, DATA_DIR, SessionConfig::default()).with_sound(SOUND_FILE);
    let watchlists = WatchlistManager::new(DATA_DIR);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    mode_loop(&controller, &watchlists, &mut lines).await?;

    println!("[EXIT] Goodbye.");
    Ok(())
}

async fn mode_loop(
    controller: &SessionController,
    watchlists: &WatchlistManager,
    lines: &mut InputLines,
) -> Result<()> {
    loop {
        let mode = match read_line(lines, "\nMode (watch/lookup/symbols/exit): ").await? {
            Some(mode) => mode,
            None => break, // end of input
        };

        match mode.as_str() {
            "exit" => break,
            "symbols" => show_symbols(lines).await?,
            "lookup" => run_lookup(controller, lines).await?,
            "watch" => {
                let user = match read_line(lines, "Enter username: ").await? {
                    Some(user) if !user.is_empty() => user,
                    Some(_) => {
                        println!("[ERROR] Username cannot be empty.");
                        continue;
                    }
                    None => break,
                };
                watch_command_loop(controller, watchlists, lines, &user).await?;
            }
            "" => {}
            _ => println!("[ERROR] Invalid mode. Type 'watch', 'lookup', 'symbols', or 'exit'."),
        }
    }
    Ok(())
}

async fn run_lookup(controller: &SessionController, lines: &mut InputLines) -> Result<()> {
    let input = match read_line(lines, "Enter stock symbols (comma-separated): ").await? {
        Some(input) => input,
        None => return Ok(()),
    };

    match controller.start_lookup(parse_symbols(&input)).await {
        Ok(session) => {
            println!("[LOOKUP] Started — press ENTER to return.");
            run_until_enter(session, lines).await?;
            println!("[LOOKUP] Ended.");
        }
        Err(err) => println!("[ERROR] {}", err),
    }
    Ok(())
}

async fn watch_command_loop(
    controller: &SessionController,
    watchlists: &WatchlistManager,
    lines: &mut InputLines,
    user: &str,
) -> Result<()> {
    let alerts = ConcurrentAlertBook::new();
    match persistence::load_alerts(Path::new(DATA_DIR), user) {
        Ok(rules) => alerts.load_user(user, rules).await,
        Err(err) => warn!("Failed to load alerts for {}: {:#}", user, err),
    }

    loop {
        let cmd = match read_line(
            lines,
            "\n[Commands: add <symbol>, remove <symbol>, alert <symbol> <price>, \
             remove_alert <symbol>, list_alerts, watch, exit]\n> ",
        )
        .await?
        {
            Some(cmd) => cmd,
            None => break,
        };

        if let Some(rest) = cmd.strip_prefix("add ") {
            let symbols = parse_symbols(rest);
            if symbols.is_empty() {
                println!("[ERROR] Usage: add <symbol>[,<symbol>...]");
            } else if let Err(err) = watchlists.add(user, &symbols) {
                warn!("Failed to update watchlist: {:#}", err);
            } else {
                println!("[OK] Added to watchlist.");
            }
        } else if let Some(rest) = cmd.strip_prefix("remove ") {
            let symbols = parse_symbols(rest);
            if symbols.is_empty() {
                println!("[ERROR] Usage: remove <symbol>[,<symbol>...]");
            } else if let Err(err) = watchlists.remove(user, &symbols) {
                warn!("Failed to update watchlist: {:#}", err);
            } else {
                println!("[OK] Removed from watchlist.");
            }
        } else if let Some(rest) = cmd.strip_prefix("alert ") {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next().and_then(|p| p.parse::<f64>().ok())) {
                (Some(symbol), Some(threshold)) => {
                    alerts.set(user, symbol, threshold).await;
                    persist_alerts(&alerts, user).await;
                    println!("[ALERT] Set for {} at ${}", symbol, threshold);
                }
                _ => println!("[ERROR] Usage: alert <symbol> <price>"),
            }
        } else if let Some(rest) = cmd.strip_prefix("remove_alert ") {
            let symbol = rest.trim();
            if symbol.is_empty() {
                println!("[ERROR] Usage: remove_alert <symbol>");
            } else if alerts.remove(user, symbol).await {
                persist_alerts(&alerts, user).await;
                println!("[ALERT] Removed for {}", symbol);
            } else {
                println!("[INFO] No alert found for {}", symbol);
            }
        } else if cmd == "list_alerts" {
            let rules = alerts.list(user).await;
            if rules.is_empty() {
                println!("[INFO] No alerts set.");
            } else {
                println!("\nAlerts for {}:", user);
                for (symbol, threshold) in rules {
                    println!("  - {} crosses ${}", symbol, threshold);
                }
            }
        } else if cmd == "watch" {
            let symbols = watchlists.get(user);
            if symbols.is_empty() {
                println!("[INFO] Watchlist is empty.");
                continue;
            }
            match controller.start_watch(user, symbols, alerts.clone()).await {
                Ok(session) => {
                    println!("[WATCH] Started — press ENTER to stop.");
                    run_until_enter(session, lines).await?;
                    println!("[WATCH] Ended.");
                }
                Err(err) => println!("[ERROR] {}", err),
            }
        } else if cmd == "exit" {
            break;
        } else if !cmd.is_empty() {
            println!("[?] Unknown command.");
        }
    }
    Ok(())
}

async fn show_symbols(lines: &mut InputLines) -> Result<()> {
    match std::fs::read_to_string(SYMBOLS_FILE) {
        Ok(contents) => {
            println!("\n[NASDAQ Symbols and Companies List]");
            print!("{}", contents);
        }
        Err(err) => println!("[ERROR] Could not open {}: {}", SYMBOLS_FILE, err),
    }
    read_line(lines, "\n[INFO] Press ENTER to return.\n").await?;
    Ok(())
}

/// Blocks on the next input line (ENTER or end of input), then stops the
/// session and waits for every task to exit.
async fn run_until_enter(session: Session, lines: &mut InputLines) -> Result<()> {
    let _ = lines.next_line().await?;
    session.stop().await;
    Ok(())
}

async fn persist_alerts(alerts: &ConcurrentAlertBook, user: &str) {
    let rules = alerts.rules_for_user(user).await;
    if let Err(err) = persistence::save_alerts(Path::new(DATA_DIR), user, &rules) {
        warn!("Failed to persist alerts for {}: {:#}", user, err);
    }
}

async fn read_line(lines: &mut InputLines, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string()))
}
