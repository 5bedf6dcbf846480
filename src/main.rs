mod config;
mod console;
mod error;
mod exchange;
mod model;
mod monitor;
mod notifier;
mod store;
#[cfg(test)]
mod testing;

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use console::{Command, USAGE};
use exchange::PriceSource;
use exchange::binance::BinanceExchange;
use notifier::Notifier;
use notifier::telegram::TelegramNotifier;
use store::AlertStore;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("failed to build http client")]
    Client,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "coin-alert", about = "Crypto price threshold alerts via Telegram")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Start monitoring immediately instead of waiting for `start`
    #[arg(long)]
    start: bool,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    // Missing secrets stop us here, before anything is polled
    let secrets = config.telegram_secrets().change_context(AppError::Config)?;

    // ── Collaborators ─────────────────────────────────────────────────────────
    let timeout = config.general.request_timeout();
    let source: Arc<dyn PriceSource> = Arc::new(
        BinanceExchange::new(&config.exchange.base_url, timeout)
            .change_context(AppError::Client)?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(
        TelegramNotifier::new(
            &config.telegram.api_base,
            &secrets.bot_token,
            &secrets.chat_id,
            timeout,
        )
        .change_context(AppError::Client)?,
    );

    // ── Alerts ────────────────────────────────────────────────────────────────
    let store = AlertStore::new();
    for alert in &config.alerts {
        store
            .add(alert.clone())
            .await
            .change_context(AppError::Config)?;
    }
    if !store.is_empty().await {
        info!(count = store.len().await, "seeded alerts from config");
    }

    let mut monitor = Monitor {
        store: store.clone(),
        source,
        notifier,
        poll_every: config.general.poll_interval(),
        cancel: CancellationToken::new(),
        handle: None,
    };

    if cli.start {
        monitor.start();
    }

    // ── Console ───────────────────────────────────────────────────────────────
    println!("{USAGE}");
    let mut lines = console::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    loop {
        prompt();
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.change_context(AppError::Runtime)?;
                info!("ctrl+c received, shutting down");
                break;
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    // stdin closed: keep a running monitor alive until ctrl+c
                    if monitor.is_running() {
                        info!("stdin closed, monitoring continues until ctrl+c");
                        tokio::signal::ctrl_c()
                            .await
                            .change_context(AppError::Runtime)?;
                    }
                    break;
                };
                if !handle_line(&line, &store, &mut monitor).await {
                    break;
                }
            }
        }
    }

    monitor.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_line(line: &str, store: &AlertStore, monitor: &mut Monitor) -> bool {
    let command = match console::parse_command(line) {
        Ok(c) => c,
        Err(msg) => {
            println!("{msg}");
            return true;
        }
    };

    match command {
        Command::Add(new) => match store.add(new).await {
            Ok(id) => {
                if let Some(alert) = store.get(id).await {
                    info!(id, symbol = %alert.symbol, target = alert.target, direction = %alert.direction, "alert added");
                    println!(
                        "added #{id}: {} {} {}",
                        alert.symbol, alert.direction, alert.target
                    );
                }
            }
            Err(e) => println!("rejected: {}", e.current_context()),
        },
        Command::List => println!("{}", console::render_table(&store.list().await)),
        Command::Start => {
            if monitor.start() {
                println!("monitoring started (check Telegram for alerts)");
            } else {
                println!("monitoring is already running");
            }
        }
        Command::Help => println!("{USAGE}"),
        Command::Quit => return false,
        Command::Empty => {}
    }
    true
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Owns the evaluation task once the user has started it.
struct Monitor {
    store: AlertStore,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
    poll_every: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the evaluation task. Returns `false` if it was already running.
    fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        let store = self.store.clone();
        let source = Arc::clone(&self.source);
        let notifier = Arc::clone(&self.notifier);
        let poll_every = self.poll_every;
        let cancel = self.cancel.clone();

        self.handle = Some(tokio::spawn(async move {
            monitor::run(store, source.as_ref(), notifier.as_ref(), poll_every, cancel).await;
        }));
        true
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    // stdout belongs to the console
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
