//! dexwatch - DEX token milestone tracker

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use dexwatch::adapters::cli::{self, AddCmd, Command, PricesCmd, ResetCmd, RunCmd, StatusCmd, TrackCmd};
use dexwatch::adapters::dexscreener::DexScreenerClient;
use dexwatch::adapters::notify::{format_money, format_price, ConsoleNotifier, TelegramNotifier};
use dexwatch::adapters::sqlite::SqliteTokenStore;
use dexwatch::application::{AlertDispatcher, TrackingOrchestrator};
use dexwatch::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use dexwatch::domain::NewToken;
use dexwatch::ports::{PriceSource, TokenStore, BATCH_MAX};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (Telegram secrets go here, not in the TOML)
    dotenvy::dotenv().ok();

    let app = cli::init();
    let config = read_config(app.command.config_path())?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Run(cmd) => run_command(cmd, config).await,
        Command::Track(cmd) => track_command(cmd, config).await,
        Command::Status(cmd) => status_command(cmd, config),
        Command::Add(cmd) => add_command(cmd, config),
        Command::Prices(cmd) => prices_command(cmd, config).await,
        Command::Reset(cmd) => reset_command(cmd, config),
    }
}

/// RUST_LOG wins, then CLI flags, then `[logging].level`
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

/// The default config file is optional; an explicit one must exist
fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn open_store(config: &Config) -> Result<Arc<SqliteTokenStore>> {
    let path = config.database.resolved_path()?;
    let store = SqliteTokenStore::open(&path)
        .with_context(|| format!("Failed to open token database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn price_client(config: &Config) -> Result<Arc<DexScreenerClient>> {
    let client = DexScreenerClient::with_config(config.dexscreener_config())
        .context("Failed to create DexScreener client")?;
    Ok(Arc::new(client))
}

fn build_dispatcher(config: &Config) -> AlertDispatcher {
    let mut dispatcher = AlertDispatcher::new().with_alert_delay(config.alert_delay());

    if config.alerts.console_enabled {
        dispatcher.add_notifier(Arc::new(ConsoleNotifier::new()));
    }

    if config.alerts.telegram_enabled {
        let telegram = TelegramNotifier::new(
            config.alerts.get_telegram_bot_token(),
            config.alerts.get_telegram_chat_id(),
        );
        if telegram.is_enabled() {
            dispatcher.add_notifier(Arc::new(telegram));
        } else {
            tracing::warn!("Telegram enabled but TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID are missing");
        }
    }

    dispatcher
}

fn build_orchestrator(config: &Config) -> Result<TrackingOrchestrator> {
    let store: Arc<dyn TokenStore> = open_store(config)?;
    let prices: Arc<dyn PriceSource> = price_client(config)?;
    let table = config.milestone_table()?;

    let orchestrator = TrackingOrchestrator::new(store, prices, table, config.tracking_settings())
        .context("Failed to create orchestrator")?;
    Ok(orchestrator)
}

async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting dexwatch...");
    tracing::info!("Config: {}", cmd.config.display());

    let dispatcher = Arc::new(build_dispatcher(&config));
    if dispatcher.is_empty() {
        tracing::warn!("No notifiers enabled - milestones will only be recorded");
    }
    let orchestrator = build_orchestrator(&config)?.with_dispatcher(Arc::clone(&dispatcher));

    if cmd.once {
        let report = orchestrator.run_cycle().await.context("Tracking cycle failed")?;
        dispatcher.dispatch(&report.events).await;
        return Ok(());
    }

    // Setup Ctrl+C handler
    let orch = orchestrator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        orch.stop().await;
    });

    orchestrator.run().await?;
    tracing::info!("dexwatch stopped");
    Ok(())
}

async fn track_command(_cmd: TrackCmd, config: Config) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let report = orchestrator.run_cycle().await.context("Tracking cycle failed")?;

    println!(
        "Tracked {} | priced {} | batches {} | expired {} | milestones {}",
        report.tracked, report.priced, report.batches, report.expired, report.events.len()
    );
    for event in &report.events {
        println!(
            "  {:<10} {:<6} {} -> {} ({:.2}x)  {}",
            event.symbol,
            event.milestone_label,
            format_price(event.baseline_price),
            format_price(event.current_price),
            event.multiplier,
            event.dexscreener_url()
        );
    }

    build_dispatcher(&config).dispatch(&report.events).await;
    Ok(())
}

fn status_command(cmd: StatusCmd, config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let total = store.count()?;
    let trackable = store.list_trackable()?.len();
    let recent = store.recent(cmd.limit)?;
    let now = Utc::now();

    println!("Tokens: {} stored, {} trackable", total, trackable);
    println!("Database: {}", config.database.resolved_path()?.display());

    if recent.is_empty() {
        return Ok(());
    }

    println!();
    println!("{:<10} {:<8} {:>14} {:>9} {:>9} {:>7}  {}", "SYMBOL", "CHAIN", "BASELINE", "LIQ", "MCAP", "AGE", "MILESTONES");
    for token in recent {
        println!(
            "{:<10} {:<8} {:>14} {:>9} {:>9} {:>6.1}h  {}",
            token.symbol,
            token.chain,
            format_price(token.baseline_price),
            format_money(token.liquidity_usd),
            format_money(token.market_cap),
            token.age_hours(now),
            token.milestones_hit
        );
    }
    Ok(())
}

fn add_command(cmd: AddCmd, config: Config) -> Result<()> {
    if !cmd.price.is_finite() || cmd.price < 0.0 {
        bail!("Baseline price must be >= 0, got {}", cmd.price);
    }

    let store = open_store(&config)?;
    let token = NewToken::new(&cmd.address, &cmd.chain, &cmd.symbol, &cmd.name, cmd.price)
        .with_market(cmd.liquidity, cmd.market_cap);

    if store.upsert_new(&token)? {
        println!("Added {} ({}) at {}", token.symbol, token.address, format_price(token.baseline_price));
    } else {
        println!("Already tracking {}", token.address);
    }
    Ok(())
}

async fn prices_command(cmd: PricesCmd, config: Config) -> Result<()> {
    let client = price_client(&config)?;
    let addresses: Vec<String> = cmd.addresses.iter().map(|a| dexwatch::domain::normalize_address(a)).collect();

    for chunk in addresses.chunks(BATCH_MAX) {
        let prices = client.fetch_batch(chunk).await.context("Price lookup failed")?;
        for address in chunk {
            match prices.get(address) {
                Some(price) => println!("{}  {}", address, format_price(*price)),
                None => println!("{}  (no price)", address),
            }
        }
    }
    Ok(())
}

fn reset_command(cmd: ResetCmd, config: Config) -> Result<()> {
    if !cmd.yes {
        bail!("Refusing to delete every tracked token without --yes");
    }
    let store = open_store(&config)?;
    let removed = store.clear_all()?;
    println!("Deleted {} tokens", removed);
    Ok(())
}
