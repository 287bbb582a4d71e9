// =============================================================================
// GPW Signal Engine — Operator CLI Entry Point
// =============================================================================
//
// A clap-derived command surface: each subcommand builds an `Engine` and runs
// one pipeline stage to completion, returning an exit code that reports what
// happened (0 ok, 1 configuration error, 2 transient external failure, 3
// invariant violation).
//
// The in-memory store implementations are the single-process reference
// backend; a durable deployment swaps them behind the same traits. Because
// state does not persist across process invocations in this mode, every
// subcommand composes the pipeline stages it depends on (e.g. `dispatch`
// first collects and generates) rather than assuming a prior invocation's
// state is still around.
// =============================================================================

mod clock;
mod collectors;
mod config;
mod dispatch;
mod engine;
mod errors;
mod indicators;
mod news_analyzer;
mod outcome_tracker;
mod risk_envelope;
mod scheduler;
mod sentiment;
mod signal_generator;
mod store;
mod types;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::collectors::news_collector::NewsCollector;
use crate::collectors::price_collector::PriceCollectorClient;
use crate::config::EngineConfig;
use crate::dispatch::{email::EmailTransport, telegram::TelegramTransport, Dispatcher};
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::sentiment::StubClassifier;
use crate::signal_generator::{generate, SignalGenerationInput};
use crate::store::{NewsStore, OhlcvStore, SignalStore, UserStore};
use crate::types::{Stock, UserPreferences};

const CONFIG_PATH: &str = "engine_config.json";

#[derive(Parser)]
#[command(name = "gpw-signal-engine", about = "GPW intraday trading-signal pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetches the latest OHLCV snapshot and news articles for every
    /// monitored stock, then classifies any newly collected articles.
    Collect,
    /// Runs the Indicator Engine (SMA/EMA/RSI/MACD/Bollinger) over each
    /// monitored stock's latest bars and logs the results.
    ComputeIndicators,
    /// Generates signals for all monitored stocks, or a single symbol.
    GenerateSignals {
        #[arg(long)]
        all_monitored: bool,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Dispatches undispatched non-hold signals to enabled channels.
    Dispatch,
    /// Resolves open signals against freshly collected bars.
    ResolveOutcomes,
    /// Prints a summary of engine state.
    Status,
}

/// Stand-in for a persisted stock catalog. There is no stock master store,
/// so monitored stocks are a small built-in list.
fn stock_catalog() -> Vec<Stock> {
    vec![
        Stock { symbol: "CDR".into(), name: "CD Projekt".into(), is_monitored: true, market: "GPW".into(), industry: "Gaming".into() },
        Stock { symbol: "PKN".into(), name: "PKN Orlen".into(), is_monitored: true, market: "GPW".into(), industry: "Energy".into() },
        Stock { symbol: "KGH".into(), name: "KGHM".into(), is_monitored: true, market: "GPW".into(), industry: "Mining".into() },
        Stock { symbol: "PKO".into(), name: "PKO Bank Polski".into(), is_monitored: true, market: "GPW".into(), industry: "Banking".into() },
        Stock { symbol: "ALE".into(), name: "Allegro".into(), is_monitored: true, market: "GPW".into(), industry: "Retail".into() },
    ]
}

fn default_user() -> UserPreferences {
    use rust_decimal_macros::dec;
    UserPreferences {
        user_id: "default".into(),
        available_capital: dec!(10000),
        target_profit_pct: None,
        max_loss_pct: None,
        min_confidence_threshold: 60,
        max_position_size_pct: dec!(0.1),
        min_position_value: dec!(100),
        min_daily_volume: 1000,
        trading_style: crate::types::TradingStyle::Moderate,
        notification_channels: vec![crate::types::Channel::Telegram],
        max_signals_per_day: 10,
        notify_on_hold: false,
        monitored_symbols: stock_catalog().into_iter().map(|s| s.symbol).collect(),
    }
}

fn load_config() -> EngineConfig {
    EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load engine config, using defaults");
        EngineConfig::default()
    })
}

async fn build_engine() -> Result<Engine, EngineError> {
    let config = load_config();
    Ok(Engine::with_users(config, Arc::new(StubClassifier), vec![default_user()]))
}

async fn run_collect(engine: &Engine) -> Result<usize, EngineError> {
    let base_url = std::env::var("GPW_PRICE_FEED_URL").unwrap_or_else(|_| "http://localhost:8089/ohlcv".into());
    let client = PriceCollectorClient::new(base_url);
    let mut total = 0;

    for stock in stock_catalog() {
        match client.fetch_snapshot(&stock.symbol).await {
            Ok(bars) => {
                for bar in bars {
                    engine
                        .ohlcv_store
                        .append(bar)
                        .await
                        .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
                    total += 1;
                }
            }
            Err(err) => {
                warn!(symbol = %stock.symbol, error = %err, "price collection failed for symbol");
                engine.record_error(err.to_string(), "transient_external");
            }
        }
    }

    let feed_urls = engine.config.read().news.feed_urls.clone();
    let news = NewsCollector::new(feed_urls);
    match news.collect(engine.news_store.as_ref(), &stock_catalog()).await {
        Ok(inserted) => info!(inserted, "news collection complete"),
        Err(err) => {
            warn!(error = %err, "news collection failed");
            engine.record_error(err.to_string(), "transient_external");
        }
    }

    match news
        .classify_pending(engine.news_store.as_ref(), engine.classifier.as_ref())
        .await
    {
        Ok(classified) => info!(classified, "news classification complete"),
        Err(err) => {
            warn!(error = %err, "news classification failed");
            engine.record_error(err.to_string(), "transient_external");
        }
    }

    Ok(total)
}

/// Runs the Indicator Engine over each monitored stock's latest bars and
/// logs the computed set. On-demand only; no state is cached between calls.
async fn run_compute_indicators(engine: &Engine) -> Result<usize, EngineError> {
    let mut computed = 0;

    for stock in stock_catalog() {
        let bars = engine
            .ohlcv_store
            .latest(&stock.symbol, 200)
            .await
            .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
        let closes: Vec<_> = bars.iter().map(|b| b.close).collect();

        if closes.is_empty() {
            continue;
        }

        let sma20 = indicators::sma::sma(&closes, 20);
        let ema26 = indicators::ema::ema(&closes, 26);
        let rsi14 = indicators::rsi::rsi(&closes, 14);
        let macd = indicators::macd::macd(&closes, 12, 26, 9);
        let bollinger = indicators::bollinger::bollinger(&closes, 20, 2.0);

        info!(
            symbol = %stock.symbol,
            bars = closes.len(),
            sma20 = ?sma20,
            ema26 = ?ema26,
            rsi14 = ?rsi14,
            macd_histogram = ?macd.map(|m| m.histogram),
            bollinger_mid = ?bollinger.map(|b| b.middle),
            "indicators computed"
        );
        computed += 1;
    }

    Ok(computed)
}

async fn run_generate(engine: &Engine, symbol_filter: Option<&str>) -> Result<usize, EngineError> {
    let users = engine
        .user_store
        .list_active()
        .await
        .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
    let config = engine.config.read().clone();
    let now = engine.clock.now();
    let session = engine.calendar.current_session(engine.clock.as_ref());
    let mut generated = 0;

    for stock in stock_catalog() {
        if let Some(filter) = symbol_filter {
            if stock.symbol != filter {
                continue;
            }
        }

        let bars = engine
            .ohlcv_store
            .latest(&stock.symbol, 200)
            .await
            .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
        let news_since = now - chrono::Duration::hours(24);
        let news_articles = engine
            .news_store
            .list_for_symbol(&stock.symbol, news_since)
            .await
            .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;

        for user in &users {
            if !user.monitored_symbols.contains(&stock.symbol) {
                continue;
            }

            let open_count = engine
                .signal_store
                .count_for_user_today(&user.user_id, session.date)
                .await
                .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;

            let input = SignalGenerationInput {
                stock: &stock,
                user,
                bars: &bars,
                recent_avg_daily_volume: bars.iter().map(|b| b.volume).sum::<i64>() / bars.len().max(1) as i64,
                news_articles: &news_articles,
                now,
                session_date: session.date,
                open_signal_count_today: open_count,
                config: &config,
            };

            if let Some(signal) = generate(&input) {
                if signal.check_price_invariants().is_err() {
                    engine.record_error(format!("invariant violation for {}", stock.symbol), "invariant_violation");
                    continue;
                }

                if signal.signal_type != crate::types::SignalType::Hold {
                    if engine
                        .signal_store
                        .find_open(&user.user_id, &stock.symbol, signal.signal_type)
                        .await
                        .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?
                        .is_some()
                    {
                        // Still-open signal of the same type already exists for this
                        // (user, stock); reject the new one rather than duplicating it.
                        continue;
                    }

                    if let Some(existing) =
                        engine.signal_store.find_open(&user.user_id, &stock.symbol, opposite(signal.signal_type)).await.map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?
                    {
                        crate::store::signal_store::supersede(engine.signal_store.as_ref(), &existing, now)
                            .await
                            .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
                    }
                }

                engine
                    .signal_store
                    .insert(signal)
                    .await
                    .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
                generated += 1;
            }
        }
    }

    Ok(generated)
}

fn opposite(signal_type: crate::types::SignalType) -> crate::types::SignalType {
    match signal_type {
        crate::types::SignalType::Buy => crate::types::SignalType::Sell,
        crate::types::SignalType::Sell => crate::types::SignalType::Buy,
        crate::types::SignalType::Hold => crate::types::SignalType::Hold,
    }
}

async fn run_dispatch(engine: &Engine) -> Result<u32, EngineError> {
    let telegram = std::env::var("TELEGRAM_BOT_TOKEN").ok().zip(std::env::var("TELEGRAM_CHAT_ID").ok());
    let telegram_transport = telegram.map(|(token, chat_id)| TelegramTransport::new(token, chat_id));

    let email_transport = match (
        std::env::var("SMTP_HOST"),
        std::env::var("SMTP_USERNAME"),
        std::env::var("SMTP_PASSWORD"),
        std::env::var("SMTP_FROM"),
        std::env::var("SMTP_TO"),
    ) {
        (Ok(host), Ok(user), Ok(pass), Ok(from), Ok(to)) => {
            EmailTransport::new(&host, user, pass, from, to).ok()
        }
        _ => None,
    };

    let dispatcher = Dispatcher {
        telegram: telegram_transport.as_ref().map(|t| t as &dyn crate::dispatch::Transport),
        email: email_transport.as_ref().map(|t| t as &dyn crate::dispatch::Transport),
    };

    dispatcher
        .run(engine.signal_store.as_ref(), engine.user_store.as_ref(), &engine.delivery_log)
        .await
        .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))
}

async fn run_resolve_outcomes(engine: &Engine) -> Result<usize, EngineError> {
    let open_signals = engine
        .signal_store
        .list_open()
        .await
        .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
    let now = engine.clock.now();
    let mut resolved = 0;

    for signal in open_signals {
        let bars = engine
            .ohlcv_store
            .latest(&signal.symbol, 500)
            .await
            .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
        let is_session_close = !engine.calendar.is_in_session(engine.clock.as_ref());

        if let Some(outcome) = outcome_tracker::resolve(&signal, &bars, is_session_close) {
            engine
                .signal_store
                .attach_outcome(&signal.id, outcome)
                .await
                .map_err(|e| EngineError::UnrecoverableInternal(e.to_string()))?;
            resolved += 1;
        }
    }

    let _ = now;
    Ok(resolved)
}

async fn run_status(engine: &Engine) -> Result<(), EngineError> {
    let open = engine.signal_store.list_open().await.unwrap_or_default();
    let undispatched = engine.signal_store.list_undispatched().await.unwrap_or_default();
    let errors = engine.recent_errors();

    println!("open signals:        {}", open.len());
    println!("undispatched:        {}", undispatched.len());
    println!("recent errors:       {}", errors.len());
    println!("in session:          {}", engine.calendar.is_in_session(engine.clock.as_ref()));

    for (kind, last_run_at, next_run_at) in engine.scheduler.statuses() {
        println!(
            "schedule {kind:?}: last_run_at={last_run_at:?} next_run_at={next_run_at}",
        );
    }

    Ok(())
}

fn exit_with(code: i32) -> ! {
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("GPW signal engine starting");

    let cli = Cli::parse();

    let engine = match build_engine().await {
        Ok(e) => e,
        Err(err) => {
            error!(error = %err, "failed to initialise engine");
            exit_with(err.exit_code());
        }
    };

    let result: Result<(), EngineError> = async {
        match cli.command {
            Command::Collect => {
                let n = run_collect(&engine).await?;
                info!(bars_collected = n, "collect complete");
            }
            Command::ComputeIndicators => {
                let n = run_compute_indicators(&engine).await?;
                info!(stocks_computed = n, "indicator computation complete");
            }
            Command::GenerateSignals { all_monitored, symbol } => {
                if !all_monitored && symbol.is_none() {
                    return Err(EngineError::Configuration(
                        "generate-signals requires --all-monitored or --symbol".into(),
                    ));
                }
                run_collect(&engine).await?;
                let n = run_generate(&engine, symbol.as_deref()).await?;
                info!(signals_generated = n, "signal generation complete");
            }
            Command::Dispatch => {
                run_collect(&engine).await?;
                run_generate(&engine, None).await?;
                let n = run_dispatch(&engine).await?;
                info!(dispatched = n, "dispatch complete");
            }
            Command::ResolveOutcomes => {
                run_collect(&engine).await?;
                let n = run_resolve_outcomes(&engine).await?;
                info!(resolved = n, "outcome resolution complete");
            }
            Command::Status => {
                run_status(&engine).await?;
            }
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => exit_with(0),
        Err(err) => {
            error!(error = %err, "run failed");
            exit_with(err.exit_code());
        }
    }
}
