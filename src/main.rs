//! Bitso triangular arbitrage engine entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tri_arb::api::{create_router, AppState};
use tri_arb::arbitrage::{
    diagnose, read_limits, read_snapshot, size_legs, Orchestrator, TriangleLimits,
};
use tri_arb::clock::TokioClock;
use tri_arb::config::Config;
use tri_arb::exchange::{BitsoClient, DryRunExchange, ExchangeClient};
use tri_arb::market::Triangle;
use tri_arb::metrics;
use tri_arb::notify::LogNotifier;
use tri_arb::trading::value_balances;
use tri_arb::BotError;

/// Triangular arbitrage engine for Bitso.
#[derive(Parser, Debug)]
#[command(name = "tri-arb")]
#[command(about = "Detects and trades triangular arbitrage across three Bitso books")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Place real orders (overrides DRY_RUN).
    #[arg(long)]
    production: bool,

    /// HTTP server port for health/status (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the arbitrage engine loop (default).
    Run {
        /// Place real orders (overrides DRY_RUN).
        #[arg(long)]
        production: bool,

        /// HTTP server port for health/status (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Show balances and open orders for the triangle's assets.
    CheckBalance,

    /// Read the books once and print both route factors.
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("tri_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let result = match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckBalance) => cmd_check_balance().await,
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::Run { production, port }) => cmd_run(production, port).await,
        None => cmd_run(args.production, args.port).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Exiting with error");
    }
    result
}

/// Load and validate configuration.
fn load_config() -> Result<(Config, Triangle), BotError> {
    let config = Config::load()?;
    config.validate().map_err(BotError::InvalidConfig)?;
    let triangle = config.triangle().map_err(BotError::InvalidConfig)?;
    Ok((config, triangle))
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRI-ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let triangle = config.triangle().map_err(|e| anyhow::anyhow!(e))?;

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Triangle: {}", triangle.label());
    println!("  Anchor Asset: {}", triangle.anchor());
    println!("  Trade Limit: {}", config.trade_limit);
    println!("  Balance Haircut: {}", config.balance_haircut);
    println!("  Rounding Precision: {}", config.rounding_precision);
    println!("  Poll Interval: {}s", config.poll_interval_secs);
    println!("  Idle Delay: {}s", config.idle_delay_secs);
    println!("  Trade Cooldown: {}s", config.trade_cooldown_secs);
    println!("  Dry Run: {}", config.dry_run);
    println!("  API: {}", config.bitso_api_url);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Show balances valued in the anchor asset, and open orders.
async fn cmd_check_balance() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TRI-ARB - BALANCE CHECK");
    println!("======================================================================");

    let (config, triangle) = load_config()?;
    println!("Host: {}", config.bitso_api_url);

    print!("\n1. Creating client... ");
    let client = BitsoClient::new(&config)?;
    println!("OK");

    print!("\n2. Getting balances... ");
    match client.get_balances(&triangle.assets().to_vec()).await {
        Ok(balances) => {
            println!("OK");
            match value_balances(&client, &triangle, &balances).await {
                Ok(valuation) => {
                    for asset in &valuation.assets {
                        println!(
                            "   {}: {} @ {} = {} {}",
                            asset.asset, asset.balance, asset.price, asset.value, valuation.anchor
                        );
                    }
                    println!("   Total: {} {}", valuation.total(), valuation.anchor);
                }
                Err(e) => {
                    for asset in triangle.assets() {
                        println!("   {}: {}", asset, balances.available(asset));
                    }
                    println!("   Valuation unavailable: {}", e);
                }
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    print!("\n3. Getting open orders... ");
    match client.list_open_orders().await {
        Ok(orders) => {
            println!("OK");
            println!("   Open orders: {}", orders.len());
            for order in orders.iter().take(5) {
                println!(
                    "   - {} {} {} @ {} ({} of {} open)",
                    order.order_id,
                    order.side,
                    order.pair,
                    order.price,
                    order.unfilled_amount,
                    order.original_amount
                );
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("BALANCE CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Read the triangle once and report what the engine would do.
async fn cmd_scan() -> anyhow::Result<()> {
    let (config, triangle) = load_config()?;
    let client = BitsoClient::new(&config)?;

    let limits = read_limits(&client, &triangle).await?;
    let assets = triangle.assets().to_vec();
    let (snapshot, balances) = tokio::try_join!(
        read_snapshot(&client, &triangle),
        client.get_balances(&assets),
    )?;

    let diagnosis = diagnose(&triangle, &snapshot);
    println!("Snapshot at {}", snapshot.fetched_at);
    println!("{}", diagnosis);

    if let Some(direction) = diagnosis.decision.direction {
        match size_legs(
            &triangle,
            direction,
            &snapshot.books,
            &balances,
            &limits,
            &config.sizing_params(),
        ) {
            Ok(intents) => {
                for intent in &intents {
                    println!(
                        "  would {} {} {} @ {}",
                        intent.side, intent.amount, intent.pair, intent.price
                    );
                }
            }
            Err(e) => println!("  rejected: {}", e),
        }
    }

    Ok(())
}

/// Run the engine loop.
async fn cmd_run(production: bool, port: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if production {
        config.dry_run = false;
    }
    if let Some(port) = port {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(BotError::InvalidConfig(e).into());
    }
    let triangle = config.triangle().map_err(BotError::InvalidConfig)?;

    info!("Configuration loaded successfully");
    info!("Mode: {}", if config.dry_run { "DRY RUN" } else { "LIVE TRADING" });
    info!("Triangle: {} (anchor {})", triangle.label(), triangle.anchor());
    info!("Trade limit: {}", config.trade_limit);

    // Initialize metrics
    if config.metrics_enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Prometheus exporter listening on {}", addr);
    }
    metrics::init_metrics();

    let app_state = AppState::new(config.dry_run);
    app_state.set_triangle(triangle.label()).await;

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let client = BitsoClient::new(&config)?;
    if config.dry_run {
        run_engine(DryRunExchange::new(client), &config, triangle, app_state).await
    } else {
        warn!("LIVE TRADING: orders will be placed on {}", config.bitso_api_url);
        run_engine(client, &config, triangle, app_state).await
    }
}

async fn run_engine<E: ExchangeClient>(
    exchange: E,
    config: &Config,
    triangle: Triangle,
    app_state: AppState,
) -> anyhow::Result<()> {
    let limits: TriangleLimits = read_limits(&exchange, &triangle).await?;
    for (pair, bounds) in triangle.pairs().iter().zip(limits.0.iter()) {
        info!(
            pair = %pair,
            minimum = %bounds.minimum_amount,
            maximum = %bounds.maximum_amount,
            "Loaded trade limits"
        );
    }

    let mut engine = Orchestrator::new(
        exchange,
        LogNotifier::new(config.recipient()),
        TokioClock,
        triangle,
        limits,
        config.engine_settings(),
    )
    .with_status(app_state.clone());

    app_state.set_ready(true);

    let outcome = tokio::select! {
        result = engine.run() => Some(result),
        _ = shutdown_signal() => None,
    };
    app_state.set_ready(false);

    match outcome {
        Some(Ok(summary)) => {
            info!(
                trades = summary.trades_executed,
                cycles = summary.cycles,
                "Run complete"
            );
            Ok(())
        }
        Some(Err(e)) => Err(BotError::from(e).into()),
        None => {
            info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
