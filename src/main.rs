//! Process entry point (C12): loads configuration, wires together the market-data
//! hub, venue clients, strategy, and tick scheduler, then awaits a graceful shutdown
//! signal.
//!
//! Tracing init follows the teacher's `main.rs` (`tracing_subscriber` with an
//! `EnvFilter` layer); the signal-composed graceful shutdown is new — the teacher's
//! own `main.rs` is a long-running axum server with no explicit SIGINT/SIGTERM
//! handling, so this is grounded directly on `tokio::signal`, already pulled in via
//! the `full` feature the teacher depends on.

use anyhow::Result;
use clap::Parser;
use hedgebridge::config::{Cli, Config};
use hedgebridge::executor::VenueRouter;
use hedgebridge::market_data::MarketDataHub;
use hedgebridge::metrics::EngineMetrics;
use hedgebridge::price_board::PriceBoard;
use hedgebridge::reconcile;
use hedgebridge::scheduler;
use hedgebridge::strategy::Strategy;
use hedgebridge::user_stream::{correlate, UserStreamEvent, VenueUserEvent};
use hedgebridge::venues::binance::BinanceFuturesClient;
use hedgebridge::venues::hyperliquid::HyperliquidClient;
use hedgebridge::venues::{BookDelta, ExecutionAdapter, VenueMarketDataSource};
use hedgebridge::Venue;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.env_file {
        dotenv::from_path(path).ok();
    }

    let filter = EnvFilter::try_new(cli.log_level.as_deref().unwrap_or("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        cex_symbol = %config.cex_symbol,
        dex_symbol = %config.dex_symbol,
        testnet = config.testnet,
        "starting hedgebridge"
    );

    let price_board = Arc::new(PriceBoard::new(config.fees));
    let metrics = Arc::new(EngineMetrics::new());

    let cex_client = Arc::new(BinanceFuturesClient::new(
        config.cex_ws_url.clone(),
        config.cex_rest_url.clone(),
        config.cex_symbol.clone(),
        config.cex_api_key.clone(),
        config.cex_secret.clone(),
    ));
    let dex_client = Arc::new(HyperliquidClient::new(
        config.dex_ws_url.clone(),
        config.dex_rest_url.clone(),
        config.dex_symbol.clone(),
        config.dex_wallet.clone(),
        config.dex_private_key.clone(),
    ));

    let router = Arc::new(VenueRouter::new(
        cex_client.clone() as Arc<dyn ExecutionAdapter>,
        dex_client.clone() as Arc<dyn ExecutionAdapter>,
    ));

    let reconciliation = reconcile::reconcile(&config, &router).await?;
    info!(
        initial_state = %reconciliation.initial_state,
        held_qty = reconciliation.held_qty,
        "startup reconciliation complete"
    );

    let strategy = Arc::new(Strategy::new(
        config.clone(),
        price_board.clone(),
        router.clone(),
        metrics.clone(),
        reconciliation.initial_state,
        reconciliation.held_qty,
    ));

    let hub = Arc::new(MarketDataHub::new(price_board.clone(), strategy.clone()));

    let (book_tx, book_rx) = mpsc::channel::<BookDelta>(4096);

    let hub_task = {
        let hub = hub.clone();
        tokio::spawn(async move { hub.run(book_rx).await })
    };

    let cex_md_task = {
        let client = cex_client.clone();
        let tx = book_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = client.run(tx).await {
                error!(error = %e, venue = %Venue::Cex, "market data task exited");
            }
        })
    };

    let dex_md_task = {
        let client = dex_client.clone();
        let tx = book_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = client.run(tx).await {
                error!(error = %e, venue = %Venue::Dex, "market data task exited");
            }
        })
    };
    drop(book_tx);

    let (user_tx, mut user_rx) = mpsc::channel::<VenueUserEvent>(1024);

    let cex_user_task = {
        let client = cex_client.clone();
        let tx = user_tx.clone();
        tokio::spawn(async move {
            let (inner_tx, mut inner_rx) = mpsc::channel::<UserStreamEvent>(1024);
            let client_for_stream = client.clone();
            let forwarder = tokio::spawn(async move {
                if let Err(e) = client_for_stream.run_user_stream(inner_tx).await {
                    error!(error = %e, venue = %Venue::Cex, "user stream task exited");
                }
            });
            while let Some(event) = inner_rx.recv().await {
                if tx.send(VenueUserEvent { venue: Venue::Cex, event }).await.is_err() {
                    break;
                }
            }
            forwarder.abort();
        })
    };

    let dex_user_task = {
        let client = dex_client.clone();
        let tx = user_tx.clone();
        tokio::spawn(async move {
            let (inner_tx, mut inner_rx) = mpsc::channel::<UserStreamEvent>(1024);
            let client_for_stream = client.clone();
            let forwarder = tokio::spawn(async move {
                if let Err(e) = client_for_stream.run_user_stream(inner_tx).await {
                    error!(error = %e, venue = %Venue::Dex, "user stream task exited");
                }
            });
            while let Some(event) = inner_rx.recv().await {
                if tx.send(VenueUserEvent { venue: Venue::Dex, event }).await.is_err() {
                    break;
                }
            }
            forwarder.abort();
        })
    };
    drop(user_tx);

    let dispatch_task = {
        let strategy = strategy.clone();
        tokio::spawn(async move {
            while let Some(event) = user_rx.recv().await {
                let expected = strategy.active_order_id().await;
                if correlate(expected.as_deref(), &event).is_some() {
                    strategy.on_user_event(event).await;
                }
            }
        })
    };

    let scheduler_task = {
        let strategy = strategy.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move { scheduler::run(strategy, metrics).await })
    };

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping");

    scheduler_task.abort();
    cex_md_task.abort();
    dex_md_task.abort();
    cex_user_task.abort();
    dex_user_task.abort();
    dispatch_task.abort();
    hub_task.abort();

    strategy.cancel_any_live_order().await;
    info!("shutdown complete");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
