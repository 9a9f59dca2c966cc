//! Tick scheduler (C8): fires every second, briefly holding the strategy mutex to
//! check for a timed-out active order or re-evaluate a Condition-state signal.
//!
//! Grounded on `scrapers/binance_session.rs`'s ping/timeout-check interval loop shape.

use crate::metrics::EngineMetrics;
use crate::strategy::Strategy;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const METRICS_LOG_EVERY: u64 = 30;

pub async fn run(strategy: Arc<Strategy>, metrics: Arc<EngineMetrics>) {
    let mut ticker = interval(TICK_INTERVAL);
    let mut tick_count: u64 = 0;

    loop {
        ticker.tick().await;
        strategy.on_timeout_tick().await;

        tick_count += 1;
        if tick_count % METRICS_LOG_EVERY == 0 {
            metrics.log_snapshot();
        }
    }
}
