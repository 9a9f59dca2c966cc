//! In-memory engine counters (C11).
//!
//! Grounded on `scrapers/binance_book_ticker.rs`'s `FeedMetrics`: plain atomics, no
//! external exporter. Logged periodically rather than scraped, since an outward-facing
//! metrics surface is out of scope here.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Default)]
pub struct EngineMetrics {
    pub cycles_completed: AtomicU64,
    pub chase_reposts: AtomicU64,
    pub chase_to_market: AtomicU64,
    pub cancel_races: AtomicU64,
    pub reconnects: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_snapshot(&self) {
        info!(
            cycles_completed = self.cycles_completed.load(Ordering::Relaxed),
            chase_reposts = self.chase_reposts.load(Ordering::Relaxed),
            chase_to_market = self.chase_to_market.load(Ordering::Relaxed),
            cancel_races = self.cancel_races.load(Ordering::Relaxed),
            reconnects = self.reconnects.load(Ordering::Relaxed),
            "engine metrics snapshot"
        );
    }
}
