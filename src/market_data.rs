//! Market-data adapter (C3): drains parsed book deltas from both venue clients,
//! keeps a lock-free latest-book snapshot per venue, and feeds the PriceBoard.
//!
//! CEX ticks are the sampling clock (spec.md §4.2): only a CEX update triggers the
//! strategy's signal check. DEX updates are silent — they only refresh the board so
//! the next CEX tick sees a fresh DEX quote too.

use crate::book::L2Book;
use crate::config::Venue;
use crate::price_board::PriceBoard;
use crate::strategy::Strategy;
use crate::venues::BookDelta;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct MarketDataHub {
    price_board: Arc<PriceBoard>,
    strategy: Arc<Strategy>,
    latest_cex: ArcSwap<Option<L2Book>>,
    latest_dex: ArcSwap<Option<L2Book>>,
}

impl MarketDataHub {
    pub fn new(price_board: Arc<PriceBoard>, strategy: Arc<Strategy>) -> Self {
        Self {
            price_board,
            strategy,
            latest_cex: ArcSwap::new(Arc::new(None)),
            latest_dex: ArcSwap::new(Arc::new(None)),
        }
    }

    pub fn latest(&self, venue: Venue) -> Option<L2Book> {
        match venue {
            Venue::Cex => (**self.latest_cex.load()).clone(),
            Venue::Dex => (**self.latest_dex.load()).clone(),
        }
    }

    /// Drains `rx` forever, applying each delta. Intended to be spawned once per
    /// venue's market-data task funneling into a shared channel.
    pub async fn run(&self, mut rx: mpsc::Receiver<BookDelta>) {
        while let Some(delta) = rx.recv().await {
            self.apply(delta).await;
        }
    }

    async fn apply(&self, delta: BookDelta) {
        let BookDelta { venue, book } = delta;
        let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) else {
            return;
        };

        match venue {
            Venue::Cex => {
                self.latest_cex.store(Arc::new(Some(book)));
                self.price_board
                    .update(Venue::Cex, bid.price, ask.price, chrono::Utc::now().timestamp_millis());
                self.strategy.on_signal_tick().await;
            }
            Venue::Dex => {
                self.latest_dex.store(Arc::new(Some(book)));
                self.price_board
                    .update(Venue::Dex, bid.price, ask.price, chrono::Utc::now().timestamp_millis());
                debug!(venue = %Venue::Dex, "silent book update, no signal check");
            }
        }
    }
}
