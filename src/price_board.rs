//! Thread-safe latest bid/ask per venue, and the fee-adjusted net-spread estimator (C2).
//!
//! One `parking_lot::Mutex` guards the whole map, the same discipline the teacher applies
//! to its `SymbolState` (short, uncontended critical sections, no I/O under the lock).

use crate::config::{Fees, Venue};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
    pub ts_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSide {
    Bid,
    Ask,
}

/// Fee-adjusted edges for the open and close legs of a cycle, in absolute quote units.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetSpread {
    pub open_edge: f64,
    pub close_edge: f64,
}

pub struct PriceBoard {
    fees: Fees,
    inner: Mutex<HashMap<Venue, Quote>>,
}

impl PriceBoard {
    pub fn new(fees: Fees) -> Self {
        Self {
            fees,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Atomic replace. Rejects a tick with a crossed or non-positive quote rather than
    /// storing it — a bad tick from a flaky feed must not poison the board.
    pub fn update(&self, venue: Venue, bid: f64, ask: f64, ts_ms: i64) -> bool {
        if bid <= 0.0 || ask <= 0.0 || bid >= ask {
            return false;
        }
        self.inner.lock().insert(venue, Quote { bid, ask, ts_ms });
        true
    }

    pub fn get(&self, venue: Venue, side: QuoteSide) -> Option<f64> {
        let guard = self.inner.lock();
        let quote = guard.get(&venue)?;
        Some(match side {
            QuoteSide::Bid => quote.bid,
            QuoteSide::Ask => quote.ask,
        })
    }

    pub fn snapshot(&self, venue: Venue) -> Option<Quote> {
        self.inner.lock().get(&venue).copied()
    }

    /// `open_edge = dex_bid*(1-dex_maker) - cex_ask*(1+cex_taker)`
    /// `close_edge = cex_bid*(1-cex_maker) - dex_ask*(1+dex_taker)`
    ///
    /// Both venues must have a quote for either edge to be meaningful; missing a side
    /// yields `0.0` for that edge so a cold board never spuriously looks profitable.
    pub fn net_spread(&self) -> NetSpread {
        let guard = self.inner.lock();
        let dex = guard.get(&Venue::Dex).copied();
        let cex = guard.get(&Venue::Cex).copied();
        drop(guard);

        let open_edge = match (dex, cex) {
            (Some(dex), Some(cex)) => {
                dex.bid * (1.0 - self.fees.dex_maker) - cex.ask * (1.0 + self.fees.cex_taker)
            }
            _ => 0.0,
        };
        let close_edge = match (dex, cex) {
            (Some(dex), Some(cex)) => {
                cex.bid * (1.0 - self.fees.cex_maker) - dex.ask * (1.0 + self.fees.dex_taker)
            }
            _ => 0.0,
        };

        NetSpread {
            open_edge,
            close_edge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fees() -> Fees {
        Fees {
            cex_maker: 0.0002,
            cex_taker: 0.0004,
            dex_maker: 0.0001,
            dex_taker: 0.0005,
        }
    }

    #[test]
    fn rejects_crossed_quote() {
        let board = PriceBoard::new(fees());
        assert!(!board.update(Venue::Cex, 100.0, 99.0, 0));
        assert!(board.get(Venue::Cex, QuoteSide::Bid).is_none());
    }

    #[test]
    fn s1_happy_open_edge_is_positive() {
        // From spec S1: cex_ask=30000, dex_bid=30020, fees 0.02% maker / 0.04% taker.
        let board = PriceBoard::new(Fees {
            cex_maker: 0.0002,
            cex_taker: 0.0004,
            dex_maker: 0.0002,
            dex_taker: 0.0004,
        });
        board.update(Venue::Dex, 30020.0, 30021.0, 0);
        board.update(Venue::Cex, 29999.0, 30000.0, 0);
        let spread = board.net_spread();
        assert!(spread.open_edge > 0.0, "expected positive open edge, got {}", spread.open_edge);
    }

    #[test]
    fn s6_zero_edge_never_exceeds_strict_threshold() {
        let board = PriceBoard::new(fees());
        board.update(Venue::Dex, 100.0, 100.0001, 0);
        board.update(Venue::Cex, 100.0, 100.0001, 0);
        let spread = board.net_spread();
        // Strict ">" threshold comparison lives in strategy.rs; here we just assert the
        // edge with non-trivial fees is not positive for an already-tight book.
        assert!(spread.open_edge <= 0.0);
    }

    #[test]
    fn missing_side_yields_zero_edge() {
        let board = PriceBoard::new(fees());
        board.update(Venue::Dex, 100.0, 101.0, 0);
        let spread = board.net_spread();
        assert_eq!(spread.open_edge, 0.0);
        assert_eq!(spread.close_edge, 0.0);
    }
}
