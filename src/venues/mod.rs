//! Venue abstractions: the uniform shapes and traits both venue clients implement.
//!
//! Grounded on `vault/execution.rs`'s `ExecutionAdapter` trait and `OrderRequest`/
//! `OrderAck` pair, generalized from a single Polymarket CLOB adapter to two venues
//! (a CEX futures venue and a DEX perp venue) behind the same trait.

pub mod binance;
pub mod hyperliquid;

use crate::book::L2Book;
use crate::config::Venue;
use crate::error::VenueError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

/// Precision metadata fetched once at startup and cached; re-fetched on a reject
/// caused by a filter violation (spec design note §9).
#[derive(Debug, Clone, Copy)]
pub struct SymbolInfo {
    pub tick_size: f64,
    pub lot_size: f64,
    pub min_notional: f64,
}

impl SymbolInfo {
    /// Rounds `qty` down to the nearest lot. Used for taker legs and for the
    /// passive-side rounding of a maker qty (rounding down never crosses the book).
    pub fn round_qty_down(&self, qty: f64) -> f64 {
        if self.lot_size <= 0.0 {
            return qty;
        }
        (qty / self.lot_size).floor() * self.lot_size
    }

    /// Rounds `price` towards the passive side for a maker order: down for a buy
    /// (never bid above the intended price), up for a sell.
    pub fn round_price_passive(&self, price: f64, side: Side) -> f64 {
        if self.tick_size <= 0.0 {
            return price;
        }
        match side {
            Side::Buy => (price / self.tick_size).floor() * self.tick_size,
            Side::Sell => (price / self.tick_size).ceil() * self.tick_size,
        }
    }

    /// Rounds `price` towards the aggressive side for a taker order: up for a buy
    /// (willing to pay through), down for a sell.
    pub fn round_price_aggressive(&self, price: f64, side: Side) -> f64 {
        if self.tick_size <= 0.0 {
            return price;
        }
        match side {
            Side::Buy => (price / self.tick_size).ceil() * self.tick_size,
            Side::Sell => (price / self.tick_size).floor() * self.tick_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: f64,
    pub price: Option<f64>,
    pub quote_amount: Option<f64>,
    pub tif: TimeInForce,
}

#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: String,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub filled_qty: f64,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub symbol: String,
    pub order_id: Option<String>,
    pub client_order_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub symbol: String,
    /// Positive for long, negative for short.
    pub signed_qty: f64,
}

/// A venue-agnostic top-of-book delta, the output of C3's per-venue parsing.
#[derive(Debug, Clone)]
pub struct BookDelta {
    pub venue: Venue,
    pub book: L2Book,
}

/// Implemented by each venue's WebSocket market-data client.
#[async_trait]
pub trait VenueMarketDataSource: Send + Sync {
    async fn run(&self, tx: tokio::sync::mpsc::Sender<BookDelta>) -> Result<(), VenueError>;
}

/// Implemented by each venue's signed REST client. `TradeExecutor`/`VenueRouter` (C4)
/// dispatch the uniform `place_order`/`cancel_order` calls from `spec.md` §4.3 onto
/// whichever adapter matches the order's venue.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn place_order(&self, req: OrderRequest) -> Result<OrderAck, VenueError>;
    async fn cancel_order(&self, req: CancelRequest) -> Result<OrderAck, VenueError>;
    async fn query_order(&self, symbol: &str, order_id: &str) -> Result<OrderAck, VenueError>;
    async fn get_balances(&self) -> Result<Vec<Balance>, VenueError>;
    async fn get_positions(&self) -> Result<Vec<Position>, VenueError>;
    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, VenueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_qty_down_floors_to_lot() {
        let info = SymbolInfo {
            tick_size: 0.1,
            lot_size: 0.001,
            min_notional: 5.0,
        };
        assert_eq!(info.round_qty_down(0.0236), 0.023);
    }

    #[test]
    fn round_price_passive_never_crosses() {
        let info = SymbolInfo {
            tick_size: 0.5,
            lot_size: 0.001,
            min_notional: 5.0,
        };
        // Buy maker should round down, never bidding above the observed price.
        assert_eq!(info.round_price_passive(100.3, Side::Buy), 100.0);
        // Sell maker should round up, never offering below the observed price.
        assert_eq!(info.round_price_passive(100.3, Side::Sell), 100.5);
    }

    #[test]
    fn round_price_aggressive_crosses_to_fill() {
        let info = SymbolInfo {
            tick_size: 0.5,
            lot_size: 0.001,
            min_notional: 5.0,
        };
        assert_eq!(info.round_price_aggressive(100.3, Side::Buy), 100.5);
        assert_eq!(info.round_price_aggressive(100.3, Side::Sell), 100.0);
    }
}
