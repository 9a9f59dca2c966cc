//! Uniform place/cancel over both venues (C4).
//!
//! `VenueRouter` holds one `ExecutionAdapter` per venue and dispatches the uniform
//! calls from `spec.md` §4.3 onto whichever adapter matches the order's venue, with
//! precision rounding applied per the maker/taker passive/aggressive rule before the
//! request ever reaches the adapter. Grounded on `vault/execution.rs`'s
//! `PolymarketClobAdapter::place_order` call shape.

use crate::config::Venue;
use crate::error::VenueError;
use crate::venues::{
    Balance, CancelRequest, ExecutionAdapter, OrderAck, OrderRequest, Position, Side, SymbolInfo,
    TimeInForce,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct VenueRouter {
    adapters: HashMap<Venue, Arc<dyn ExecutionAdapter>>,
    symbol_info: parking_lot::Mutex<HashMap<Venue, SymbolInfo>>,
}

impl VenueRouter {
    pub fn new(cex: Arc<dyn ExecutionAdapter>, dex: Arc<dyn ExecutionAdapter>) -> Self {
        let mut adapters: HashMap<Venue, Arc<dyn ExecutionAdapter>> = HashMap::new();
        adapters.insert(Venue::Cex, cex);
        adapters.insert(Venue::Dex, dex);
        Self {
            adapters,
            symbol_info: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn adapter(&self, venue: Venue) -> Result<&Arc<dyn ExecutionAdapter>, VenueError> {
        self.adapters
            .get(&venue)
            .ok_or_else(|| VenueError::Transport(format!("no adapter registered for {venue}")))
    }

    /// Loads and caches `SymbolInfo` for `venue`/`symbol`, fetching once and reusing
    /// the cached value on subsequent calls. Call with `force=true` after a
    /// filter-reject to refresh (spec.md §9 design note).
    pub async fn symbol_info(
        &self,
        venue: Venue,
        symbol: &str,
        force: bool,
    ) -> Result<SymbolInfo, VenueError> {
        if !force {
            if let Some(info) = self.symbol_info.lock().get(&venue).copied() {
                return Ok(info);
            }
        }
        let info = self.adapter(venue)?.symbol_info(symbol).await?;
        self.symbol_info.lock().insert(venue, info);
        Ok(info)
    }

    /// Places a maker (passive) order: price rounded towards the passive side so the
    /// order never crosses the book, quantity rounded down to lot size.
    pub async fn place_maker(
        &self,
        venue: Venue,
        symbol: &str,
        side: Side,
        qty: f64,
        price: f64,
        client_order_id: String,
    ) -> Result<OrderAck, VenueError> {
        let info = self.symbol_info(venue, symbol, false).await?;
        let rounded_qty = info.round_qty_down(qty);
        if rounded_qty <= 0.0 {
            return Err(VenueError::FilterFailure("qty rounds to zero".to_string()));
        }
        let rounded_price = info.round_price_passive(price, side);
        let req = OrderRequest {
            client_order_id,
            symbol: symbol.to_string(),
            side,
            qty: rounded_qty,
            price: Some(rounded_price),
            quote_amount: None,
            tif: TimeInForce::Gtc,
        };
        self.place(venue, req).await
    }

    /// Places a taker (aggressive) order: price rounded towards the aggressive side
    /// so it is guaranteed to cross, quantity rounded down to lot size.
    pub async fn place_taker(
        &self,
        venue: Venue,
        symbol: &str,
        side: Side,
        qty: f64,
        price: f64,
        client_order_id: String,
    ) -> Result<OrderAck, VenueError> {
        let info = self.symbol_info(venue, symbol, false).await?;
        let rounded_qty = info.round_qty_down(qty);
        if rounded_qty <= 0.0 {
            return Err(VenueError::FilterFailure("qty rounds to zero".to_string()));
        }
        let rounded_price = info.round_price_aggressive(price, side);
        let req = OrderRequest {
            client_order_id,
            symbol: symbol.to_string(),
            side,
            qty: rounded_qty,
            price: Some(rounded_price),
            quote_amount: None,
            tif: TimeInForce::Ioc,
        };
        self.place(venue, req).await
    }

    /// Places a market order for `qty` (used for the final chase-to-market fallback).
    pub async fn place_market(
        &self,
        venue: Venue,
        symbol: &str,
        side: Side,
        qty: f64,
        client_order_id: String,
    ) -> Result<OrderAck, VenueError> {
        let info = self.symbol_info(venue, symbol, false).await?;
        let rounded_qty = info.round_qty_down(qty);
        if rounded_qty <= 0.0 {
            return Err(VenueError::FilterFailure("qty rounds to zero".to_string()));
        }
        let req = OrderRequest {
            client_order_id,
            symbol: symbol.to_string(),
            side,
            qty: rounded_qty,
            price: None,
            quote_amount: None,
            tif: TimeInForce::Ioc,
        };
        self.place(venue, req).await
    }

    async fn place(&self, venue: Venue, req: OrderRequest) -> Result<OrderAck, VenueError> {
        info!(%venue, symbol = %req.symbol, qty = req.qty, price = ?req.price, "placing order");
        let result = self.adapter(venue)?.place_order(req).await;
        if let Err(ref e) = result {
            warn!(%venue, error = %e, "order placement failed");
        }
        result
    }

    pub async fn cancel(&self, venue: Venue, req: CancelRequest) -> Result<OrderAck, VenueError> {
        info!(%venue, symbol = %req.symbol, order_id = ?req.order_id, "canceling order");
        self.adapter(venue)?.cancel_order(req).await
    }

    pub async fn query_order(
        &self,
        venue: Venue,
        symbol: &str,
        order_id: &str,
    ) -> Result<OrderAck, VenueError> {
        self.adapter(venue)?.query_order(symbol, order_id).await
    }

    pub async fn get_balances(&self, venue: Venue) -> Result<Vec<Balance>, VenueError> {
        self.adapter(venue)?.get_balances().await
    }

    pub async fn get_positions(&self, venue: Venue) -> Result<Vec<Position>, VenueError> {
        self.adapter(venue)?.get_positions().await
    }
}
