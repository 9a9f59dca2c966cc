//! The two-leg open/close strategy state machine (C5) — the crux of the system.
//!
//! Exactly one state at a time; every transition runs while holding the strategy
//! mutex, including the synchronous call into the venue router for placement/cancel,
//! so an order is registered in the active-order slot before any fill event for it
//! can be processed (spec.md §5). Because that call is a network round trip, the
//! mutex here is `tokio::sync::Mutex` rather than `parking_lot` — the only named
//! mutex in the system that must be held across an `.await`.
//!
//! The priority-ordered decision shape (check timeout/cancel first, then evaluate a
//! fresh signal) is grounded on `other_examples`'s arbitrage-bot `decision.rs`, which
//! structures its top-level `decide()` the same way: stale-order handling before any
//! new placement.

use crate::config::{Config, Venue};
use crate::executor::VenueRouter;
use crate::metrics::EngineMetrics;
use crate::price_board::PriceBoard;
use crate::user_stream::{UserStreamEvent, VenueUserEvent};
use crate::venues::Side;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    OpenCondition,
    OpenLeg1Waiting,
    OpenLeg1Canceling,
    OpenLeg2Waiting,
    OpenLeg2Chasing,
    CloseCondition,
    CloseLeg1Waiting,
    CloseLeg1Canceling,
    CloseLeg2Waiting,
    CloseLeg2Chasing,
}

impl std::fmt::Display for StrategyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyState::OpenCondition => "OPEN_CONDITION",
            StrategyState::OpenLeg1Waiting => "OPEN_LEG1_WAITING",
            StrategyState::OpenLeg1Canceling => "OPEN_LEG1_CANCELING",
            StrategyState::OpenLeg2Waiting => "OPEN_LEG2_WAITING",
            StrategyState::OpenLeg2Chasing => "OPEN_LEG2_CHASING",
            StrategyState::CloseCondition => "CLOSE_CONDITION",
            StrategyState::CloseLeg1Waiting => "CLOSE_LEG1_WAITING",
            StrategyState::CloseLeg1Canceling => "CLOSE_LEG1_CANCELING",
            StrategyState::CloseLeg2Waiting => "CLOSE_LEG2_WAITING",
            StrategyState::CloseLeg2Chasing => "CLOSE_LEG2_CHASING",
        };
        write!(f, "{s}")
    }
}

impl StrategyState {
    pub fn is_condition(&self) -> bool {
        matches!(self, StrategyState::OpenCondition | StrategyState::CloseCondition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Leg1,
    Leg2,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Leg1 => write!(f, "L1"),
            Leg::Leg2 => write!(f, "L2"),
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveOrderSlot {
    venue: Venue,
    leg: Leg,
    side: Side,
    order_id: Option<String>,
    client_id: String,
    price: f64,
    qty_total: f64,
    qty_filled: f64,
    placed_at: Instant,
    chase_attempt: u32,
}

struct StrategyInner {
    state: StrategyState,
    slot: Option<ActiveOrderSlot>,
    held_qty: f64,
    leg1_filled_qty: f64,
    cycle_qty: f64,
}

pub struct Strategy {
    inner: Mutex<StrategyInner>,
    config: Config,
    price_board: Arc<PriceBoard>,
    router: Arc<VenueRouter>,
    metrics: Arc<EngineMetrics>,
    cycle_seq: AtomicU64,
}

impl Strategy {
    pub fn new(
        config: Config,
        price_board: Arc<PriceBoard>,
        router: Arc<VenueRouter>,
        metrics: Arc<EngineMetrics>,
        initial_state: StrategyState,
        initial_held_qty: f64,
    ) -> Self {
        Self {
            inner: Mutex::new(StrategyInner {
                state: initial_state,
                slot: None,
                held_qty: initial_held_qty,
                leg1_filled_qty: 0.0,
                cycle_qty: 0.0,
            }),
            config,
            price_board,
            router,
            metrics,
            cycle_seq: AtomicU64::new(0),
        }
    }

    pub async fn current_state(&self) -> StrategyState {
        self.inner.lock().await.state
    }

    pub async fn held_qty(&self) -> f64 {
        self.inner.lock().await.held_qty
    }

    /// The order id of the currently active slot, if any. Used by C6 to correlate
    /// an incoming user-stream event before it is handed to `on_user_event`.
    pub async fn active_order_id(&self) -> Option<String> {
        self.inner.lock().await.slot.as_ref().and_then(|s| s.order_id.clone())
    }

    fn next_client_id(&self, leg: Leg, venue: Venue) -> String {
        let seq = self.cycle_seq.fetch_add(1, Ordering::Relaxed);
        format!("{:06}-{}-{}", seq, leg, venue)
    }

    /// Invoked by C3 on every CEX tick (spec.md §4.2) and by C8's Condition-state
    /// re-evaluation (spec.md §4.7). Only fires a placement from a Condition state.
    pub async fn on_signal_tick(&self) {
        let mut guard = self.inner.lock().await;
        match guard.state {
            StrategyState::OpenCondition => self.try_open(&mut guard).await,
            StrategyState::CloseCondition => self.try_close(&mut guard).await,
            _ => {}
        }
    }

    async fn try_open(&self, guard: &mut StrategyInner) {
        let spread = self.price_board.net_spread();
        if !(spread.open_edge > self.config.min_spread_threshold) {
            return;
        }
        let Some(dex_bid) = self.price_board.get(Venue::Dex, crate::price_board::QuoteSide::Bid) else {
            return;
        };

        let cycle_qty = self.config.cycle_qty;
        let client_id = self.next_client_id(Leg::Leg1, Venue::Dex);
        match self
            .router
            .place_maker(Venue::Dex, &self.config.dex_symbol, Side::Buy, cycle_qty, dex_bid, client_id.clone())
            .await
        {
            Ok(ack) => {
                guard.cycle_qty = cycle_qty;
                guard.slot = Some(ActiveOrderSlot {
                    venue: Venue::Dex,
                    leg: Leg::Leg1,
                    side: Side::Buy,
                    order_id: Some(ack.order_id),
                    client_id,
                    price: dex_bid,
                    qty_total: cycle_qty,
                    qty_filled: ack.filled_qty,
                    placed_at: Instant::now(),
                    chase_attempt: 0,
                });
                guard.state = StrategyState::OpenLeg1Waiting;
                info!(state = %guard.state, "opened leg1 DEX maker buy");
            }
            Err(e) => {
                warn!(error = %e, "leg1 placement failed, staying in OpenCondition");
            }
        }
    }

    async fn try_close(&self, guard: &mut StrategyInner) {
        let spread = self.price_board.net_spread();
        if !(spread.close_edge > self.config.min_spread_threshold) {
            return;
        }
        let Some(dex_ask) = self.price_board.get(Venue::Dex, crate::price_board::QuoteSide::Ask) else {
            return;
        };

        let cycle_qty = guard.held_qty.min(self.config.cycle_qty);
        if cycle_qty <= 0.0 {
            return;
        }
        let client_id = self.next_client_id(Leg::Leg1, Venue::Dex);
        match self
            .router
            .place_maker(Venue::Dex, &self.config.dex_symbol, Side::Sell, cycle_qty, dex_ask, client_id.clone())
            .await
        {
            Ok(ack) => {
                guard.cycle_qty = cycle_qty;
                guard.slot = Some(ActiveOrderSlot {
                    venue: Venue::Dex,
                    leg: Leg::Leg1,
                    side: Side::Sell,
                    order_id: Some(ack.order_id),
                    client_id,
                    price: dex_ask,
                    qty_total: cycle_qty,
                    qty_filled: ack.filled_qty,
                    placed_at: Instant::now(),
                    chase_attempt: 0,
                });
                guard.state = StrategyState::CloseLeg1Waiting;
                info!(state = %guard.state, "opened close-leg1 DEX maker sell");
            }
            Err(e) => {
                warn!(error = %e, "close leg1 placement failed, staying in CloseCondition");
            }
        }
    }

    /// Invoked by C8 every second: times out the active order if one is outstanding
    /// too long, otherwise re-evaluates the signal from a Condition state.
    pub async fn on_timeout_tick(&self) {
        let mut guard = self.inner.lock().await;

        if guard.state.is_condition() {
            drop(guard);
            self.on_signal_tick().await;
            return;
        }

        let Some(slot) = guard.slot.clone() else {
            return;
        };
        if slot.placed_at.elapsed() <= self.config.t_order {
            return;
        }

        match guard.state {
            StrategyState::OpenLeg1Waiting => {
                self.issue_cancel(&mut guard, StrategyState::OpenLeg1Canceling).await;
            }
            StrategyState::CloseLeg1Waiting => {
                self.issue_cancel(&mut guard, StrategyState::CloseLeg1Canceling).await;
            }
            StrategyState::OpenLeg2Waiting | StrategyState::OpenLeg2Chasing => {
                self.cancel_then_chase(&mut guard, true).await;
            }
            StrategyState::CloseLeg2Waiting | StrategyState::CloseLeg2Chasing => {
                self.cancel_then_chase(&mut guard, false).await;
            }
            _ => {}
        }
    }

    async fn issue_cancel(&self, guard: &mut StrategyInner, next_state: StrategyState) {
        let Some(slot) = guard.slot.clone() else { return };
        let req = crate::venues::CancelRequest {
            symbol: self.symbol_for(slot.venue),
            order_id: slot.order_id.clone(),
            client_order_id: Some(slot.client_id.clone()),
        };
        match self.router.cancel(slot.venue, req).await {
            Ok(_) => {
                guard.state = next_state;
                info!(state = %guard.state, "cancel issued after order timeout");
            }
            Err(e) => {
                error!(error = %e, "cancel request failed");
            }
        }
    }

    fn symbol_for(&self, venue: Venue) -> String {
        match venue {
            Venue::Cex => self.config.cex_symbol.clone(),
            Venue::Dex => self.config.dex_symbol.clone(),
        }
    }

    /// Timeout-triggered leg2 escalation (spec.md §103): cancels the resting
    /// remainder first, then chases/falls back using the cancel ack's own
    /// `filled_qty` as the freshest fill figure. A late fill notification for this
    /// order may not have arrived yet, so the cancel ack — not the cached slot
    /// state — is the authoritative source for how much is actually left to hedge.
    async fn cancel_then_chase(&self, guard: &mut StrategyInner, is_open: bool) {
        let Some(slot) = guard.slot.clone() else { return };

        let cancel_req = crate::venues::CancelRequest {
            symbol: self.symbol_for(slot.venue),
            order_id: slot.order_id.clone(),
            client_order_id: Some(slot.client_id.clone()),
        };
        let filled_qty = match self.router.cancel(slot.venue, cancel_req).await {
            Ok(ack) => ack.filled_qty.max(slot.qty_filled),
            Err(e) => {
                warn!(error = %e, "cancel request failed during leg2 timeout, using last known fill");
                slot.qty_filled
            }
        };

        self.chase_or_fallback(guard, is_open, filled_qty).await;
    }

    /// Already-canceled leg2 escalation: the venue has already terminated the
    /// order (an `ALL_CANCELED`/`PARTIAL_FILLED_CANCELED` user-stream event already
    /// arrived), so no cancel request is issued here — reissuing one against an
    /// order the venue has already closed out would only draw an unknown-order
    /// rejection and burn a REST round trip for nothing.
    async fn chase_after_venue_cancel(&self, guard: &mut StrategyInner, is_open: bool) {
        let Some(slot) = guard.slot.clone() else { return };
        self.chase_or_fallback(guard, is_open, slot.qty_filled).await;
    }

    /// Shared chase/market-fallback decision (spec.md §4.4): chase up to
    /// `chase_limit_attempts` times, then fall back to a market order for the
    /// remainder. `filled_qty` is the caller's freshest known fill for the slot.
    async fn chase_or_fallback(&self, guard: &mut StrategyInner, is_open: bool, filled_qty: f64) {
        let Some(slot) = guard.slot.clone() else { return };
        let remaining = slot.qty_total - filled_qty;
        if remaining <= 0.0 {
            return;
        }

        let cex_side = slot.side;
        let best = match cex_side {
            Side::Sell => self.price_board.get(Venue::Cex, crate::price_board::QuoteSide::Bid),
            Side::Buy => self.price_board.get(Venue::Cex, crate::price_board::QuoteSide::Ask),
        };

        if slot.chase_attempt >= self.config.chase_limit_attempts {
            let client_id = self.next_client_id(Leg::Leg2, Venue::Cex);
            match self
                .router
                .place_market(Venue::Cex, &self.config.cex_symbol, cex_side, remaining, client_id.clone())
                .await
            {
                Ok(ack) => {
                    guard.slot = Some(ActiveOrderSlot {
                        venue: Venue::Cex,
                        leg: Leg::Leg2,
                        side: cex_side,
                        order_id: Some(ack.order_id),
                        client_id,
                        price: 0.0,
                        qty_total: remaining,
                        qty_filled: ack.filled_qty,
                        placed_at: Instant::now(),
                        chase_attempt: slot.chase_attempt,
                    });
                    self.metrics.chase_to_market.fetch_add(1, Ordering::Relaxed);
                    info!("chase attempts exhausted, fell back to CEX market order");
                }
                Err(e) => {
                    error!(error = %e, "market fallback placement failed, aborting cycle to condition");
                    self.abort_to_condition(guard, is_open);
                }
            }
            return;
        }

        let Some(price) = best else { return };
        let client_id = self.next_client_id(Leg::Leg2, Venue::Cex);
        match self
            .router
            .place_taker(Venue::Cex, &self.config.cex_symbol, cex_side, remaining, price, client_id.clone())
            .await
        {
            Ok(ack) => {
                guard.slot = Some(ActiveOrderSlot {
                    venue: Venue::Cex,
                    leg: Leg::Leg2,
                    side: cex_side,
                    order_id: Some(ack.order_id),
                    client_id,
                    price,
                    qty_total: remaining,
                    qty_filled: ack.filled_qty,
                    placed_at: Instant::now(),
                    chase_attempt: slot.chase_attempt + 1,
                });
                guard.state = if is_open {
                    StrategyState::OpenLeg2Chasing
                } else {
                    StrategyState::CloseLeg2Chasing
                };
                self.metrics.chase_reposts.fetch_add(1, Ordering::Relaxed);
                info!(state = %guard.state, attempt = slot.chase_attempt + 1, "chased to new best price");
            }
            Err(e) => {
                error!(error = %e, "chase repost failed, aborting cycle to condition");
                self.abort_to_condition(guard, is_open);
            }
        }
    }

    /// Best-effort cancel of a possibly-still-live order followed by a hard reset to
    /// the governing Condition state. Used when a chase/fallback placement itself
    /// fails — a state a venue can't be coaxed out of otherwise (spec.md §7 "state
    /// inconsistency").
    fn abort_to_condition(&self, guard: &mut StrategyInner, is_open: bool) {
        guard.slot = None;
        guard.leg1_filled_qty = 0.0;
        guard.cycle_qty = 0.0;
        guard.state = if is_open {
            StrategyState::OpenCondition
        } else {
            StrategyState::CloseCondition
        };
        self.metrics.cancel_races.fetch_add(1, Ordering::Relaxed);
    }

    /// Invoked by C6 with a correlated user-stream event for the currently active
    /// order. Unknown-order events are filtered out by `user_stream::correlate`
    /// before this is called.
    pub async fn on_user_event(&self, event: VenueUserEvent) {
        let mut guard = self.inner.lock().await;
        match guard.state {
            StrategyState::OpenLeg1Waiting => self.handle_open_leg1_waiting(&mut guard, event).await,
            StrategyState::OpenLeg1Canceling => self.handle_open_leg1_canceling(&mut guard, event).await,
            StrategyState::OpenLeg2Waiting | StrategyState::OpenLeg2Chasing => {
                self.handle_open_leg2(&mut guard, event).await
            }
            StrategyState::CloseLeg1Waiting => self.handle_close_leg1_waiting(&mut guard, event).await,
            StrategyState::CloseLeg1Canceling => self.handle_close_leg1_canceling(&mut guard, event).await,
            StrategyState::CloseLeg2Waiting | StrategyState::CloseLeg2Chasing => {
                self.handle_close_leg2(&mut guard, event).await
            }
            StrategyState::OpenCondition | StrategyState::CloseCondition => {
                warn!("received user-stream event while in a Condition state; dropping");
            }
        }
    }

    async fn handle_open_leg1_waiting(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        if let UserStreamEvent::AllTraded { filled_qty, .. } = ev.event {
            guard.leg1_filled_qty = filled_qty;
            self.place_leg2(guard, filled_qty, true).await;
        }
    }

    async fn handle_open_leg1_canceling(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        match ev.event {
            UserStreamEvent::AllCanceled { .. } => {
                guard.slot = None;
                guard.state = StrategyState::OpenCondition;
                info!("leg1 fully canceled with no fill, returning to OpenCondition");
            }
            UserStreamEvent::PartialFilledCanceled { filled_qty, .. } if filled_qty > 0.0 => {
                guard.leg1_filled_qty = filled_qty;
                self.place_leg2(guard, filled_qty, true).await;
            }
            UserStreamEvent::PartialFilledCanceled { .. } => {
                guard.slot = None;
                guard.state = StrategyState::OpenCondition;
            }
            UserStreamEvent::AllTraded { filled_qty, .. } => {
                // Cancel lost the race against a full fill.
                guard.leg1_filled_qty = filled_qty;
                self.place_leg2(guard, filled_qty, true).await;
            }
        }
    }

    async fn handle_close_leg1_waiting(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        if let UserStreamEvent::AllTraded { filled_qty, .. } = ev.event {
            guard.leg1_filled_qty = filled_qty;
            self.place_leg2(guard, filled_qty, false).await;
        }
    }

    async fn handle_close_leg1_canceling(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        match ev.event {
            UserStreamEvent::AllCanceled { .. } => {
                guard.slot = None;
                guard.state = StrategyState::CloseCondition;
            }
            UserStreamEvent::PartialFilledCanceled { filled_qty, .. } if filled_qty > 0.0 => {
                guard.leg1_filled_qty = filled_qty;
                self.place_leg2(guard, filled_qty, false).await;
            }
            UserStreamEvent::PartialFilledCanceled { .. } => {
                guard.slot = None;
                guard.state = StrategyState::CloseCondition;
            }
            UserStreamEvent::AllTraded { filled_qty, .. } => {
                guard.leg1_filled_qty = filled_qty;
                self.place_leg2(guard, filled_qty, false).await;
            }
        }
    }

    /// Places the CEX hedge for exactly `leg1_filled_qty` — Leg2 never places more
    /// than Leg1 filled (spec.md invariant).
    async fn place_leg2(&self, guard: &mut StrategyInner, leg1_filled_qty: f64, is_open: bool) {
        if leg1_filled_qty <= 0.0 {
            guard.slot = None;
            guard.state = if is_open {
                StrategyState::OpenCondition
            } else {
                StrategyState::CloseCondition
            };
            return;
        }

        let side = if is_open { Side::Sell } else { Side::Buy };
        let best = match side {
            Side::Sell => self.price_board.get(Venue::Cex, crate::price_board::QuoteSide::Bid),
            Side::Buy => self.price_board.get(Venue::Cex, crate::price_board::QuoteSide::Ask),
        };
        let Some(price) = best else {
            warn!("no CEX quote available to place leg2 hedge, aborting cycle to condition");
            guard.slot = None;
            guard.state = if is_open {
                StrategyState::OpenCondition
            } else {
                StrategyState::CloseCondition
            };
            return;
        };

        let client_id = self.next_client_id(Leg::Leg2, Venue::Cex);
        match self
            .router
            .place_taker(Venue::Cex, &self.config.cex_symbol, side, leg1_filled_qty, price, client_id.clone())
            .await
        {
            Ok(ack) => {
                guard.slot = Some(ActiveOrderSlot {
                    venue: Venue::Cex,
                    leg: Leg::Leg2,
                    side,
                    order_id: Some(ack.order_id),
                    client_id,
                    price,
                    qty_total: leg1_filled_qty,
                    qty_filled: ack.filled_qty,
                    placed_at: Instant::now(),
                    chase_attempt: 0,
                });
                guard.state = if is_open {
                    StrategyState::OpenLeg2Waiting
                } else {
                    StrategyState::CloseLeg2Waiting
                };
                info!(state = %guard.state, qty = leg1_filled_qty, "placed leg2 CEX hedge");
            }
            Err(e) => {
                error!(error = %e, "leg2 hedge placement failed; this is a state inconsistency");
                guard.slot = None;
                guard.state = if is_open {
                    StrategyState::OpenCondition
                } else {
                    StrategyState::CloseCondition
                };
            }
        }
    }

    async fn handle_open_leg2(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        match ev.event {
            UserStreamEvent::AllTraded { .. } => {
                guard.held_qty += guard.leg1_filled_qty;
                self.complete_open_cycle(guard);
            }
            UserStreamEvent::PartialFilledCanceled { filled_qty, .. } => {
                if let Some(slot) = &mut guard.slot {
                    slot.qty_filled = filled_qty;
                }
                if filled_qty >= guard.leg1_filled_qty {
                    guard.held_qty += guard.leg1_filled_qty;
                    self.complete_open_cycle(guard);
                } else {
                    self.chase_after_venue_cancel(guard, true).await;
                }
            }
            UserStreamEvent::AllCanceled { .. } => {
                self.chase_after_venue_cancel(guard, true).await;
            }
        }
    }

    async fn handle_close_leg2(&self, guard: &mut StrategyInner, ev: VenueUserEvent) {
        match ev.event {
            UserStreamEvent::AllTraded { .. } => {
                guard.held_qty = (guard.held_qty - guard.cycle_qty).max(0.0);
                self.complete_close_cycle(guard);
            }
            UserStreamEvent::PartialFilledCanceled { filled_qty, .. } => {
                if let Some(slot) = &mut guard.slot {
                    slot.qty_filled = filled_qty;
                }
                if filled_qty >= guard.leg1_filled_qty {
                    guard.held_qty = (guard.held_qty - guard.cycle_qty).max(0.0);
                    self.complete_close_cycle(guard);
                } else {
                    self.chase_after_venue_cancel(guard, false).await;
                }
            }
            UserStreamEvent::AllCanceled { .. } => {
                self.chase_after_venue_cancel(guard, false).await;
            }
        }
    }

    fn complete_open_cycle(&self, guard: &mut StrategyInner) {
        guard.slot = None;
        guard.leg1_filled_qty = 0.0;
        guard.cycle_qty = 0.0;
        guard.state = StrategyState::CloseCondition;
        self.metrics.cycles_completed.fetch_add(1, Ordering::Relaxed);
        info!(held_qty = guard.held_qty, "open cycle complete, moving to CloseCondition");
    }

    fn complete_close_cycle(&self, guard: &mut StrategyInner) {
        guard.slot = None;
        guard.leg1_filled_qty = 0.0;
        guard.cycle_qty = 0.0;
        guard.state = StrategyState::OpenCondition;
        self.metrics.cycles_completed.fetch_add(1, Ordering::Relaxed);
        info!(held_qty = guard.held_qty, "close cycle complete, moving to OpenCondition");
    }

    /// Best-effort cancel of any known live order, used by graceful shutdown.
    pub async fn cancel_any_live_order(&self) {
        let guard = self.inner.lock().await;
        let Some(slot) = guard.slot.clone() else { return };
        drop(guard);
        let req = crate::venues::CancelRequest {
            symbol: self.symbol_for(slot.venue),
            order_id: slot.order_id,
            client_order_id: Some(slot.client_id),
        };
        if let Err(e) = self.router.cancel(slot.venue, req).await {
            error!(error = %e, "shutdown cancel failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_matches_uppercase_convention() {
        assert_eq!(StrategyState::OpenCondition.to_string(), "OPEN_CONDITION");
        assert_eq!(StrategyState::CloseLeg2Chasing.to_string(), "CLOSE_LEG2_CHASING");
    }

    #[test]
    fn condition_states_are_identified() {
        assert!(StrategyState::OpenCondition.is_condition());
        assert!(StrategyState::CloseCondition.is_condition());
        assert!(!StrategyState::OpenLeg1Waiting.is_condition());
    }
}
