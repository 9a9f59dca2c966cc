//! Startup reconciler (C7): picks the initial strategy state from live balances and
//! positions so a restart never silently assumes a flat book.
//!
//! Grounded on `vault/execution.rs`'s `get_balance`/`get_positions` REST calls,
//! generalized to query both venues and compare.

use crate::config::Config;
use crate::executor::VenueRouter;
use crate::strategy::StrategyState;
use anyhow::{bail, Context, Result};

pub struct ReconciliationResult {
    pub initial_state: StrategyState,
    pub held_qty: f64,
}

/// One lot's worth of slack when comparing DEX/CEX position sizes, since each venue
/// rounds to its own lot size independently.
fn positions_match(dex_qty: f64, cex_qty: f64, lot_tolerance: f64) -> bool {
    (dex_qty - cex_qty).abs() <= lot_tolerance
}

pub async fn reconcile(config: &Config, router: &VenueRouter) -> Result<ReconciliationResult> {
    let dex_positions = router
        .get_positions(crate::config::Venue::Dex)
        .await
        .context("failed to fetch DEX positions during startup reconciliation")?;
    let cex_positions = router
        .get_positions(crate::config::Venue::Cex)
        .await
        .context("failed to fetch CEX positions during startup reconciliation")?;

    let dex_qty = dex_positions
        .iter()
        .find(|p| p.symbol == config.dex_symbol)
        .map(|p| p.signed_qty)
        .unwrap_or(0.0);
    let cex_qty = cex_positions
        .iter()
        .find(|p| p.symbol == config.cex_symbol)
        .map(|p| p.signed_qty)
        .unwrap_or(0.0);

    let lot_tolerance = config.cycle_qty.max(0.0001) * 0.1;

    if dex_qty.abs() < lot_tolerance && cex_qty.abs() < lot_tolerance {
        return Ok(ReconciliationResult {
            initial_state: StrategyState::OpenCondition,
            held_qty: 0.0,
        });
    }

    // DEX long of size q, CEX short of the same size q (within one lot).
    if dex_qty > 0.0 && cex_qty < 0.0 && positions_match(dex_qty, -cex_qty, lot_tolerance) {
        return Ok(ReconciliationResult {
            initial_state: StrategyState::CloseCondition,
            held_qty: dex_qty,
        });
    }

    bail!(
        "position mismatch: dex_qty={dex_qty}, cex_qty={cex_qty} — refusing to start, operator intervention required"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_match_within_tolerance() {
        assert!(positions_match(0.01, 0.0099, 0.001));
        assert!(!positions_match(0.01, 0.005, 0.001));
    }
}
