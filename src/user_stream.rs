//! Normalizes heterogeneous venue user-stream events into the three terminal kinds
//! the strategy state machine understands (C6).
//!
//! Venue-specific parsing lives in `venues::binance`/`venues::hyperliquid`; this module
//! only owns correlation against the strategy's live slot and the defensive drop of
//! events for unknown order ids (reconnect replay protection, per spec.md §4.5).

use crate::config::Venue;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum UserStreamEvent {
    AllTraded { order_id: String, filled_qty: f64 },
    PartialFilledCanceled { order_id: String, filled_qty: f64 },
    AllCanceled { order_id: String },
}

impl UserStreamEvent {
    pub fn order_id(&self) -> &str {
        match self {
            UserStreamEvent::AllTraded { order_id, .. } => order_id,
            UserStreamEvent::PartialFilledCanceled { order_id, .. } => order_id,
            UserStreamEvent::AllCanceled { order_id } => order_id,
        }
    }

    pub fn filled_qty(&self) -> f64 {
        match self {
            UserStreamEvent::AllTraded { filled_qty, .. } => *filled_qty,
            UserStreamEvent::PartialFilledCanceled { filled_qty, .. } => *filled_qty,
            UserStreamEvent::AllCanceled { .. } => 0.0,
        }
    }
}

/// A venue-tagged event as delivered to the strategy's dispatch loop.
#[derive(Debug, Clone)]
pub struct VenueUserEvent {
    pub venue: Venue,
    pub event: UserStreamEvent,
}

/// Checks correlation against the expected order id for the currently active slot.
/// Events for any other id are logged and dropped rather than applied — they are
/// either reconnect replay or belong to an order the machine no longer tracks.
pub fn correlate<'a>(
    expected_order_id: Option<&str>,
    event: &'a VenueUserEvent,
) -> Option<&'a VenueUserEvent> {
    match expected_order_id {
        Some(expected) if expected == event.event.order_id() => Some(event),
        Some(expected) => {
            warn!(
                expected_order_id = expected,
                got_order_id = event.event.order_id(),
                "dropping user-stream event for unknown order id"
            );
            None
        }
        None => {
            warn!(
                order_id = event.event.order_id(),
                "dropping user-stream event with no active slot"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlate_matches_expected_order() {
        let event = VenueUserEvent {
            venue: Venue::Dex,
            event: UserStreamEvent::AllTraded {
                order_id: "D1".to_string(),
                filled_qty: 0.01,
            },
        };
        assert!(correlate(Some("D1"), &event).is_some());
    }

    #[test]
    fn correlate_drops_unknown_order() {
        let event = VenueUserEvent {
            venue: Venue::Dex,
            event: UserStreamEvent::AllTraded {
                order_id: "stale".to_string(),
                filled_qty: 0.01,
            },
        };
        assert!(correlate(Some("D1"), &event).is_none());
    }

    #[test]
    fn correlate_drops_when_no_active_slot() {
        let event = VenueUserEvent {
            venue: Venue::Cex,
            event: UserStreamEvent::AllCanceled {
                order_id: "C9".to_string(),
            },
        };
        assert!(correlate(None, &event).is_none());
    }
}
