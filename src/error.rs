//! Typed, recoverable errors raised by venue-facing components.
//!
//! Everything above a component boundary (config, startup, process wiring) uses
//! `anyhow::Result` instead; this enum is for errors a caller needs to branch on.

use std::fmt;

#[derive(Debug, Clone)]
pub enum VenueError {
    /// Network-level failure or 5xx response. Retriable by the caller's own policy.
    Transport(String),
    /// Request was rejected for rate limiting. Retriable after backing off.
    RateLimited,
    /// Venue rejected the order for insufficient balance. Not retriable.
    InsufficientBalance,
    /// Venue rejected the order against a symbol filter (tick/lot/min-notional). Not retriable.
    FilterFailure(String),
    /// Order id or client id referenced an order the venue has no record of.
    UnknownOrder(String),
    /// Response body did not match the expected shape.
    Decode(String),
    /// Request signing failed (bad key material).
    Signing(String),
}

impl VenueError {
    /// Whether the state machine should treat this as retriable transport noise
    /// rather than a terminal venue reject.
    pub fn retriable(&self) -> bool {
        matches!(self, VenueError::Transport(_) | VenueError::RateLimited)
    }
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueError::Transport(msg) => write!(f, "transport error: {msg}"),
            VenueError::RateLimited => write!(f, "rate limited"),
            VenueError::InsufficientBalance => write!(f, "insufficient balance"),
            VenueError::FilterFailure(msg) => write!(f, "symbol filter rejected order: {msg}"),
            VenueError::UnknownOrder(id) => write!(f, "unknown order: {id}"),
            VenueError::Decode(msg) => write!(f, "decode error: {msg}"),
            VenueError::Signing(msg) => write!(f, "signing error: {msg}"),
        }
    }
}

impl std::error::Error for VenueError {}
