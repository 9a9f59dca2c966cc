//! Cross-venue delta-neutral arbitrage executor.
//!
//! Coordinates a centralized futures exchange and an on-chain perpetuals venue:
//! a fee-aware net-spread estimator over two order-book streams, and a two-leg
//! open/close strategy state machine that places, chases, and cancels orders across
//! both venues under a single serializing mutex.

pub mod book;
pub mod config;
pub mod error;
pub mod executor;
pub mod market_data;
pub mod metrics;
pub mod price_board;
pub mod reconcile;
pub mod scheduler;
pub mod strategy;
pub mod user_stream;
pub mod venues;

pub use config::{Config, Fees, Venue};
pub use executor::VenueRouter;
pub use price_board::PriceBoard;
pub use strategy::{Strategy, StrategyState};
