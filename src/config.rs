//! Typed configuration loaded from the environment.
//!
//! Follows the teacher's `models::Config::from_env` pattern: `dotenv().ok()` then
//! `env::var` with explicit defaults for tunables, but `.context(...)`-wrapped failure
//! for anything that would otherwise let the process start with a missing credential.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Cex,
    Dex,
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::Cex => write!(f, "CEX"),
            Venue::Dex => write!(f, "DEX"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fees {
    pub cex_maker: f64,
    pub cex_taker: f64,
    pub dex_maker: f64,
    pub dex_taker: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cex_ws_url: String,
    pub dex_ws_url: String,
    pub cex_rest_url: String,
    pub dex_rest_url: String,

    pub cex_api_key: String,
    pub cex_secret: String,
    pub dex_wallet: String,
    pub dex_private_key: String,

    pub cex_symbol: String,
    pub dex_symbol: String,

    pub fees: Fees,

    pub min_spread_threshold: f64,
    pub cycle_qty: f64,

    pub t_order: Duration,
    pub t_cancel: Duration,
    pub n_cancel_retry: u32,
    pub chase_limit_attempts: u32,

    pub testnet: bool,
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let testnet = env_bool("TESTNET", true);

        let cex_ws_url = env::var("CEX_WS_URL").unwrap_or_else(|_| {
            if testnet {
                "wss://stream.binancefuture.com/ws".to_string()
            } else {
                "wss://fstream.binance.com/ws".to_string()
            }
        });
        let dex_ws_url = env::var("DEX_WS_URL").unwrap_or_else(|_| {
            if testnet {
                "wss://api.hyperliquid-testnet.xyz/ws".to_string()
            } else {
                "wss://api.hyperliquid.xyz/ws".to_string()
            }
        });
        let cex_rest_url = env::var("CEX_REST_URL").unwrap_or_else(|_| {
            if testnet {
                "https://testnet.binancefuture.com".to_string()
            } else {
                "https://fapi.binance.com".to_string()
            }
        });
        let dex_rest_url = env::var("DEX_REST_URL").unwrap_or_else(|_| {
            if testnet {
                "https://api.hyperliquid-testnet.xyz".to_string()
            } else {
                "https://api.hyperliquid.xyz".to_string()
            }
        });

        let cex_api_key = env::var("CEX_API_KEY").context("CEX_API_KEY is required")?;
        let cex_secret = env::var("CEX_SECRET").context("CEX_SECRET is required")?;
        let dex_wallet = env::var("DEX_WALLET").context("DEX_WALLET is required")?;
        let dex_private_key =
            env::var("DEX_PRIVATE_KEY").context("DEX_PRIVATE_KEY is required")?;

        let cex_symbol = env::var("CEX_SYMBOL").unwrap_or_else(|_| "BTCUSDT".to_string());
        let dex_symbol = env::var("DEX_SYMBOL").unwrap_or_else(|_| "BTC".to_string());

        let fees = Fees {
            cex_maker: env_f64("CEX_MAKER_FEE", 0.0002),
            cex_taker: env_f64("CEX_TAKER_FEE", 0.0004),
            dex_maker: env_f64("DEX_MAKER_FEE", 0.0001),
            dex_taker: env_f64("DEX_TAKER_FEE", 0.0005),
        };

        Ok(Self {
            cex_ws_url,
            dex_ws_url,
            cex_rest_url,
            dex_rest_url,
            cex_api_key,
            cex_secret,
            dex_wallet,
            dex_private_key,
            cex_symbol,
            dex_symbol,
            fees,
            min_spread_threshold: env_f64("MIN_SPREAD_THRESHOLD", 0.0),
            cycle_qty: env_f64("CYCLE_QTY", 0.01),
            t_order: env_secs("T_ORDER", 5),
            t_cancel: env_secs("T_CANCEL", 5),
            n_cancel_retry: env_u32("N_CANCEL_RETRY", 3),
            chase_limit_attempts: env_u32("CHASE_LIMIT_ATTEMPTS", 3),
            testnet,
        })
    }
}

/// CLI wrapper: lets an operator point at a specific dotenv file or override the log
/// level without touching the environment directly.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "hedgebridge", about = "Cross-venue delta-neutral arbitrage executor")]
pub struct Cli {
    /// Path to a .env file to load before reading configuration.
    #[arg(long, env = "HEDGEBRIDGE_ENV_FILE")]
    pub env_file: Option<String>,

    /// Override the tracing log filter (e.g. "debug", "hedgebridge=trace,info").
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required_env() {
        env::set_var("CEX_API_KEY", "test-key");
        env::set_var("CEX_SECRET", "test-secret");
        env::set_var("DEX_WALLET", "0xabc");
        env::set_var("DEX_PRIVATE_KEY", "0xdef");
    }

    #[test]
    fn from_env_applies_defaults() {
        with_required_env();
        env::remove_var("MIN_SPREAD_THRESHOLD");
        env::remove_var("CYCLE_QTY");
        let cfg = Config::from_env().expect("config should load with required vars set");
        assert_eq!(cfg.min_spread_threshold, 0.0);
        assert_eq!(cfg.cycle_qty, 0.01);
        assert_eq!(cfg.chase_limit_attempts, 3);
        assert!(cfg.testnet);
    }

    #[test]
    fn from_env_honors_overrides() {
        with_required_env();
        env::set_var("MIN_SPREAD_THRESHOLD", "1.5");
        env::set_var("TESTNET", "false");
        let cfg = Config::from_env().expect("config should load");
        assert_eq!(cfg.min_spread_threshold, 1.5);
        assert!(!cfg.testnet);
        env::remove_var("MIN_SPREAD_THRESHOLD");
        env::set_var("TESTNET", "true");
    }

    #[test]
    fn from_env_fails_without_credentials() {
        env::remove_var("CEX_API_KEY");
        let result = Config::from_env();
        assert!(result.is_err());
        with_required_env();
    }
}
