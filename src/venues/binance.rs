//! Binance USDT-M futures client: diff-depth market data, listen-key user stream,
//! and signed REST for orders/balances/positions.
//!
//! The reconnect-with-backoff shape is grounded on `scrapers/binance_book_ticker.rs`'s
//! `run_loop`/`connect_and_stream`; the listen-key proactive-refresh idiom is grounded
//! on `scrapers/binance_session.rs`'s `SessionConfig`/`SessionState`; HMAC request
//! signing is grounded on `vault/execution.rs`'s `PolymarketClobAdapter::sign_request`.

use crate::book::{L2Book, Level};
use crate::config::Venue;
use crate::error::VenueError;
use crate::user_stream::UserStreamEvent;
use crate::venues::{
    Balance, BookDelta, CancelRequest, ExecutionAdapter, OrderAck, OrderRequest, OrderStatus,
    Position, Side, SymbolInfo, TimeInForce, VenueMarketDataSource,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);
const LISTEN_KEY_REFRESH: Duration = Duration::from_secs(30 * 60);

/// Adds up to 20% jitter to a backoff duration so many reconnecting clients don't
/// all retry in lockstep.
fn jittered(base: Duration) -> Duration {
    use rand::Rng;
    let factor: f64 = rand::thread_rng().gen_range(1.0..1.2);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

pub struct BinanceFuturesClient {
    ws_url: String,
    rest_url: String,
    symbol: String,
    api_key: String,
    secret: String,
    http: reqwest::Client,
}

impl BinanceFuturesClient {
    pub fn new(ws_url: String, rest_url: String, symbol: String, api_key: String, secret: String) -> Self {
        Self {
            ws_url,
            rest_url,
            symbol,
            api_key,
            secret,
            http: reqwest::Client::new(),
        }
    }

    fn sign(&self, query: &str) -> Result<String, VenueError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| VenueError::Signing(e.to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn timestamp_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }

    async fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<serde_json::Value, VenueError> {
        params.push(("timestamp".to_string(), Self::timestamp_ms().to_string()));
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.rest_url, path, query, signature);

        let resp = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(VenueError::RateLimited);
        }
        if resp.status().is_server_error() {
            return Err(VenueError::Transport(format!("http {}", resp.status())));
        }
        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VenueError::Decode(e.to_string()))?;

        if !status.is_success() {
            if let Some(msg) = body.get("msg").and_then(|m| m.as_str()) {
                if msg.to_lowercase().contains("balance") {
                    return Err(VenueError::InsufficientBalance);
                }
                if msg.to_lowercase().contains("filter") || msg.to_lowercase().contains("lot") {
                    return Err(VenueError::FilterFailure(msg.to_string()));
                }
                return Err(VenueError::Decode(msg.to_string()));
            }
        }
        Ok(body)
    }

    /// Obtains a fresh listen key for the user data stream.
    pub async fn start_listen_key(&self) -> Result<String, VenueError> {
        let resp = self
            .http
            .post(format!("{}/fapi/v1/listenKey", self.rest_url))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VenueError::Decode(e.to_string()))?;
        body.get("listenKey")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| VenueError::Decode("missing listenKey".to_string()))
    }

    /// Keeps the listen key alive. Called every 30 minutes; on failure the caller
    /// should restart the user stream with a freshly minted key.
    pub async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), VenueError> {
        self.http
            .put(format!(
                "{}/fapi/v1/listenKey?listenKey={}",
                self.rest_url, listen_key
            ))
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Runs the user-data-stream WebSocket, refreshing the listen key every 30 minutes
    /// and restarting on refresh failure. Normalized fill/cancel events are sent to `tx`.
    pub async fn run_user_stream(
        &self,
        tx: mpsc::Sender<UserStreamEvent>,
    ) -> Result<(), VenueError> {
        loop {
            let listen_key = self.start_listen_key().await?;
            let url = format!("{}/{}", self.ws_url, listen_key);
            info!(venue = %Venue::Cex, "opening user data stream");

            let (ws_stream, _) = connect_async(&url)
                .await
                .map_err(|e| VenueError::Transport(e.to_string()))?;
            let (mut write, mut read) = ws_stream.split();

            let mut refresh = tokio::time::interval(LISTEN_KEY_REFRESH);
            refresh.tick().await; // first tick fires immediately; consume it

            loop {
                tokio::select! {
                    _ = refresh.tick() => {
                        if self.keepalive_listen_key(&listen_key).await.is_err() {
                            warn!("listen key refresh failed, restarting user stream");
                            let _ = write.close().await;
                            break;
                        }
                    }
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(event) = parse_user_event(&text) {
                                    if tx.send(event).await.is_err() {
                                        return Ok(());
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = write.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Err(e)) => {
                                warn!(error = %e, "user stream error");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl VenueMarketDataSource for BinanceFuturesClient {
    async fn run(&self, tx: mpsc::Sender<BookDelta>) -> Result<(), VenueError> {
        let mut backoff = RECONNECT_BASE;
        let stream_path = format!("{}/{}@depth@100ms", self.ws_url, self.symbol.to_lowercase());
        let seq = AtomicU64::new(0);

        loop {
            match self.connect_and_stream(&stream_path, &tx, &seq).await {
                Ok(()) => backoff = RECONNECT_BASE,
                Err(e) => warn!(venue = %Venue::Cex, error = %e, "market data disconnected, reconnecting"),
            }
            sleep(jittered(backoff)).await;
            backoff = (backoff * 2).min(RECONNECT_MAX);
        }
    }
}

impl BinanceFuturesClient {
    async fn connect_and_stream(
        &self,
        url: &str,
        tx: &mpsc::Sender<BookDelta>,
        seq: &AtomicU64,
    ) -> Result<(), VenueError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        info!(venue = %Venue::Cex, "market data connected");

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Some(book) = parse_depth_update(&text, &self.symbol, seq) {
                        let delta = BookDelta {
                            venue: Venue::Cex,
                            book,
                        };
                        if tx.send(delta).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Ok(Message::Ping(payload)) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(VenueError::Transport(e.to_string())),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DepthUpdate {
    #[serde(rename = "b")]
    bids: Vec<[String; 2]>,
    #[serde(rename = "a")]
    asks: Vec<[String; 2]>,
}

fn parse_depth_update(text: &str, symbol: &str, seq: &AtomicU64) -> Option<L2Book> {
    let update: DepthUpdate = serde_json::from_str(text).ok()?;
    let bids = levels_from_pairs(&update.bids);
    let asks = levels_from_pairs(&update.asks);
    let n = seq.fetch_add(1, Ordering::Relaxed);
    let ts_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    L2Book::new(Venue::Cex, symbol, bids, asks, n, ts_ms)
}

fn levels_from_pairs(pairs: &[[String; 2]]) -> Vec<Level> {
    pairs
        .iter()
        .filter_map(|[px, qty]| {
            let price = px.parse::<f64>().ok()?;
            let size = qty.parse::<f64>().ok()?;
            Some(Level::new(price, size, 1))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "e")]
enum UserDataEvent {
    #[serde(rename = "ORDER_TRADE_UPDATE")]
    OrderTradeUpdate {
        #[serde(rename = "o")]
        order: OrderUpdatePayload,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct OrderUpdatePayload {
    #[serde(rename = "i")]
    order_id: i64,
    #[serde(rename = "X")]
    order_status: String,
    #[serde(rename = "z")]
    cumulative_filled_qty: String,
}

fn parse_user_event(text: &str) -> Option<UserStreamEvent> {
    let event: UserDataEvent = serde_json::from_str(text).ok()?;
    let UserDataEvent::OrderTradeUpdate { order } = event else {
        return None;
    };
    let filled_qty = order.cumulative_filled_qty.parse::<f64>().ok()?;
    let order_id = order.order_id.to_string();
    match order.order_status.as_str() {
        "FILLED" => Some(UserStreamEvent::AllTraded { order_id, filled_qty }),
        "CANCELED" | "EXPIRED" => {
            if filled_qty > 0.0 {
                Some(UserStreamEvent::PartialFilledCanceled { order_id, filled_qty })
            } else {
                Some(UserStreamEvent::AllCanceled { order_id })
            }
        }
        _ => None,
    }
}

fn status_from_str(s: &str) -> OrderStatus {
    match s {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" | "EXPIRED" => OrderStatus::Canceled,
        _ => OrderStatus::Rejected,
    }
}

#[async_trait]
impl ExecutionAdapter for BinanceFuturesClient {
    async fn place_order(&self, req: OrderRequest) -> Result<OrderAck, VenueError> {
        let side = match req.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let order_type = if req.price.is_some() { "LIMIT" } else { "MARKET" };
        let tif = match req.tif {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        };

        let mut params = vec![
            ("symbol".to_string(), req.symbol.clone()),
            ("side".to_string(), side.to_string()),
            ("type".to_string(), order_type.to_string()),
            ("quantity".to_string(), format!("{}", req.qty)),
            ("newClientOrderId".to_string(), req.client_order_id.clone()),
        ];
        if let Some(price) = req.price {
            params.push(("price".to_string(), format!("{}", price)));
            params.push(("timeInForce".to_string(), tif.to_string()));
        }

        let body = self
            .signed_request(reqwest::Method::POST, "/fapi/v1/order", params)
            .await?;

        Ok(OrderAck {
            order_id: body.get("orderId").map(|v| v.to_string()).unwrap_or_default(),
            client_order_id: req.client_order_id,
            status: body
                .get("status")
                .and_then(|v| v.as_str())
                .map(status_from_str)
                .unwrap_or(OrderStatus::New),
            filled_qty: body
                .get("executedQty")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            avg_price: body
                .get("avgPrice")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok()),
        })
    }

    async fn cancel_order(&self, req: CancelRequest) -> Result<OrderAck, VenueError> {
        let mut params = vec![("symbol".to_string(), req.symbol.clone())];
        if let Some(order_id) = &req.order_id {
            params.push(("orderId".to_string(), order_id.clone()));
        }
        if let Some(client_id) = &req.client_order_id {
            params.push(("origClientOrderId".to_string(), client_id.clone()));
        }

        let body = self
            .signed_request(reqwest::Method::DELETE, "/fapi/v1/order", params)
            .await?;

        Ok(OrderAck {
            order_id: body.get("orderId").map(|v| v.to_string()).unwrap_or_default(),
            client_order_id: req.client_order_id.unwrap_or_default(),
            status: body
                .get("status")
                .and_then(|v| v.as_str())
                .map(status_from_str)
                .unwrap_or(OrderStatus::Canceled),
            filled_qty: body
                .get("executedQty")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            avg_price: None,
        })
    }

    async fn query_order(&self, symbol: &str, order_id: &str) -> Result<OrderAck, VenueError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("orderId".to_string(), order_id.to_string()),
        ];
        let body = self
            .signed_request(reqwest::Method::GET, "/fapi/v1/order", params)
            .await?;
        Ok(OrderAck {
            order_id: order_id.to_string(),
            client_order_id: body
                .get("clientOrderId")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            status: body
                .get("status")
                .and_then(|v| v.as_str())
                .map(status_from_str)
                .unwrap_or(OrderStatus::Rejected),
            filled_qty: body
                .get("executedQty")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),
            avg_price: body
                .get("avgPrice")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok()),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>, VenueError> {
        let body = self
            .signed_request(reqwest::Method::GET, "/fapi/v2/balance", vec![])
            .await?;
        let arr = body.as_array().cloned().unwrap_or_default();
        Ok(arr
            .iter()
            .filter_map(|entry| {
                let asset = entry.get("asset")?.as_str()?.to_string();
                let free = entry.get("availableBalance")?.as_str()?.parse().ok()?;
                Some(Balance { asset, free })
            })
            .collect())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, VenueError> {
        let body = self
            .signed_request(reqwest::Method::GET, "/fapi/v2/positionRisk", vec![])
            .await?;
        let arr = body.as_array().cloned().unwrap_or_default();
        Ok(arr
            .iter()
            .filter_map(|entry| {
                let symbol = entry.get("symbol")?.as_str()?.to_string();
                let signed_qty = entry.get("positionAmt")?.as_str()?.parse().ok()?;
                Some(Position { symbol, signed_qty })
            })
            .collect())
    }

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, VenueError> {
        let resp = self
            .http
            .get(format!("{}/fapi/v1/exchangeInfo", self.rest_url))
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VenueError::Decode(e.to_string()))?;
        parse_exchange_info(&body, symbol)
    }
}

/// Parses `GET /fapi/v1/exchangeInfo`'s `symbols[].filters` array into `SymbolInfo`.
fn parse_exchange_info(body: &serde_json::Value, symbol: &str) -> Result<SymbolInfo, VenueError> {
    let symbols = body
        .get("symbols")
        .and_then(|v| v.as_array())
        .ok_or_else(|| VenueError::Decode("missing symbols array".to_string()))?;
    let entry = symbols
        .iter()
        .find(|s| s.get("symbol").and_then(|v| v.as_str()) == Some(symbol))
        .ok_or_else(|| VenueError::Decode(format!("symbol {symbol} not found in exchangeInfo")))?;
    let filters = entry
        .get("filters")
        .and_then(|v| v.as_array())
        .ok_or_else(|| VenueError::Decode("missing filters array".to_string()))?;

    let filter_f64 = |filter_type: &str, field: &str| -> Option<f64> {
        filters
            .iter()
            .find(|f| f.get("filterType").and_then(|v| v.as_str()) == Some(filter_type))
            .and_then(|f| f.get(field))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    };

    let tick_size = filter_f64("PRICE_FILTER", "tickSize")
        .ok_or_else(|| VenueError::Decode("missing PRICE_FILTER.tickSize".to_string()))?;
    let lot_size = filter_f64("LOT_SIZE", "stepSize")
        .ok_or_else(|| VenueError::Decode("missing LOT_SIZE.stepSize".to_string()))?;
    let min_notional = filter_f64("MIN_NOTIONAL", "notional").unwrap_or(5.0);

    Ok(SymbolInfo {
        tick_size,
        lot_size,
        min_notional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_order_trade_update_fill() {
        let text = r#"{"e":"ORDER_TRADE_UPDATE","o":{"i":123,"X":"FILLED","z":"0.01"}}"#;
        let event = parse_user_event(text).unwrap();
        match event {
            UserStreamEvent::AllTraded { order_id, filled_qty } => {
                assert_eq!(order_id, "123");
                assert_eq!(filled_qty, 0.01);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_partial_fill_cancel() {
        let text = r#"{"e":"ORDER_TRADE_UPDATE","o":{"i":7,"X":"CANCELED","z":"0.004"}}"#;
        let event = parse_user_event(text).unwrap();
        match event {
            UserStreamEvent::PartialFilledCanceled { order_id, filled_qty } => {
                assert_eq!(order_id, "7");
                assert_eq!(filled_qty, 0.004);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_depth_update_into_book() {
        let text = r#"{"b":[["100.0","1.0"]],"a":[["101.0","2.0"]]}"#;
        let seq = AtomicU64::new(0);
        let book = parse_depth_update(text, "BTCUSDT", &seq).unwrap();
        assert_eq!(book.best_bid().unwrap().price, 100.0);
        assert_eq!(book.best_ask().unwrap().price, 101.0);
    }

    #[test]
    fn parses_exchange_info_filters() {
        let body = serde_json::json!({
            "symbols": [{
                "symbol": "BTCUSDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.001"},
                    {"filterType": "MIN_NOTIONAL", "notional": "5.0"},
                ],
            }],
        });
        let info = parse_exchange_info(&body, "BTCUSDT").unwrap();
        assert_eq!(info.tick_size, 0.10);
        assert_eq!(info.lot_size, 0.001);
        assert_eq!(info.min_notional, 5.0);
    }

    #[test]
    fn exchange_info_missing_symbol_errs() {
        let body = serde_json::json!({ "symbols": [] });
        assert!(parse_exchange_info(&body, "BTCUSDT").is_err());
    }
}
