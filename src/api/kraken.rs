use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use super::{MarketDataSource, OrderSink};
use crate::error::{BotError, Result};
use crate::models::{validate_series, Candle, OrderId, OrderSide};

const KRAKEN_API_BASE: &str = "https://api.kraken.com/0";
const RATE_LIMIT_RPM: u32 = 60; // Kraken public tier: roughly 1 request/second
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const MAX_HISTORY_PAGES: usize = 50;

// Type alias for the rate limiter to simplify signatures
type KrakenRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for the Kraken public REST API.
///
/// Cloneable so it can serve as both the market-data source and (in live
/// mode) the order sink; clones share one rate limiter. Only public
/// endpoints are wired up: order submission needs exchange credentials and
/// request signing, which this bot does not carry, so live submissions are
/// rejected with a clear error instead.
#[derive(Clone)]
pub struct KrakenClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<KrakenRateLimiter>,
}

/// Every Kraken response wraps its payload in `error` + `result`.
#[derive(Debug, Deserialize)]
struct KrakenResponse {
    error: Vec<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// One OHLC row: [time, open, high, low, close, vwap, volume, count]
type OhlcRow = (i64, String, String, String, String, String, String, u64);

impl KrakenClient {
    pub fn new() -> Self {
        Self::with_base_url(KRAKEN_API_BASE)
    }

    /// Point the client at a different base URL (used by HTTP-mock tests).
    pub fn with_base_url(base_url: &str) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).expect("non-zero quota"));
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Rate-limited GET with retry and exponential backoff for transient
    /// failures (network errors, 429, 5xx).
    async fn get_with_retry(&self, url: &str) -> Result<KrakenResponse> {
        let mut last_error: Option<BotError> = None;

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                        tracing::warn!(
                            "Kraken returned {}, retrying in {}ms (attempt {}/{})",
                            status,
                            backoff_ms,
                            attempt,
                            MAX_RETRIES
                        );
                        last_error = Some(BotError::DataUnavailable {
                            pair: String::new(),
                            reason: format!("HTTP {}", status),
                        });
                        sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }

                    // Other 4xx: not transient, don't retry
                    return Err(BotError::DataUnavailable {
                        pair: String::new(),
                        reason: format!("HTTP {}", status),
                    });
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                    tracing::warn!(
                        "Network error: {}, retrying in {}ms (attempt {}/{})",
                        e,
                        backoff_ms,
                        attempt,
                        MAX_RETRIES
                    );
                    last_error = Some(BotError::Connection(e));
                    sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(BotError::Connection(e)),
            }
        }

        Err(last_error.unwrap_or(BotError::DataUnavailable {
            pair: String::new(),
            reason: "all retry attempts failed".to_string(),
        }))
    }

    /// One page of OHLC data plus Kraken's `last` pagination cursor.
    async fn fetch_ohlc_page(
        &self,
        pair: &str,
        interval_minutes: u32,
        since: Option<i64>,
    ) -> Result<(Vec<Candle>, i64)> {
        let mut url = format!(
            "{}/public/OHLC?pair={}&interval={}",
            self.base_url, pair, interval_minutes
        );
        if let Some(since) = since {
            url.push_str(&format!("&since={}", since));
        }

        let response = self.get_with_retry(&url).await.map_err(|e| match e {
            BotError::DataUnavailable { reason, .. } => BotError::DataUnavailable {
                pair: pair.to_string(),
                reason,
            },
            other => other,
        })?;

        if !response.error.is_empty() {
            return Err(BotError::DataUnavailable {
                pair: pair.to_string(),
                reason: response.error.join("; "),
            });
        }

        let result = response.result.ok_or_else(|| BotError::DataUnavailable {
            pair: pair.to_string(),
            reason: "response has no result".to_string(),
        })?;

        self.parse_ohlc_result(pair, result)
    }

    /// The result object maps the (possibly normalized) pair name to the row
    /// array, alongside a `last` cursor.
    fn parse_ohlc_result(
        &self,
        pair: &str,
        result: serde_json::Value,
    ) -> Result<(Vec<Candle>, i64)> {
        let unavailable = |reason: String| BotError::DataUnavailable {
            pair: pair.to_string(),
            reason,
        };

        let object = result
            .as_object()
            .ok_or_else(|| unavailable("result is not an object".to_string()))?;

        let last = object
            .get("last")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| unavailable("missing pagination cursor".to_string()))?;

        let (key, rows_value) = object
            .iter()
            .find(|(key, _)| key.as_str() != "last")
            .ok_or_else(|| unavailable("no OHLC rows in response".to_string()))?;

        let rows: Vec<OhlcRow> = serde_json::from_value(rows_value.clone())
            .map_err(|e| unavailable(format!("malformed OHLC rows for {}: {}", key, e)))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let (time, open, high, low, close, _vwap, volume, _count) = row;
            let timestamp = Utc
                .timestamp_opt(time, 0)
                .single()
                .ok_or_else(|| unavailable(format!("invalid timestamp {}", time)))?;
            let parse = |field: &str, raw: &str| -> Result<f64> {
                raw.parse()
                    .map_err(|_| unavailable(format!("unparseable {}: {:?}", field, raw)))
            };
            candles.push(Candle {
                pair: pair.to_string(),
                timestamp,
                open: parse("open", &open)?,
                high: parse("high", &high)?,
                low: parse("low", &low)?,
                close: parse("close", &close)?,
                volume: parse("volume", &volume)?,
            });
        }

        validate_series(&candles).map_err(unavailable)?;

        Ok((candles, last))
    }
}

impl Default for KrakenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataSource for KrakenClient {
    async fn fetch_ohlc(&self, pair: &str, interval_minutes: u32) -> Result<Vec<Candle>> {
        let (candles, _last) = self.fetch_ohlc_page(pair, interval_minutes, None).await?;
        tracing::debug!("Fetched {} candles for {}", candles.len(), pair);
        Ok(candles)
    }

    async fn load_historical(
        &self,
        pair: &str,
        interval_minutes: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let mut candles: Vec<Candle> = Vec::new();
        let mut since = start.timestamp();

        // Kraken caps each page at 720 rows; follow the `last` cursor until
        // the window is covered or the cursor stops advancing.
        for _ in 0..MAX_HISTORY_PAGES {
            let (page, last) = self
                .fetch_ohlc_page(pair, interval_minutes, Some(since))
                .await?;

            let newest_seen = candles.last().map(|c| c.timestamp);
            let mut advanced = false;
            for candle in page {
                if candle.timestamp < start || candle.timestamp > end {
                    continue;
                }
                if newest_seen.is_some_and(|seen| candle.timestamp <= seen) {
                    continue; // page overlap at the cursor boundary
                }
                candles.push(candle);
                advanced = true;
            }

            if last <= since || !advanced {
                break;
            }
            since = last;
            if since >= end.timestamp() {
                break;
            }
        }

        tracing::info!(
            "Loaded {} historical candles for {} ({} to {})",
            candles.len(),
            pair,
            start,
            end
        );
        Ok(candles)
    }
}

impl OrderSink for KrakenClient {
    async fn submit_order(&self, side: OrderSide, pair: &str, volume: f64) -> Result<OrderId> {
        // AddOrder is a private endpoint; without credentials and request
        // signing this client degrades to public-only operation, mirroring
        // the read-only mode of credential-less exchange clients.
        tracing::warn!(
            "Rejecting {:?} order for {} {}: private API not configured",
            side,
            volume,
            pair
        );
        Err(BotError::OrderRejected {
            reason: "Kraken private API not configured: order submission requires credentials"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ohlc_body() -> String {
        serde_json::json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [1_688_671_200, "30306.1", "30310.2", "30301.7", "30305.7", "30306.1", "3.39243896", 23],
                    [1_688_674_800, "30305.7", "30312.0", "30300.1", "30308.2", "30306.0", "1.12345678", 10]
                ],
                "last": 1_688_674_800
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_ohlc_parses_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/public/OHLC")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(sample_ohlc_body())
            .create_async()
            .await;

        let client = KrakenClient::with_base_url(&server.url());
        let candles = client.fetch_ohlc("XXBTZUSD", 60).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 30306.1);
        assert_eq!(candles[0].close, 30305.7);
        assert_eq!(candles[1].timestamp.timestamp(), 1_688_674_800);
        assert!(candles.iter().all(Candle::is_well_formed));
    }

    #[tokio::test]
    async fn test_exchange_error_maps_to_data_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/public/OHLC")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":["EQuery:Unknown asset pair"],"result":null}"#)
            .create_async()
            .await;

        let client = KrakenClient::with_base_url(&server.url());
        let result = client.fetch_ohlc("BOGUS", 60).await;

        match result {
            Err(BotError::DataUnavailable { pair, reason }) => {
                assert_eq!(pair, "BOGUS");
                assert!(reason.contains("Unknown asset pair"));
            }
            other => panic!("expected DataUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_rows_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/public/OHLC")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":[],"result":{"XXBTZUSD":[["not-a-row"]],"last":1}}"#)
            .create_async()
            .await;

        let client = KrakenClient::with_base_url(&server.url());
        let result = client.fetch_ohlc("XXBTZUSD", 60).await;
        assert!(matches!(result, Err(BotError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_submit_order_without_credentials_is_rejected() {
        let client = KrakenClient::new();
        let result = client.submit_order(OrderSide::Buy, "XXBTZUSD", 0.001).await;
        assert!(matches!(result, Err(BotError::OrderRejected { .. })));
    }
}
