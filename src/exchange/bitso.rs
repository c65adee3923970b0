//! Bitso REST v3 client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::types::{BookLimits, FeeSchedule};
use super::ExchangeClient;
use crate::config::Config;
use crate::error::ExchangeError;
use crate::metrics;
use crate::orderbook::{InnermostBook, PriceLevel};
use crate::signing::{self, Credentials};
use crate::trading::{Balances, OpenOrder, OrderAck, OrderIntent, Side};

/// Bitso API client.
#[derive(Debug, Clone)]
pub struct BitsoClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, e.g. `https://api.bitso.com/api`.
    base_url: String,
    /// API credentials.
    credentials: Credentials,
}

/// Single entry of an aggregated order book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookEntry {
    /// Price at this level.
    pub price: String,
    /// Amount at this level.
    pub amount: String,
}

/// `order_book` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookPayload {
    /// Bid levels.
    #[serde(default)]
    pub bids: Vec<BookEntry>,
    /// Ask levels.
    #[serde(default)]
    pub asks: Vec<BookEntry>,
}

/// `ticker` payload.
#[derive(Debug, Clone, Deserialize)]
struct TickerPayload {
    book: String,
    last: String,
}

/// `fees` payload.
#[derive(Debug, Clone, Deserialize)]
struct FeesPayload {
    fees: Vec<FeeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeeEntry {
    book: String,
    taker_fee_decimal: Option<String>,
    fee_decimal: Option<String>,
}

/// `balance` payload.
#[derive(Debug, Clone, Deserialize)]
struct BalancePayload {
    balances: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceEntry {
    currency: String,
    available: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AvailableBook {
    book: String,
    minimum_amount: String,
    maximum_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenOrderEntry {
    oid: String,
    book: String,
    side: String,
    #[serde(default)]
    price: Option<String>,
    original_amount: String,
    unfilled_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlacedOrder {
    oid: String,
}

impl BitsoClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(2))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url: config.bitso_api_url.trim_end_matches('/').to_string(),
            credentials: Credentials {
                key: config.bitso_api_key.clone(),
                secret: config.bitso_api_secret.clone(),
            },
        })
    }

    /// Send a signed request and unwrap the `{success, payload, error}` envelope.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, ExchangeError> {
        let mut url = Url::parse(&format!("{}/v3/{}/", self.base_url, endpoint))
            .map_err(|e| ExchangeError::Parse(format!("invalid url for {}: {}", endpoint, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let path = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let auth = {
            let _timer = metrics::timer_signing();
            let nonce = signing::nonce();
            signing::authorization_header(&self.credentials, &nonce, method.as_str(), &path, &body)?
        };

        debug!(method = %method, path = %path, "Sending Bitso request");

        let start = Instant::now();
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, auth);
        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        metrics::record_http_latency(start, endpoint);

        parse_envelope(endpoint, status.as_u16(), &text)
    }
}

/// Unwrap a Bitso response body.
fn parse_envelope<T: DeserializeOwned>(
    endpoint: &str,
    status: u16,
    text: &str,
) -> Result<T, ExchangeError> {
    let success_status = (200..300).contains(&status);

    let json: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) if success_status => {
            return Err(ExchangeError::Parse(format!("{}: {}", endpoint, e)));
        }
        Err(_) => {
            return Err(ExchangeError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: text.to_string(),
            });
        }
    };

    if json.get("success").and_then(Value::as_bool) == Some(false) {
        let error = json.get("error");
        let code = match error.and_then(|e| e.get("code")) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        };
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string();
        return Err(ExchangeError::Api { code, message });
    }

    if !success_status {
        return Err(ExchangeError::Status {
            endpoint: endpoint.to_string(),
            status,
            body: text.to_string(),
        });
    }

    let payload = json
        .get("payload")
        .cloned()
        .ok_or_else(|| ExchangeError::Parse(format!("{}: missing payload", endpoint)))?;

    serde_json::from_value(payload)
        .map_err(|e| ExchangeError::Parse(format!("{} payload: {}", endpoint, e)))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ExchangeError> {
    value
        .trim()
        .parse()
        .map_err(|e| ExchangeError::Parse(format!("{} {:?}: {}", field, value, e)))
}

/// Reduce an aggregated book to its innermost levels.
///
/// Levels that fail to parse are skipped, so a book with no parseable ask is
/// reported as incomplete rather than as a parse error.
pub fn innermost_from_payload(
    pair: &str,
    payload: &OrderBookPayload,
) -> Result<InnermostBook, ExchangeError> {
    let parse_levels = |entries: &[BookEntry]| -> Vec<PriceLevel> {
        entries
            .iter()
            .filter_map(|entry| {
                let price: Decimal = entry.price.parse().ok()?;
                let amount: Decimal = entry.amount.parse().ok()?;
                Some(PriceLevel::new(price, amount))
            })
            .filter(PriceLevel::is_usable)
            .collect()
    };

    let best_bid = parse_levels(&payload.bids)
        .into_iter()
        .max_by(|a, b| a.price.cmp(&b.price));
    let best_ask = parse_levels(&payload.asks)
        .into_iter()
        .min_by(|a, b| a.price.cmp(&b.price));

    InnermostBook::from_levels(pair, best_bid, best_ask).map_err(|side| {
        ExchangeError::IncompleteBook {
            pair: pair.to_string(),
            side,
        }
    })
}

#[async_trait]
impl ExchangeClient for BitsoClient {
    #[instrument(skip(self))]
    async fn get_order_book_innermost(&self, pair: &str) -> Result<InnermostBook, ExchangeError> {
        let start = Instant::now();
        let payload: OrderBookPayload = self
            .request(
                Method::GET,
                "order_book",
                &[("book", pair), ("aggregate", "true")],
                None,
            )
            .await?;
        metrics::record_orderbook_fetch_latency(start, pair);

        innermost_from_payload(pair, &payload)
    }

    #[instrument(skip(self))]
    async fn get_ticker_last_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        let payload: TickerPayload = self
            .request(Method::GET, "ticker", &[("book", pair)], None)
            .await?;
        if payload.book != pair {
            return Err(ExchangeError::UnknownPair(pair.to_string()));
        }
        parse_decimal("last", &payload.last)
    }

    #[instrument(skip(self))]
    async fn get_fees(&self, pairs: &[String]) -> Result<FeeSchedule, ExchangeError> {
        let payload: FeesPayload = self.request(Method::GET, "fees", &[], None).await?;

        let mut fees = FeeSchedule::new();
        for entry in payload.fees {
            if !pairs.is_empty() && !pairs.contains(&entry.book) {
                continue;
            }
            let raw = entry
                .taker_fee_decimal
                .as_deref()
                .or(entry.fee_decimal.as_deref())
                .ok_or_else(|| {
                    ExchangeError::Parse(format!("fee entry for {} has no decimal fee", entry.book))
                })?;
            let fee = parse_decimal("taker_fee_decimal", raw)?;
            fees.insert(entry.book, fee);
        }

        debug!(pairs = fees.len(), "Retrieved fee schedule");
        Ok(fees)
    }

    #[instrument(skip(self))]
    async fn get_balances(&self, assets: &[String]) -> Result<Balances, ExchangeError> {
        let payload: BalancePayload = self.request(Method::GET, "balance", &[], None).await?;

        let mut balances = Balances::new();
        for entry in payload.balances {
            let currency = entry.currency.to_lowercase();
            if !assets.is_empty() && !assets.iter().any(|a| a.eq_ignore_ascii_case(&currency)) {
                continue;
            }
            balances.insert(currency, parse_decimal("available", &entry.available)?);
        }

        debug!(assets = balances.len(), "Retrieved balances");
        Ok(balances)
    }

    #[instrument(skip(self))]
    async fn get_available_books(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, BookLimits>, ExchangeError> {
        let books: Vec<AvailableBook> =
            self.request(Method::GET, "available_books", &[], None).await?;

        let mut limits = HashMap::new();
        for book in books {
            if !pairs.is_empty() && !pairs.contains(&book.book) {
                continue;
            }
            let minimum = parse_decimal("minimum_amount", &book.minimum_amount)?;
            let maximum = parse_decimal("maximum_amount", &book.maximum_amount)?;
            limits.insert(book.book, BookLimits::new(minimum, maximum));
        }

        Ok(limits)
    }

    #[instrument(skip(self))]
    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        let entries: Vec<OpenOrderEntry> =
            self.request(Method::GET, "open_orders", &[], None).await?;

        entries
            .into_iter()
            .map(|entry| {
                let side = entry
                    .side
                    .parse::<Side>()
                    .map_err(|_| ExchangeError::Parse(format!("unknown side {}", entry.side)))?;
                Ok(OpenOrder {
                    order_id: entry.oid,
                    pair: entry.book,
                    side,
                    price: entry
                        .price
                        .as_deref()
                        .map(|p| parse_decimal("price", p))
                        .transpose()?
                        .unwrap_or(Decimal::ZERO),
                    original_amount: parse_decimal("original_amount", &entry.original_amount)?,
                    unfilled_amount: parse_decimal("unfilled_amount", &entry.unfilled_amount)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn cancel_all_orders(&self) -> Result<Vec<String>, ExchangeError> {
        let cancelled: Vec<String> = self
            .request(Method::DELETE, "orders/all", &[], None)
            .await?;
        info!(count = cancelled.len(), "Cancelled all open orders");
        Ok(cancelled)
    }

    #[instrument(skip(self, intent), fields(pair = %intent.pair, side = %intent.side))]
    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck, ExchangeError> {
        intent.validate().map_err(|reason| ExchangeError::Rejected {
            pair: intent.pair.clone(),
            reason,
        })?;

        let body = json!({
            "book": intent.pair,
            "side": intent.side.to_string(),
            "type": intent.order_type.to_string(),
            "major": intent.amount.to_string(),
            "price": intent.price.to_string(),
        });

        let placed: PlacedOrder = self
            .request(Method::POST, "orders", &[], Some(body))
            .await
            .map_err(|e| match e {
                ExchangeError::Api { code, message } => {
                    warn!(code = %code, message = %message, "Order rejected");
                    ExchangeError::Rejected {
                        pair: intent.pair.clone(),
                        reason: format!("{} ({})", message, code),
                    }
                }
                other => other,
            })?;

        Ok(OrderAck {
            order_id: placed.oid,
            pair: intent.pair.clone(),
            side: intent.side,
        })
    }
}
