use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::error::PriceFetchError;
use crate::exchange::PriceSource;

pub const BINANCE_BASE_URL: &str = "https://api.binance.com";
const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

pub struct BinanceExchange {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceExchange {
    /// Build a client against `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

impl PriceSource for BinanceExchange {
    fn fetch_price(&self, symbol: &str) -> BoxFuture<'_, Result<f64, Report<PriceFetchError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, TICKER_PRICE_PATH);

            let response = self
                .client
                .get(&url)
                .query(&[("symbol", symbol.as_str())])
                .send()
                .await
                .change_context_lazy(|| PriceFetchError::Request {
                    symbol: symbol.clone(),
                })?;

            let status = response.status();
            if !status.is_success() {
                // Unknown symbols come back as 400 with an error body
                let body = response.text().await.unwrap_or_default();
                return Err(Report::new(PriceFetchError::Status { symbol })
                    .attach(format!("HTTP status: {status}"))
                    .attach(format!("body: {body}")));
            }

            let ticker: BinanceTickerPrice =
                response
                    .json()
                    .await
                    .change_context_lazy(|| PriceFetchError::ResponseParse {
                        symbol: symbol.clone(),
                    })?;

            let price = ticker.parse_price(&symbol)?;
            debug!(symbol = %symbol, price, "binance price fetched");
            Ok(price)
        })
    }
}

// ── REST response types ───────────────────────────────────────────────────────

/// `GET /api/v3/ticker/price` body: `{ "symbol": "BTCUSDT", "price": "71000.00" }`.
/// Only the price is read; the echoed symbol is ignored.
#[derive(Debug, Deserialize)]
struct BinanceTickerPrice {
    price: String,
}

impl BinanceTickerPrice {
    fn parse_price(&self, symbol: &str) -> Result<f64, Report<PriceFetchError>> {
        let price = self
            .price
            .parse::<f64>()
            .change_context_lazy(|| PriceFetchError::ResponseParse {
                symbol: symbol.to_owned(),
            })
            .attach_with(|| format!("raw price: {:?}", self.price))?;

        if !(price > 0.0 && price.is_finite()) {
            return Err(Report::new(PriceFetchError::ResponseParse {
                symbol: symbol.to_owned(),
            })
            .attach(format!("non-positive price: {price}")));
        }
        Ok(price)
    }
}
