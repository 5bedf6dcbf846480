pub mod binance;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::PriceFetchError;

/// Source of live spot prices.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn PriceSource`).
pub trait PriceSource: Send + Sync {
    /// Fetch the current price for `symbol`. The returned price is always
    /// finite and positive.
    fn fetch_price(&self, symbol: &str) -> BoxFuture<'_, Result<f64, Report<PriceFetchError>>>;
}
