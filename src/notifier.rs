pub mod telegram;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::NotifyError;

/// Sink for alert notifications.
pub trait Notifier: Send + Sync {
    /// Deliver `message` to the configured destination. Callers treat this as
    /// best-effort and only log failures.
    fn notify(&self, message: &str) -> BoxFuture<'_, Result<(), Report<NotifyError>>>;
}
