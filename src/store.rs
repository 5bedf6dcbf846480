use std::sync::Arc;

use chrono::Utc;
use error_stack::Report;
use tokio::sync::RwLock;

use crate::error::ValidationError;
use crate::model::{Alert, AlertId, NewAlert};

/// In-memory, insertion-ordered alert collection shared between the console
/// and the evaluation task.
#[derive(Clone, Default)]
pub struct AlertStore {
    inner: Arc<RwLock<Vec<Alert>>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an alert. The symbol is trimmed and uppercased.
    pub async fn add(&self, new: NewAlert) -> Result<AlertId, Report<ValidationError>> {
        let alert = new.into_alert()?;
        let mut g = self.inner.write().await;
        g.push(alert);
        Ok(g.len() - 1)
    }

    /// Snapshot of all alerts in insertion order.
    pub async fn list(&self) -> Vec<Alert> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, id: AlertId) -> Option<Alert> {
        self.inner.read().await.get(id).cloned()
    }

    /// Flip an alert to triggered. Returns `true` only for the call that
    /// performed the transition.
    pub async fn mark_triggered(&self, id: AlertId) -> bool {
        let mut g = self.inner.write().await;
        match g.get_mut(id) {
            Some(alert) if alert.is_pending() => {
                alert.triggered = true;
                alert.triggered_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn new_alert(symbol: &str, target: f64, direction: Direction) -> NewAlert {
        NewAlert {
            symbol: symbol.into(),
            target,
            direction,
        }
    }

    #[tokio::test]
    async fn add_appends_untriggered_alert_with_uppercase_symbol() {
        let store = AlertStore::new();
        let id = store
            .add(new_alert(" btcusdt ", 70_000.0, Direction::Above))
            .await
            .unwrap();

        assert_eq!(id, 0);
        assert_eq!(store.len().await, 1);
        let alert = store.get(id).await.unwrap();
        assert_eq!(alert.symbol, "BTCUSDT");
        assert_eq!(alert.target, 70_000.0);
        assert_eq!(alert.direction, Direction::Above);
        assert!(!alert.triggered);
        assert!(alert.triggered_at.is_none());
    }

    #[tokio::test]
    async fn add_rejects_empty_symbol() {
        let store = AlertStore::new();
        let err = store
            .add(new_alert("   ", 100.0, Direction::Above))
            .await
            .unwrap_err();
        assert_eq!(*err.current_context(), ValidationError::EmptySymbol);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn add_rejects_non_positive_or_nan_target() {
        let store = AlertStore::new();
        for target in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = store.add(new_alert("BTCUSDT", target, Direction::Below)).await;
            assert!(result.is_err(), "target {target} should be rejected");
        }
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order_and_keeps_duplicates() {
        let store = AlertStore::new();
        store.add(new_alert("ETHUSDT", 2000.0, Direction::Below)).await.unwrap();
        store.add(new_alert("BTCUSDT", 70_000.0, Direction::Above)).await.unwrap();
        store.add(new_alert("BTCUSDT", 70_000.0, Direction::Above)).await.unwrap();

        let symbols: Vec<_> = store.list().await.into_iter().map(|a| a.symbol).collect();
        assert_eq!(symbols, ["ETHUSDT", "BTCUSDT", "BTCUSDT"]);
    }

    #[tokio::test]
    async fn mark_triggered_transitions_once() {
        let store = AlertStore::new();
        let id = store.add(NewAlert::default()).await.unwrap();

        assert!(store.mark_triggered(id).await);
        assert!(!store.mark_triggered(id).await);

        let alert = store.get(id).await.unwrap();
        assert!(alert.triggered);
        assert!(alert.triggered_at.is_some());
    }

    #[tokio::test]
    async fn mark_triggered_unknown_id_is_noop() {
        let store = AlertStore::new();
        assert!(!store.mark_triggered(3).await);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = AlertStore::new();
        let handle = store.clone();
        handle.add(NewAlert::default()).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
