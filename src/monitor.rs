use std::fmt;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exchange::PriceSource;
use crate::model::{Alert, AlertId, Direction};
use crate::notifier::Notifier;
use crate::store::AlertStore;

/// `Above` holds at or over the target, `Below` at or under it.
pub fn condition_holds(direction: Direction, target: f64, price: f64) -> bool {
    match direction {
        Direction::Above => price >= target,
        Direction::Below => price <= target,
    }
}

/// Text sent to the notifier when an alert fires.
pub fn alert_message(alert: &Alert, price: f64) -> String {
    format!(
        "🚨 {} {} {} | Current: {}",
        alert.symbol, alert.direction, alert.target, price
    )
}

/// What happened to one alert during a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    AlreadyTriggered,
    FetchFailed,
    Waiting { price: f64 },
    Triggered { message: String, delivered: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertStatus {
    pub id: AlertId,
    pub symbol: String,
    pub outcome: Outcome,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::AlreadyTriggered => write!(f, "{} already triggered ✅", self.symbol),
            Outcome::FetchFailed => write!(f, "{} price unavailable (skipped)", self.symbol),
            Outcome::Waiting { price } => write!(f, "{} @ {} (waiting)", self.symbol, price),
            Outcome::Triggered {
                message,
                delivered: true,
            } => write!(f, "{message} ✅ (alert sent)"),
            Outcome::Triggered {
                message,
                delivered: false,
            } => write!(f, "{message} ⚠️ (delivery failed)"),
        }
    }
}

/// Per-alert results of one pass over the store, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub statuses: Vec<AlertStatus>,
}

impl CycleReport {
    pub fn triggered(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Triggered { .. }))
    }

    pub fn failed_fetches(&self) -> usize {
        self.count(|o| matches!(o, Outcome::FetchFailed))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.statuses.iter().filter(|s| pred(&s.outcome)).count()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, status) in self.statuses.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{status}")?;
        }
        Ok(())
    }
}

/// Evaluate every alert in the store once.
///
/// The store lock is held only while snapshotting and while flipping a
/// trigger flag, never across network calls. A triggered alert commits even
/// if the notification could not be delivered.
pub async fn evaluate_cycle(
    store: &AlertStore,
    source: &dyn PriceSource,
    notifier: &dyn Notifier,
) -> CycleReport {
    let alerts = store.list().await;
    let mut statuses = Vec::with_capacity(alerts.len());

    for (id, alert) in alerts.into_iter().enumerate() {
        let outcome = evaluate_alert(store, source, notifier, id, &alert).await;
        statuses.push(AlertStatus {
            id,
            symbol: alert.symbol,
            outcome,
        });
    }

    CycleReport { statuses }
}

async fn evaluate_alert(
    store: &AlertStore,
    source: &dyn PriceSource,
    notifier: &dyn Notifier,
    id: AlertId,
    alert: &Alert,
) -> Outcome {
    if alert.triggered {
        return Outcome::AlreadyTriggered;
    }

    let price = match source.fetch_price(&alert.symbol).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = ?e, symbol = %alert.symbol, "price fetch failed, skipping alert this cycle");
            return Outcome::FetchFailed;
        }
    };

    if !condition_holds(alert.direction, alert.target, price) {
        debug!(
            symbol = %alert.symbol,
            direction = %alert.direction,
            target = alert.target,
            price,
            "condition not met"
        );
        return Outcome::Waiting { price };
    }

    // Another evaluator may have won the transition since the snapshot
    if store.get(id).await.is_some_and(|a| a.triggered) {
        return Outcome::AlreadyTriggered;
    }

    let message = alert_message(alert, price);
    let delivered = match notifier.notify(&message).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = ?e, symbol = %alert.symbol, "alert notification failed");
            false
        }
    };

    if !store.mark_triggered(id).await {
        debug!(id, symbol = %alert.symbol, "alert was already marked triggered");
    }

    warn!(
        symbol = %alert.symbol,
        direction = %alert.direction,
        target = alert.target,
        price,
        delivered,
        "ALERT: {message}"
    );

    Outcome::Triggered { message, delivered }
}

/// Drive `evaluate_cycle` every `poll_every` until `cancel` fires.
pub async fn run(
    store: AlertStore,
    source: &dyn PriceSource,
    notifier: &dyn Notifier,
    poll_every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(poll_every);
    // A slow cycle pushes the next one back instead of bunching ticks up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(every_secs = poll_every.as_secs_f64(), "alert monitor started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("alert monitor stopped");
                break;
            }
            _ = ticker.tick() => {
                let report = evaluate_cycle(&store, source, notifier).await;
                info!(
                    alerts = report.statuses.len(),
                    triggered = report.triggered(),
                    failed_fetches = report.failed_fetches(),
                    "poll cycle complete"
                );
                for status in &report.statuses {
                    info!(id = status.id, "{status}");
                }
            }
        }
    }
}
