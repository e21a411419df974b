//! # Order Confirmation Relay
//!
//! Drains the `order_outbox` table written by checkout and hands each
//! `order.placed` event to an [`OrderNotifier`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout tx ──► order_outbox (delivered_at NULL)                      │
//! │                        │                                                │
//! │  relay_pending:        ▼                                                │
//! │    1. SELECT pending, attempts < max_attempts, oldest first            │
//! │    2. per entry: decode payload ─► notifier.notify(event)              │
//! │         Ok  ─► delivered_at = now                                      │
//! │         Err ─► attempts += 1, last_error                               │
//! │                                                                         │
//! │  Delivery is at-least-once: a crash between notify and the mark        │
//! │  re-sends the entry on the next pass.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failing notifier never touches the order itself.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use cartwright_core::{OrderPlacedEvent, OutboxEntry, ORDER_PLACED_EVENT};
use cartwright_db::Database;

use crate::config::OutboxSettings;
use crate::error::ServiceResult;
use crate::settle;

/// A notifier could not deliver an event.
#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        NotifyError(message.into())
    }
}

/// Receives order confirmations (an email worker, a webhook, a queue).
pub trait OrderNotifier: Send + Sync {
    fn notify(&self, event: &OrderPlacedEvent) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Outcome of one relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Moves outbox entries to a notifier.
pub struct OutboxRelay<N> {
    db: Database,
    notifier: N,
    settings: OutboxSettings,
}

impl<N: OrderNotifier> OutboxRelay<N> {
    pub fn new(db: Database, notifier: N, settings: OutboxSettings) -> Self {
        OutboxRelay { db, notifier, settings }
    }

    /// Handles one batch of pending entries.
    pub async fn relay_pending(&self) -> ServiceResult<RelayReport> {
        let entries = {
            let mut session = self.db.session().await?;
            session
                .outbox()
                .get_pending(self.settings.batch_size, self.settings.max_attempts)
                .await?
        };

        if entries.is_empty() {
            debug!("No pending outbox entries");
            return Ok(RelayReport::default());
        }
        info!(count = entries.len(), "Relaying outbox batch");

        let mut report = RelayReport::default();
        for entry in &entries {
            match self.deliver(entry).await {
                Ok(()) => {
                    self.mark_delivered(entry).await?;
                    report.delivered += 1;
                }
                Err(reason) => {
                    warn!(
                        id = %entry.id,
                        order_id = %entry.order_id,
                        attempts = entry.attempts + 1,
                        error = %reason,
                        "Outbox delivery failed"
                    );
                    self.mark_failed(entry, &reason).await?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Polls every `poll_interval` until `shutdown` receives a message or closes.
    pub async fn run(self, poll_interval: Duration, mut shutdown: mpsc::Receiver<()>) {
        info!("Outbox relay starting");

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.relay_pending().await {
                        error!(error = %e, "Outbox relay pass failed");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("Outbox relay stopped");
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), String> {
        if entry.event_type != ORDER_PLACED_EVENT {
            return Err(format!("unknown event type '{}'", entry.event_type));
        }
        let event: OrderPlacedEvent =
            serde_json::from_str(&entry.payload).map_err(|e| format!("bad payload: {e}"))?;

        self.notifier.notify(&event).await.map_err(|e| e.to_string())
    }

    async fn mark_delivered(&self, entry: &OutboxEntry) -> ServiceResult<()> {
        let mut uow = self.db.begin().await?;
        let result = uow.outbox().mark_delivered(&entry.id).await.map_err(Into::into);
        settle(uow, result).await?;
        debug!(id = %entry.id, order_id = %entry.order_id, "Outbox entry delivered");
        Ok(())
    }

    async fn mark_failed(&self, entry: &OutboxEntry, reason: &str) -> ServiceResult<()> {
        let mut uow = self.db.begin().await?;
        let result = uow.outbox().mark_failed(&entry.id, reason).await.map_err(Into::into);
        settle(uow, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;

    use cartwright_core::{Order, OrderStatus};
    use cartwright_db::repository::order::generate_order_id;
    use cartwright_db::DbConfig;

    #[derive(Clone, Default)]
    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl OrderNotifier for CountingNotifier {
        async fn notify(&self, _event: &OrderPlacedEvent) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::new("smtp unavailable"));
            }
            Ok(())
        }
    }

    async fn setup(payload: Option<&str>) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let order = Order {
            id: generate_order_id(),
            user_id: "user-1".to_string(),
            total_cents: 1000,
            status: OrderStatus::Placed,
            shipping_name: "Jane Doe".to_string(),
            shipping_email: "jane@example.com".to_string(),
            shipping_phone: None,
            shipping_address: "1 Loop Rd".to_string(),
            created_at: now,
            updated_at: now,
        };
        let event = OrderPlacedEvent {
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            shipping_name: order.shipping_name.clone(),
            shipping_email: order.shipping_email.clone(),
            total_cents: order.total_cents,
            lines: Vec::new(),
            placed_at: now,
        };
        let payload = match payload {
            Some(raw) => raw.to_string(),
            None => serde_json::to_string(&event).unwrap(),
        };

        let mut uow = db.begin().await.unwrap();
        uow.orders().insert(&order).await.unwrap();
        uow.outbox().enqueue(ORDER_PLACED_EVENT, &order.id, &payload).await.unwrap();
        uow.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_delivers_once() {
        let db = setup(None).await;
        let notifier = CountingNotifier::default();
        let relay = OutboxRelay::new(db.clone(), notifier.clone(), OutboxSettings::default());

        let report = relay.relay_pending().await.unwrap();
        assert_eq!(report, RelayReport { delivered: 1, failed: 0 });

        let report = relay.relay_pending().await.unwrap();
        assert_eq!(report, RelayReport::default());
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_stop_at_max_attempts() {
        let db = setup(None).await;
        let notifier = CountingNotifier {
            fail: true,
            ..Default::default()
        };
        let settings = OutboxSettings {
            batch_size: 10,
            max_attempts: 2,
        };
        let relay = OutboxRelay::new(db.clone(), notifier.clone(), settings);

        assert_eq!(relay.relay_pending().await.unwrap().failed, 1);
        assert_eq!(relay.relay_pending().await.unwrap().failed, 1);
        assert_eq!(relay.relay_pending().await.unwrap(), RelayReport::default());
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 2);

        let mut session = db.session().await.unwrap();
        assert_eq!(session.outbox().count_pending().await.unwrap(), 1);
        let pending = session.outbox().get_pending(10, 10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("Notification failed: smtp unavailable"));
    }

    #[tokio::test]
    async fn test_bad_payload_is_a_failure() {
        let db = setup(Some("{not json")).await;
        let notifier = CountingNotifier::default();
        let relay = OutboxRelay::new(db, notifier.clone(), OutboxSettings::default());

        let report = relay.relay_pending().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }
}
