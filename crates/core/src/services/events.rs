//! In-process report change events.
//!
//! Subscribers (live queue views, dashboards) receive a [`ReportEvent`] for
//! every persisted report change. Delivery is broadcast with a bounded
//! buffer; a subscriber that falls behind loses the oldest events, never
//! blocks the publisher.

use cityfix_db::entities::report::{self, ReportStatus};
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 256;

/// One observed report change.
#[derive(Debug, Clone)]
pub struct ReportEvent {
    pub report: report::Model,
    /// Status before the change. `None` for creation.
    pub previous_status: Option<ReportStatus>,
}

/// Broadcast bus for report changes.
#[derive(Clone)]
pub struct ReportEventBus {
    tx: broadcast::Sender<ReportEvent>,
}

impl ReportEventBus {
    /// Create a new bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Publish a change. Silently dropped when nobody is subscribed.
    pub fn publish(&self, event: ReportEvent) {
        let _ = self.tx.send(event);
    }

    /// Open a subscription starting at the current point in the stream.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReportEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the event stream.
pub struct EventSubscription {
    rx: Option<broadcast::Receiver<ReportEvent>>,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once the subscription is
    /// closed or every bus handle is dropped. Lagged events are skipped.
    pub async fn next(&mut self) -> Option<ReportEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Close the subscription. Further `next` calls return `None`.
    pub fn close(&mut self) {
        self.rx = None;
    }
}
