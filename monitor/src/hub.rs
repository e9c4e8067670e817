//! Fan-out of newly fired alerts to live subscribers.

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::warn;

use crate::registry::{Alert, AlertSnapshot};

/// One live subscriber: the registry snapshot taken at subscribe time,
/// then a FIFO stream of every alert fired afterwards. Dropping the
/// receiver is the whole disconnect protocol; there is no identity and
/// no replay.
pub struct Subscription {
    pub initial: AlertSnapshot,
    pub alerts: Receiver<Alert>,
}

pub struct SubscriberHub {
    subscribers: Mutex<Vec<Sender<Alert>>>,
    queue_capacity: usize,
}

impl SubscriberHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            queue_capacity,
        }
    }

    /// Register a subscriber. The caller supplies the snapshot so that
    /// snapshot and registration sit under one consistent registry view.
    pub async fn subscribe(&self, initial: AlertSnapshot) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.subscribers.lock().await.push(tx);

        Subscription {
            initial,
            alerts: rx,
        }
    }

    /// Deliver `alert` to every live subscriber without blocking on slow
    /// consumers. A closed subscriber is pruned here, on the failed
    /// delivery attempt, not proactively; a full queue loses this
    /// delivery but keeps the subscriber.
    pub async fn broadcast(&self, alert: &Alert) {
        let mut subs = self.subscribers.lock().await;
        subs.retain(|tx| match tx.try_send(alert.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(ticker = %alert.ticker, "subscriber queue full, dropping delivery");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}
