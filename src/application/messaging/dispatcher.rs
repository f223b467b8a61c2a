//! Event dispatcher - Delivers host events to plugins in emission order

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::entities::HostEvent;
use crate::plugins::PluginManager;

enum QueueItem {
    Event(HostEvent),
    Barrier(oneshot::Sender<()>),
}

/// Producer side of the event queue
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl EventSender {
    /// Queue an event; `false` once the dispatcher is gone
    pub fn emit(&self, event: HostEvent) -> bool {
        let kind = event.kind();
        let sent = self.tx.send(QueueItem::Event(event)).is_ok();
        if !sent {
            tracing::warn!("Dropping {} event, dispatcher stopped", kind);
        }
        sent
    }

    /// Wait until every event queued before this call was delivered
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(QueueItem::Barrier(done_tx)).is_err() {
            return false;
        }
        done_rx.await.is_ok()
    }
}

/// Consumer side of the event queue
pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<QueueItem>,
}

/// Create a connected sender/dispatcher pair
pub fn event_channel() -> (EventSender, EventDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventDispatcher { rx })
}

impl EventDispatcher {
    /// Next event, acknowledging any barriers on the way
    pub async fn next(&mut self) -> Option<HostEvent> {
        loop {
            match self.rx.recv().await? {
                QueueItem::Event(event) => return Some(event),
                QueueItem::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    /// Deliver events until every sender is dropped
    pub async fn run(mut self, plugins: Arc<PluginManager>) {
        tracing::debug!("Event dispatcher started");
        while let Some(event) = self.next().await {
            plugins.dispatch(&event).await;
        }
        tracing::debug!("Event dispatcher stopped");
    }

    pub fn spawn(self, plugins: Arc<PluginManager>) -> JoinHandle<()> {
        tokio::spawn(self.run(plugins))
    }
}
