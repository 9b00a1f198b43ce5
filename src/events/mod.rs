use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Things that happen during checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CheckoutStarted(Uuid),
    PaymentSimulated { session_id: Uuid, succeeded: bool },
    OrderCreated { session_id: Option<Uuid>, order_id: Uuid },
    OrderRecordingFailed { session_id: Option<Uuid> },
}

/// Builds a bounded event channel and the matching sender
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::CheckoutStarted(session_id) => {
                info!(%session_id, "Checkout started");
            }
            Event::PaymentSimulated {
                session_id,
                succeeded,
            } => {
                info!(%session_id, succeeded, "Payment simulation finished");
            }
            Event::OrderCreated {
                session_id,
                order_id,
            } => {
                info!(?session_id, %order_id, "Order created");
            }
            Event::OrderRecordingFailed { session_id } => {
                error!(
                    ?session_id,
                    "Order could not be recorded after a successful payment"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}
