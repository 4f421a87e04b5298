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

    /// Sends an event, logging a warning instead of surfacing the failure.
    /// Event delivery is best-effort and must not fail the originating request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event delivery failed: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductDeleted(Uuid),

    // Stock events
    BatchReceived {
        product_id: Uuid,
        batch_id: Uuid,
        quantity: i32,
    },
    BatchDeleted {
        product_id: Uuid,
        batch_id: Uuid,
    },
    StockDispensed {
        product_id: Uuid,
        quantity: i32,
        batches_touched: usize,
    },
    TransactionReverted {
        transaction_id: Uuid,
        batch_id: Uuid,
        quantity: i32,
    },
}

/// Consumes events from the channel and dispatches them to their handlers.
/// Spawned once at startup; runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::ProductCreated(product_id) => {
                if let Err(e) = handle_product_created(product_id).await {
                    error!(
                        "Failed to handle product created event: product_id={}, error={}",
                        product_id, e
                    );
                }
            }
            Event::ProductDeleted(product_id) => {
                info!("Product {} removed from the catalog", product_id);
            }
            Event::BatchReceived {
                product_id,
                batch_id,
                quantity,
            } => {
                if let Err(e) = handle_batch_received(product_id, batch_id, quantity).await {
                    error!(
                        "Failed to handle batch received event: batch_id={}, error={}",
                        batch_id, e
                    );
                }
            }
            Event::BatchDeleted {
                product_id,
                batch_id,
            } => {
                info!(
                    "Batch {} of product {} removed from stock",
                    batch_id, product_id
                );
            }
            Event::StockDispensed {
                product_id,
                quantity,
                batches_touched,
            } => {
                info!(
                    "Dispensed {} units of product {} across {} batch(es)",
                    quantity, product_id, batches_touched
                );
            }
            Event::TransactionReverted {
                transaction_id,
                batch_id,
                quantity,
            } => {
                warn!(
                    "Transaction {} reverted: {} units credited back to batch {}",
                    transaction_id, quantity, batch_id
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

async fn handle_product_created(product_id: Uuid) -> Result<(), String> {
    info!("Processing product created event for product {}", product_id);
    Ok(())
}

async fn handle_batch_received(
    product_id: Uuid,
    batch_id: Uuid,
    quantity: i32,
) -> Result<(), String> {
    info!(
        "Processing batch received event: product={}, batch={}, quantity={}",
        product_id, batch_id, quantity
    );
    Ok(())
}
