use crate::{
    db::DbPool,
    entities::{
        batch,
        product,
        stock_transaction::{self, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Set, TransactionError, TransactionTrait, *};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Receiving engine: books incoming stock as a new batch plus its IN
/// ledger entry in one atomic unit.
pub struct ReceivingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

/// Incoming delivery details
#[derive(Debug, Clone)]
pub struct ReceiveBatchInput {
    pub batch_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
}

/// The batch and ledger entry created by a receive
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceiveBatchResult {
    pub batch: batch::Model,
    pub transaction: stock_transaction::Model,
}

impl ReceivingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Create a batch for a product and record the IN movement against it.
    ///
    /// The batch id is assigned before the ledger entry is written, and
    /// both inserts share one store transaction, so no reader ever sees an
    /// IN entry with an unresolved batch reference.
    #[instrument(skip(self, input), fields(batch_number = %input.batch_number, quantity = input.quantity))]
    pub async fn receive_batch(
        &self,
        product_id: Uuid,
        input: ReceiveBatchInput,
        acting_user: Uuid,
    ) -> Result<ReceiveBatchResult, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "received quantity must be positive, got {}",
                input.quantity
            )));
        }

        let result = self
            .db_pool
            .transaction::<_, ReceiveBatchResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    product::Entity::find_by_id(product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    let now = Utc::now();
                    let new_batch = batch::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        batch_number: Set(input.batch_number),
                        expiration_date: Set(input.expiration_date),
                        quantity: Set(input.quantity),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let entry = stock_transaction::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product_id),
                        batch_id: Set(Some(new_batch.id)),
                        user_id: Set(Some(acting_user)),
                        transaction_type: Set(TransactionType::In),
                        quantity: Set(input.quantity),
                        timestamp: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(ReceiveBatchResult {
                        batch: new_batch,
                        transaction: entry,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Received batch {} ({} units) for product {}",
            result.batch.id, result.batch.quantity, product_id
        );

        self.event_sender
            .send_or_log(Event::BatchReceived {
                product_id,
                batch_id: result.batch.id,
                quantity: result.batch.quantity,
            })
            .await;

        Ok(result)
    }
}
