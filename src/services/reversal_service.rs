use crate::{
    db::DbPool,
    entities::{
        batch,
        stock_transaction::{self, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{sea_query::Expr, TransactionError, TransactionTrait, *};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reversal engine: logical undo of a single OUT movement. The quantity is
/// credited back to the originating batch and the ledger entry is deleted,
/// not counter-posted, so derived balances stay consistent without it.
pub struct ReversalService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

/// Outcome of a reversal
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReversalResult {
    pub transaction_id: Uuid,
    pub batch_id: Uuid,
    pub product_id: Uuid,
    pub restored_quantity: i32,
    /// Batch quantity after the credit
    pub batch_quantity: i32,
}

impl ReversalService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Revert one OUT transaction.
    ///
    /// Only OUT entries can be reverted; an IN entry is undone by deleting
    /// its batch. A transaction whose batch was deleted is terminal: the
    /// stock it moved has nowhere to return to, surfaced as
    /// `OrphanedBatch` so callers can tell it apart from a bad id.
    #[instrument(skip(self))]
    pub async fn revert_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<ReversalResult, ServiceError> {
        let result = self
            .db_pool
            .transaction::<_, ReversalResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let entry = stock_transaction::Entity::find_by_id(transaction_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Transaction {} not found",
                                transaction_id
                            ))
                        })?;

                    if entry.transaction_type != TransactionType::Out {
                        return Err(ServiceError::OnlyOutRevertible);
                    }

                    let target = match entry.batch_id {
                        Some(batch_id) => batch::Entity::find_by_id(batch_id)
                            .lock_exclusive()
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?,
                        None => None,
                    };
                    let target =
                        target.ok_or(ServiceError::OrphanedBatch(transaction_id))?;

                    // Relative credit; the row is locked, so the computed
                    // after-credit quantity matches what lands in the store.
                    let restored = target.quantity + entry.quantity;
                    batch::Entity::update_many()
                        .col_expr(
                            batch::Column::Quantity,
                            Expr::col(batch::Column::Quantity).add(entry.quantity),
                        )
                        .filter(batch::Column::Id.eq(target.id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    stock_transaction::Entity::delete_by_id(entry.id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok(ReversalResult {
                        transaction_id: entry.id,
                        batch_id: target.id,
                        product_id: entry.product_id,
                        restored_quantity: entry.quantity,
                        batch_quantity: restored,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        warn!(
            "Reverted transaction {}: {} units credited back to batch {}",
            result.transaction_id, result.restored_quantity, result.batch_id
        );

        self.event_sender
            .send_or_log(Event::TransactionReverted {
                transaction_id: result.transaction_id,
                batch_id: result.batch_id,
                quantity: result.restored_quantity,
            })
            .await;

        Ok(result)
    }
}
