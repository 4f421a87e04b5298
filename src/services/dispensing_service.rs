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
use chrono::Utc;
use sea_orm::{sea_query::Expr, Set, TransactionError, TransactionTrait, *};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Dispensing engine: consumes stock first-expiring-first-out and writes
/// one OUT ledger entry per batch it draws from.
pub struct DispensingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

/// Quantity taken from a single batch during a dispense
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchAllocation {
    pub batch_id: Uuid,
    pub transaction_id: Uuid,
    pub quantity: i32,
}

/// Outcome of a completed dispense
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispenseResult {
    pub product_id: Uuid,
    pub quantity: i32,
    pub allocations: Vec<BatchAllocation>,
}

impl DispensingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Dispense `quantity` units of a product across its batches, soonest
    /// expiration first.
    ///
    /// The coverage check, every batch decrement, and every OUT ledger
    /// insert run inside one store transaction. Candidate rows are read
    /// under `FOR UPDATE` where the backend supports it, and each decrement
    /// is a relative update guarded by the current quantity, so two
    /// dispenses racing over the same batch can never drive it negative.
    /// A shortfall never leaves a partial allocation behind.
    #[instrument(skip(self))]
    pub async fn dispense(
        &self,
        product_id: Uuid,
        quantity: i32,
        acting_user: Uuid,
    ) -> Result<DispenseResult, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "dispense quantity must be positive, got {}",
                quantity
            )));
        }

        let result = self
            .db_pool
            .transaction::<_, DispenseResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    product::Entity::find_by_id(product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    let candidates = batch::Entity::find()
                        .filter(batch::Column::ProductId.eq(product_id))
                        .filter(batch::Column::Quantity.gt(0))
                        .lock_exclusive()
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let available: i64 = candidates.iter().map(|b| b.quantity as i64).sum();
                    if available < quantity as i64 {
                        return Err(ServiceError::InsufficientStock(format!(
                            "product {}: requested {}, available {}",
                            product_id, quantity, available
                        )));
                    }

                    let now = Utc::now();
                    let mut allocations = Vec::new();
                    for (candidate, take) in fefo_plan(candidates, quantity) {
                        // Relative decrement guarded by the live quantity:
                        // matches zero rows if another writer drained the
                        // batch after the coverage check.
                        let decremented = batch::Entity::update_many()
                            .col_expr(
                                batch::Column::Quantity,
                                Expr::col(batch::Column::Quantity).sub(take),
                            )
                            .filter(batch::Column::Id.eq(candidate.id))
                            .filter(batch::Column::Quantity.gte(take))
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        if decremented.rows_affected == 0 {
                            return Err(ServiceError::InsufficientStock(format!(
                                "product {}: batch {} no longer covers {} unit(s)",
                                product_id, candidate.id, take
                            )));
                        }

                        let entry = stock_transaction::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            product_id: Set(product_id),
                            batch_id: Set(Some(candidate.id)),
                            user_id: Set(Some(acting_user)),
                            transaction_type: Set(TransactionType::Out),
                            quantity: Set(take),
                            timestamp: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        allocations.push(BatchAllocation {
                            batch_id: candidate.id,
                            transaction_id: entry.id,
                            quantity: take,
                        });
                    }

                    Ok(DispenseResult {
                        product_id,
                        quantity,
                        allocations,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Dispensed {} units of product {} across {} batch(es)",
            quantity,
            product_id,
            result.allocations.len()
        );

        self.event_sender
            .send_or_log(Event::StockDispensed {
                product_id,
                quantity,
                batches_touched: result.allocations.len(),
            })
            .await;

        Ok(result)
    }
}

/// Splits a requested quantity across candidate batches, soonest expiration
/// first with batch id as the stable tie-break. Batches the plan does not
/// reach are dropped; the caller has already verified total coverage.
fn fefo_plan(mut candidates: Vec<batch::Model>, requested: i32) -> Vec<(batch::Model, i32)> {
    candidates.sort_by(|a, b| {
        a.expiration_date
            .cmp(&b.expiration_date)
            .then(a.id.cmp(&b.id))
    });

    let mut remaining = requested;
    let mut plan = Vec::new();
    for candidate in candidates {
        if remaining == 0 {
            break;
        }
        let take = candidate.quantity.min(remaining);
        remaining -= take;
        plan.push((candidate, take));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn mk_batch(id: u128, expires: NaiveDate, quantity: i32) -> batch::Model {
        batch::Model {
            id: Uuid::from_u128(id),
            product_id: Uuid::from_u128(999),
            batch_number: format!("B-{}", id),
            expiration_date: expires,
            quantity,
            created_at: Utc::now(),
        }
    }

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(offset)
    }

    #[test]
    fn plan_consumes_soonest_expiring_first() {
        // A expires later with more stock, B expires sooner with less
        let a = mk_batch(1, day(10), 5);
        let b = mk_batch(2, day(5), 3);

        let plan = fefo_plan(vec![a, b], 4);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].0.id, Uuid::from_u128(2));
        assert_eq!(plan[0].1, 3);
        assert_eq!(plan[1].0.id, Uuid::from_u128(1));
        assert_eq!(plan[1].1, 1);
    }

    #[test]
    fn plan_stops_once_request_is_covered() {
        let plan = fefo_plan(
            vec![
                mk_batch(1, day(1), 10),
                mk_batch(2, day(2), 10),
                mk_batch(3, day(3), 10),
            ],
            10,
        );

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].1, 10);
    }

    #[test]
    fn plan_breaks_expiration_ties_by_batch_id() {
        let plan = fefo_plan(vec![mk_batch(7, day(3), 4), mk_batch(2, day(3), 4)], 6);

        assert_eq!(plan[0].0.id, Uuid::from_u128(2));
        assert_eq!(plan[0].1, 4);
        assert_eq!(plan[1].0.id, Uuid::from_u128(7));
        assert_eq!(plan[1].1, 2);
    }
}
