use crate::{
    db::DbPool,
    entities::{batch, product, stock_transaction, user},
    errors::ServiceError,
};
use chrono::{DateTime, Days, Utc};
use sea_orm::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Days ahead a batch counts as expiring soon
const EXPIRY_HORIZON_DAYS: u64 = 30;

/// Default number of entries in the dashboard activity feed
const RECENT_ACTIVITY_LIMIT: u64 = 5;

/// Actor name shown on the dashboard feed when the user reference is
/// absent or dangling
const DASHBOARD_ACTOR_SENTINEL: &str = "system";

/// Actor name shown in per-product history for the same case
const HISTORY_ACTOR_SENTINEL: &str = "unknown";

/// Reporting engine: read-only aggregates over the ledger. Every method is
/// a point-in-time snapshot; results may be stale by the time they return.
pub struct ReportingService {
    db_pool: Arc<DbPool>,
}

/// Dashboard aggregate
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardReport {
    pub total_products: u64,
    pub low_stock_products: u64,
    pub expiring_soon_batches: u64,
    pub recent_transactions: Vec<TransactionView>,
}

/// Ledger entry joined with the acting user's display name
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub transaction_type: String,
    pub quantity: i32,
    pub timestamp: DateTime<Utc>,
    pub username: String,
}

impl TransactionView {
    fn from_joined(
        entry: stock_transaction::Model,
        actor: Option<user::Model>,
        sentinel: &str,
    ) -> Self {
        Self {
            id: entry.id,
            product_id: entry.product_id,
            batch_id: entry.batch_id,
            user_id: entry.user_id,
            transaction_type: entry.transaction_type.to_value(),
            quantity: entry.quantity,
            timestamp: entry.timestamp,
            username: actor
                .map(|u| u.username)
                .unwrap_or_else(|| sentinel.to_string()),
        }
    }
}

impl ReportingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Compute the dashboard aggregate: catalog size, products under their
    /// minimum-stock threshold, batches expiring within the horizon, and
    /// the most recent ledger activity.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardReport, ServiceError> {
        let db = self.db_pool.as_ref();

        let stocked = product::Entity::find()
            .find_with_related(batch::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let total_products = stocked.len() as u64;
        let low_stock_products = stocked
            .iter()
            .filter(|(p, batches)| total_stock(batches) < p.min_stock as i64)
            .count() as u64;

        let horizon = Utc::now().date_naive() + Days::new(EXPIRY_HORIZON_DAYS);
        let expiring_soon_batches = batch::Entity::find()
            .filter(batch::Column::Quantity.gt(0))
            .filter(batch::Column::ExpirationDate.lte(horizon))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        let recent = stock_transaction::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(stock_transaction::Column::Timestamp)
            .limit(RECENT_ACTIVITY_LIMIT)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let recent_transactions = recent
            .into_iter()
            .map(|(entry, actor)| {
                TransactionView::from_joined(entry, actor, DASHBOARD_ACTOR_SENTINEL)
            })
            .collect();

        Ok(DashboardReport {
            total_products,
            low_stock_products,
            expiring_soon_batches,
            recent_transactions,
        })
    }

    /// Full ledger history for one product, newest first.
    #[instrument(skip(self))]
    pub async fn transaction_history(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<TransactionView>, ServiceError> {
        let db = self.db_pool.as_ref();

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let rows = stock_transaction::Entity::find()
            .filter(stock_transaction::Column::ProductId.eq(product_id))
            .find_also_related(user::Entity)
            .order_by_desc(stock_transaction::Column::Timestamp)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(entry, actor)| TransactionView::from_joined(entry, actor, HISTORY_ACTOR_SENTINEL))
            .collect())
    }
}

/// Current stock of a product is the sum of its batch quantities
fn total_stock(batches: &[batch::Model]) -> i64 {
    batches.iter().map(|b| b.quantity as i64).sum()
}
