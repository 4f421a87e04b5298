use crate::{
    db::DbPool,
    entities::{batch, product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{Set, *};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog service: product CRUD plus batch deletion. Quantities are never
/// edited here; stock only moves through the ledger engines.
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

/// New catalog entry
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub min_stock: i32,
    pub requires_prescription: bool,
}

/// Product with its batches and derived current stock
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub min_stock: i32,
    pub requires_prescription: bool,
    pub total_stock: i64,
    pub batches: Vec<batch::Model>,
}

impl ProductView {
    fn new(model: product::Model, batches: Vec<batch::Model>) -> Self {
        let total_stock = batches.iter().map(|b| b.quantity as i64).sum();
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            description: model.description,
            min_stock: model.min_stock,
            requires_prescription: model.requires_prescription,
            total_stock,
            batches,
        }
    }
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Add a product to the catalog. SKUs are unique across the facility.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        if input.min_stock < 0 {
            return Err(ServiceError::ValidationError(
                "min_stock cannot be negative".to_string(),
            ));
        }

        let existing = product::Entity::find()
            .filter(product::Column::Sku.eq(input.sku.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU '{}' already exists",
                input.sku
            )));
        }

        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            sku: Set(input.sku),
            description: Set(input.description),
            min_stock: Set(input.min_stock),
            requires_prescription: Set(input.requires_prescription),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!("Created product {} ({})", created.id, created.sku);
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;

        Ok(created)
    }

    /// Every product with its batches embedded.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductView>, ServiceError> {
        let rows = product::Entity::find()
            .find_with_related(batch::Entity)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(model, batches)| ProductView::new(model, batches))
            .collect())
    }

    /// One product with its batches.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductView, ServiceError> {
        let db = self.db_pool.as_ref();

        let model = product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let batches = model
            .find_related(batch::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ProductView::new(model, batches))
    }

    /// Remove a product. The schema cascades the delete to its batches and
    /// every ledger entry that references it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        product::Entity::delete_by_id(product_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!("Deleted product {} and its batches", product_id);
        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        Ok(())
    }

    /// Remove a batch without touching the ledger.
    ///
    /// Deliberately permitted even when the batch has dispensing history:
    /// expired-batch cleanup is the main use of this operation. Consumption
    /// is not reversed; the batch's ledger entries survive with their batch
    /// reference detached, and an OUT entry left behind this way can no
    /// longer be reverted.
    #[instrument(skip(self))]
    pub async fn delete_batch(&self, batch_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();

        let target = batch::Entity::find_by_id(batch_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;

        batch::Entity::delete_by_id(batch_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            "Deleted batch {} of product {}; its ledger entries are now detached",
            batch_id, target.product_id
        );
        self.event_sender
            .send_or_log(Event::BatchDeleted {
                product_id: target.product_id,
                batch_id,
            })
            .await;

        Ok(())
    }
}
