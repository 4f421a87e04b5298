use chrono::{Days, Utc};
use medstock_api::{
    db::{create_db_pool, run_migrations, DbPool},
    entities::{
        batch,
        product,
        stock_transaction::{self, TransactionType},
        user,
    },
    errors::ServiceError,
    events::EventSender,
    services::{
        dispensing_service::DispensingService,
        receiving_service::{ReceiveBatchInput, ReceivingService},
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::{env, sync::Arc};
use tokio::sync::{mpsc, OnceCell};
use uuid::Uuid;

const TEST_JWT_SECRET: &str =
    "integration_suite_jwt_secret_with_plenty_of_entropy_zyxwvutsrq_0968";

static POOL: OnceCell<Arc<DbPool>> = OnceCell::const_new();

async fn setup() -> (Arc<DbPool>, EventSender) {
    let pool = POOL
        .get_or_init(|| async {
            env::set_var("APP__DATABASE_URL", "sqlite:file:dispensing_test?mode=memory&cache=shared");
            env::set_var("APP__JWT_SECRET", TEST_JWT_SECRET);

            // A shared-cache in-memory SQLite database is deleted once its
            // last connection closes; hold one connection open for the whole
            // test process so pool churn cannot wipe the schema.
            let anchor = create_db_pool().await.expect("Failed to create anchor pool");
            anchor.ping().await.expect("Failed to ping anchor pool");
            std::mem::forget(anchor);

            let pool = Arc::new(create_db_pool().await.expect("Failed to create DB pool"));
            run_migrations(pool.as_ref())
                .await
                .expect("Failed to run migrations");
            pool
        })
        .await
        .clone();

    let (tx, _rx) = mpsc::channel(64);
    (pool, EventSender::new(tx))
}

async fn seed_user(db: &DbPool, username: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set("staff".to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

async fn seed_product(db: &DbPool, sku: &str) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Product {}", sku)),
        sku: Set(sku.to_string()),
        description: Set(None),
        min_stock: Set(10),
        requires_prescription: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert product")
}

async fn batch_quantity(db: &DbPool, batch_id: Uuid) -> i32 {
    batch::Entity::find_by_id(batch_id)
        .one(db)
        .await
        .expect("Failed to load batch")
        .expect("Batch missing")
        .quantity
}

async fn out_transactions(db: &DbPool, product_id: Uuid) -> Vec<stock_transaction::Model> {
    stock_transaction::Entity::find()
        .filter(stock_transaction::Column::ProductId.eq(product_id))
        .filter(stock_transaction::Column::TransactionType.eq(TransactionType::Out))
        .all(db)
        .await
        .expect("Failed to load transactions")
}

#[tokio::test]
async fn dispense_consumes_soonest_expiring_batch_first() {
    let (pool, events) = setup().await;
    let db = pool.as_ref();

    let actor = seed_user(db, "fefo-pharmacist").await;
    let product = seed_product(db, "FEFO-001").await;

    let receiving = ReceivingService::new(pool.clone(), events.clone());
    let today = Utc::now().date_naive();

    // Batch A: more stock, expires later. Batch B: less stock, expires sooner.
    let batch_a = receiving
        .receive_batch(
            product.id,
            ReceiveBatchInput {
                batch_number: "A".into(),
                expiration_date: today + Days::new(10),
                quantity: 5,
            },
            actor.id,
        )
        .await
        .expect("receive A")
        .batch;
    let batch_b = receiving
        .receive_batch(
            product.id,
            ReceiveBatchInput {
                batch_number: "B".into(),
                expiration_date: today + Days::new(5),
                quantity: 3,
            },
            actor.id,
        )
        .await
        .expect("receive B")
        .batch;

    let dispensing = DispensingService::new(pool.clone(), events);
    let result = dispensing
        .dispense(product.id, 4, actor.id)
        .await
        .expect("dispense 4");

    // B drained first, remainder pulled from A
    assert_eq!(result.allocations.len(), 2);
    assert_eq!(result.allocations[0].batch_id, batch_b.id);
    assert_eq!(result.allocations[0].quantity, 3);
    assert_eq!(result.allocations[1].batch_id, batch_a.id);
    assert_eq!(result.allocations[1].quantity, 1);

    assert_eq!(batch_quantity(db, batch_b.id).await, 0);
    assert_eq!(batch_quantity(db, batch_a.id).await, 4);

    let outs = out_transactions(db, product.id).await;
    assert_eq!(outs.len(), 2);
    let against_b: Vec<_> = outs
        .iter()
        .filter(|t| t.batch_id == Some(batch_b.id))
        .collect();
    assert_eq!(against_b.len(), 1);
    assert_eq!(against_b[0].quantity, 3);
    let against_a: Vec<_> = outs
        .iter()
        .filter(|t| t.batch_id == Some(batch_a.id))
        .collect();
    assert_eq!(against_a.len(), 1);
    assert_eq!(against_a[0].quantity, 1);
}

#[tokio::test]
async fn dispense_more_than_available_fails_without_partial_effect() {
    let (pool, events) = setup().await;
    let db = pool.as_ref();

    let actor = seed_user(db, "shortfall-pharmacist").await;
    let product = seed_product(db, "SHORT-001").await;

    let receiving = ReceivingService::new(pool.clone(), events.clone());
    let today = Utc::now().date_naive();
    let first = receiving
        .receive_batch(
            product.id,
            ReceiveBatchInput {
                batch_number: "L1".into(),
                expiration_date: today + Days::new(3),
                quantity: 5,
            },
            actor.id,
        )
        .await
        .expect("receive L1")
        .batch;
    let second = receiving
        .receive_batch(
            product.id,
            ReceiveBatchInput {
                batch_number: "L2".into(),
                expiration_date: today + Days::new(8),
                quantity: 3,
            },
            actor.id,
        )
        .await
        .expect("receive L2")
        .batch;

    let dispensing = DispensingService::new(pool.clone(), events);
    let err = dispensing
        .dispense(product.id, 9, actor.id)
        .await
        .expect_err("only 8 available");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // No batch was touched and no OUT entry was written
    assert_eq!(batch_quantity(db, first.id).await, 5);
    assert_eq!(batch_quantity(db, second.id).await, 3);
    assert!(out_transactions(db, product.id).await.is_empty());
}

#[tokio::test]
async fn dispense_rejects_non_positive_quantities() {
    let (pool, events) = setup().await;
    let db = pool.as_ref();

    let actor = seed_user(db, "zero-pharmacist").await;
    let product = seed_product(db, "ZERO-001").await;

    let dispensing = DispensingService::new(pool.clone(), events);
    for quantity in [0, -5] {
        let err = dispensing
            .dispense(product.id, quantity, actor.id)
            .await
            .expect_err("non-positive quantity");
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));
    }
}

#[tokio::test]
async fn dispense_unknown_product_is_not_found() {
    let (pool, events) = setup().await;
    let actor = seed_user(pool.as_ref(), "lost-pharmacist").await;

    let dispensing = DispensingService::new(pool.clone(), events);
    let err = dispensing
        .dispense(Uuid::new_v4(), 1, actor.id)
        .await
        .expect_err("product does not exist");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn ledger_balances_match_batch_quantities() {
    let (pool, events) = setup().await;
    let db = pool.as_ref();

    let actor = seed_user(db, "ledger-pharmacist").await;
    let product = seed_product(db, "LEDGER-001").await;

    let receiving = ReceivingService::new(pool.clone(), events.clone());
    let dispensing = DispensingService::new(pool.clone(), events);
    let today = Utc::now().date_naive();

    for (number, days, quantity) in [("R1", 4, 6), ("R2", 9, 10), ("R3", 20, 7)] {
        receiving
            .receive_batch(
                product.id,
                ReceiveBatchInput {
                    batch_number: number.into(),
                    expiration_date: today + Days::new(days),
                    quantity,
                },
                actor.id,
            )
            .await
            .expect("receive");
    }
    dispensing.dispense(product.id, 8, actor.id).await.expect("dispense 8");
    dispensing.dispense(product.id, 5, actor.id).await.expect("dispense 5");

    let batches = batch::Entity::find()
        .filter(batch::Column::ProductId.eq(product.id))
        .all(db)
        .await
        .expect("load batches");
    let on_hand: i64 = batches.iter().map(|b| b.quantity as i64).sum();

    let entries = stock_transaction::Entity::find()
        .filter(stock_transaction::Column::ProductId.eq(product.id))
        .all(db)
        .await
        .expect("load ledger");
    let ledger_total: i64 = entries
        .iter()
        .map(|t| match t.transaction_type {
            TransactionType::In => t.quantity as i64,
            TransactionType::Out => -(t.quantity as i64),
        })
        .sum();

    assert_eq!(on_hand, 23 - 13);
    assert_eq!(ledger_total, on_hand);
}
