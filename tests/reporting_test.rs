use chrono::{Days, Duration, NaiveDate, Utc};
use medstock_api::{
    db::{establish_connection, run_migrations, DbPool},
    entities::{
        batch,
        product,
        stock_transaction::{self, TransactionType},
        user,
    },
    errors::ServiceError,
    services::reporting_service::ReportingService,
};
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

/// Dashboard aggregates count the whole store, so each test gets its own
/// named in-memory database instead of a shared one.
async fn setup(db_name: &str) -> Arc<DbPool> {
    let url = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);
    let pool = Arc::new(
        establish_connection(&url)
            .await
            .expect("Failed to create DB pool"),
    );
    run_migrations(pool.as_ref())
        .await
        .expect("Failed to run migrations");
    pool
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

async fn seed_product(db: &DbPool, sku: &str, min_stock: i32) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Product {}", sku)),
        sku: Set(sku.to_string()),
        description: Set(None),
        min_stock: Set(min_stock),
        requires_prescription: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert product")
}

async fn seed_batch(
    db: &DbPool,
    product_id: Uuid,
    quantity: i32,
    expiration_date: NaiveDate,
) -> batch::Model {
    batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        batch_number: Set(format!("LOT-{}", Uuid::new_v4())),
        expiration_date: Set(expiration_date),
        quantity: Set(quantity),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert batch")
}

async fn seed_entry(
    db: &DbPool,
    product_id: Uuid,
    user_id: Option<Uuid>,
    kind: TransactionType,
    quantity: i32,
    timestamp: chrono::DateTime<Utc>,
) -> stock_transaction::Model {
    stock_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        batch_id: Set(None),
        user_id: Set(user_id),
        transaction_type: Set(kind),
        quantity: Set(quantity),
        timestamp: Set(timestamp),
    }
    .insert(db)
    .await
    .expect("Failed to insert transaction")
}

#[tokio::test]
async fn dashboard_counts_low_stock_and_expiring_batches() {
    let pool = setup("reporting_dashboard_counts").await;
    let db = pool.as_ref();
    let today = Utc::now().date_naive();

    // Under threshold: 9 on hand against a minimum of 10
    let low = seed_product(db, "DASH-LOW", 10).await;
    seed_batch(db, low.id, 9, today + Days::new(60)).await;

    // Exactly at threshold is not low stock
    let boundary = seed_product(db, "DASH-EDGE", 10).await;
    seed_batch(db, boundary.id, 10, today + Days::new(10)).await;

    // No minimum configured, nothing on hand
    let unmanaged = seed_product(db, "DASH-NONE", 0).await;
    seed_batch(db, unmanaged.id, 0, today + Days::new(5)).await;

    let report = ReportingService::new(pool.clone())
        .dashboard()
        .await
        .expect("dashboard");

    assert_eq!(report.total_products, 3);
    assert_eq!(report.low_stock_products, 1);
    // Only the boundary product's batch is inside the 30-day horizon with
    // stock remaining; the drained batch does not count.
    assert_eq!(report.expiring_soon_batches, 1);
    assert!(report.recent_transactions.is_empty());
}

#[tokio::test]
async fn dashboard_activity_feed_is_newest_first_and_capped() {
    let pool = setup("reporting_dashboard_feed").await;
    let db = pool.as_ref();

    let actor = seed_user(db, "feed-user").await;
    let product = seed_product(db, "DASH-FEED", 10).await;

    let base = Utc::now();
    for i in 0..6 {
        seed_entry(
            db,
            product.id,
            Some(actor.id),
            TransactionType::In,
            i + 1,
            base + Duration::seconds(i as i64),
        )
        .await;
    }
    // Newest entry has no actor at all
    seed_entry(
        db,
        product.id,
        None,
        TransactionType::Out,
        2,
        base + Duration::seconds(60),
    )
    .await;

    let report = ReportingService::new(pool.clone())
        .dashboard()
        .await
        .expect("dashboard");

    assert_eq!(report.recent_transactions.len(), 5);
    let newest = &report.recent_transactions[0];
    assert_eq!(newest.transaction_type, "OUT");
    assert_eq!(newest.quantity, 2);
    assert_eq!(newest.username, "system");

    // The rest of the feed carries the actor's name, newest first
    assert_eq!(report.recent_transactions[1].quantity, 6);
    assert_eq!(report.recent_transactions[1].username, "feed-user");
    assert_eq!(report.recent_transactions[4].quantity, 3);
}

#[tokio::test]
async fn history_is_scoped_to_the_product_and_newest_first() {
    let pool = setup("reporting_history").await;
    let db = pool.as_ref();

    let actor = seed_user(db, "history-user").await;
    let product = seed_product(db, "HIST-001", 10).await;
    let other = seed_product(db, "HIST-002", 10).await;

    let base = Utc::now();
    seed_entry(db, product.id, Some(actor.id), TransactionType::In, 10, base).await;
    seed_entry(
        db,
        product.id,
        None,
        TransactionType::Out,
        3,
        base + Duration::seconds(10),
    )
    .await;
    seed_entry(db, other.id, Some(actor.id), TransactionType::In, 99, base).await;

    let history = ReportingService::new(pool.clone())
        .transaction_history(product.id)
        .await
        .expect("history");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].transaction_type, "OUT");
    assert_eq!(history[0].quantity, 3);
    assert_eq!(history[0].username, "unknown");
    assert_eq!(history[1].transaction_type, "IN");
    assert_eq!(history[1].quantity, 10);
    assert_eq!(history[1].username, "history-user");
}

#[tokio::test]
async fn history_for_unknown_product_is_not_found() {
    let pool = setup("reporting_history_missing").await;

    let err = ReportingService::new(pool.clone())
        .transaction_history(Uuid::new_v4())
        .await
        .expect_err("product does not exist");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
