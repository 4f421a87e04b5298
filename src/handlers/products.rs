use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::handlers::common::{created_response, no_content_response, validate_input};
use crate::services::dispensing_service::DispenseResult;
use crate::services::product_service::{CreateProductInput, ProductView};
use crate::services::receiving_service::{ReceiveBatchInput, ReceiveBatchResult};
use crate::{entities::product, errors::ServiceError, ApiResponse, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_MIN_STOCK: i32 = 10;

fn default_min_stock() -> i32 {
    DEFAULT_MIN_STOCK
}

/// Creates the router for product and stock endpoints.
///
/// Routes carry their full paths (merged into the app router rather
/// than nested) so the trailing-slash collection URLs match exactly.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).delete(delete_product))
        .route("/products/:id/batches/", post(receive_batch))
        .route("/products/:id/dispense/", post(dispense))
        .with_auth()
}

/// Creates the router for standalone batch endpoints
pub fn batches_routes() -> Router<AppState> {
    Router::new()
        .route("/batches/:id", delete(delete_batch))
        .with_auth()
}

/// New product payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    pub description: Option<String>,
    #[serde(default = "default_min_stock")]
    #[validate(range(min = 0))]
    pub min_stock: i32,
    #[serde(default)]
    pub requires_prescription: bool,
}

/// Incoming delivery payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveBatchRequest {
    #[validate(length(min = 1, max = 100))]
    pub batch_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
}

/// Dispense payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct DispenseRequest {
    pub quantity: i32,
}

/// List every product with its batches
#[utoipa::path(
    get,
    path = "/products/",
    responses(
        (status = 200, description = "Catalog with embedded batches", body = ApiResponse<Vec<ProductView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.list_products().await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Fetch one product with its batches
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductView>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/products/",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<product::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = state
        .services
        .products
        .create_product(CreateProductInput {
            name: payload.name,
            sku: payload.sku,
            description: payload.description,
            min_stock: payload.min_stock,
            requires_prescription: payload.requires_prescription,
        })
        .await?;

    Ok(created_response(ApiResponse::success(created)))
}

/// Delete a product and, by cascade, its batches and ledger entries
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete_product(id).await?;
    Ok(no_content_response())
}

/// Receive a new batch of a product
#[utoipa::path(
    post,
    path = "/products/{id}/batches/",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ReceiveBatchRequest,
    responses(
        (status = 201, description = "Batch received", body = ApiResponse<ReceiveBatchResult>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Stock"
)]
pub async fn receive_batch(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveBatchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let received = state
        .services
        .receiving
        .receive_batch(
            id,
            ReceiveBatchInput {
                batch_number: payload.batch_number,
                expiration_date: payload.expiration_date,
                quantity: payload.quantity,
            },
            user.user_id,
        )
        .await?;

    Ok(created_response(ApiResponse::success(received)))
}

/// Dispense stock for a product, soonest-expiring batches first
#[utoipa::path(
    post,
    path = "/products/{id}/dispense/",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = DispenseRequest,
    responses(
        (status = 200, description = "Stock dispensed", body = ApiResponse<DispenseResult>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Stock"
)]
pub async fn dispense(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DispenseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state
        .services
        .dispensing
        .dispense(id, payload.quantity, user.user_id)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// Delete a batch, detaching its ledger entries
#[utoipa::path(
    delete,
    path = "/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 204, description = "Batch deleted"),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Stock"
)]
pub async fn delete_batch(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete_batch(id).await?;
    Ok(no_content_response())
}
