use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::services::reporting_service::TransactionView;
use crate::services::reversal_service::ReversalResult;
use crate::{errors::ServiceError, ApiResponse, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Creates the router for ledger endpoints
pub fn transactions_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/:id", get(transaction_history))
        .route("/transactions/:id/revert", post(revert_transaction))
        .with_auth()
}

/// Ledger history for a product, newest first
#[utoipa::path(
    get,
    path = "/transactions/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Transaction history with resolved usernames", body = ApiResponse<Vec<TransactionView>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn transaction_history(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let history = state
        .services
        .reporting
        .transaction_history(product_id)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

/// Undo one OUT transaction: credit the batch, erase the record
#[utoipa::path(
    post,
    path = "/transactions/{id}/revert",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction reverted", body = ApiResponse<ReversalResult>),
        (status = 400, description = "Not an OUT transaction", body = crate::errors::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 410, description = "Originating batch no longer exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn revert_transaction(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.reversal.revert_transaction(id).await?;
    Ok(Json(ApiResponse::success(result)))
}
