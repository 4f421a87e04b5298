use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::services::reporting_service::DashboardReport;
use crate::{errors::ServiceError, ApiResponse, AppState};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Creates the router for the dashboard endpoint
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard)).with_auth()
}

/// Facility stock overview
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Stock aggregates and recent activity", body = ApiResponse<DashboardReport>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.reporting.dashboard().await?;
    Ok(Json(ApiResponse::success(report)))
}
