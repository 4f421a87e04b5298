use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the MedStock API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MedStock API",
        description = r#"
Medicine stock ledger for a single facility.

Stock arrives as expiration-dated batches, is dispensed
first-expiring-first-out, and every quantity change is recorded as an
attributable IN/OUT transaction that can be selectively reverted.

Authenticate via `POST /auth/login` and pass the token as
`Authorization: Bearer <token>` on every other endpoint.
        "#
    ),
    paths(
        crate::auth::register_handler,
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::receive_batch,
        crate::handlers::products::dispense,
        crate::handlers::products::delete_batch,
        crate::handlers::transactions::transaction_history,
        crate::handlers::transactions::revert_transaction,
        crate::handlers::dashboard::dashboard,
    ),
    components(schemas(
        crate::auth::RegisterRequest,
        crate::auth::LoginRequest,
        crate::auth::TokenResponse,
        crate::auth::UserResponse,
        crate::entities::product::Model,
        crate::entities::batch::Model,
        crate::entities::stock_transaction::Model,
        crate::entities::stock_transaction::TransactionType,
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::ReceiveBatchRequest,
        crate::handlers::products::DispenseRequest,
        crate::services::product_service::ProductView,
        crate::services::receiving_service::ReceiveBatchResult,
        crate::services::dispensing_service::DispenseResult,
        crate::services::dispensing_service::BatchAllocation,
        crate::services::reversal_service::ReversalResult,
        crate::services::reporting_service::DashboardReport,
        crate::services::reporting_service::TransactionView,
        crate::errors::ErrorResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and logout"),
        (name = "Products", description = "Catalog management"),
        (name = "Stock", description = "Receiving, dispensing and batch cleanup"),
        (name = "Transactions", description = "Ledger history and reversal"),
        (name = "Dashboard", description = "Stock overview aggregates")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI router serving the generated document
pub fn swagger_ui<S>() -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
