//! MedStock API Library
//!
//! Medicine stock ledger for a single facility: an expiration-aware
//! inventory with an auditable, reversible transaction log behind an
//! authenticated HTTP API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod request_id;
pub mod services;

use axum::{extract::State, middleware, response::Json, routing::get, Extension, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: request_id::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Composes the full application router.
///
/// `/`, `/health`, the OpenAPI docs and the `/auth/*` pair are open;
/// everything else sits behind the bearer-token middleware.
pub fn app(state: AppState) -> Router {
    let auth_service = state.services.auth.clone();

    Router::new()
        .route("/", get(service_banner))
        .route("/health", get(health_check))
        .merge(openapi::swagger_ui())
        .nest("/auth", auth::auth_routes().with_state(auth_service.clone()))
        // Handler routers carry their full paths; merging keeps the
        // trailing-slash collection URLs matching verbatim.
        .merge(handlers::products::products_routes())
        .merge(handlers::products::batches_routes())
        .merge(handlers::transactions::transactions_routes())
        .merge(handlers::dashboard::dashboard_routes())
        // auth_middleware resolves the service through request extensions
        .layer(Extension(auth_service))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn service_banner() -> Json<ApiResponse<Value>> {
    let banner = json!({
        "service": "medstock-api",
        "version": env!("CARGO_PKG_VERSION"),
    });
    Json(ApiResponse::success(banner))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    db::check_connection(state.db.as_ref()).await?;

    Ok(Json(ApiResponse::success(json!({
        "status": "healthy",
        "database": "connected",
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::request_id::scope_request_id(crate::request_id::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        assert!(DateTime::parse_from_rfc3339(&meta.timestamp).is_ok());
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
    }

    #[tokio::test]
    async fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("oops"));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn validation_errors_are_listed() {
        let response = ApiResponse::<()>::validation_errors(vec!["missing".into()]);
        assert!(!response.success);
        assert_eq!(response.errors, Some(vec!["missing".to_string()]));
    }
}
