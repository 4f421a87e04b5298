pub mod common;
pub mod dashboard;
pub mod products;
pub mod transactions;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    dispensing_service::DispensingService, product_service::ProductService,
    receiving_service::ReceivingService, reporting_service::ReportingService,
    reversal_service::ReversalService,
};
use std::sync::Arc;

/// Aggregated services used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub receiving: Arc<ReceivingService>,
    pub dispensing: Arc<DispensingService>,
    pub reversal: Arc<ReversalService>,
    pub reporting: Arc<ReportingService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, auth: Arc<AuthService>) -> Self {
        Self {
            products: Arc::new(ProductService::new(db.clone(), event_sender.clone())),
            receiving: Arc::new(ReceivingService::new(db.clone(), event_sender.clone())),
            dispensing: Arc::new(DispensingService::new(db.clone(), event_sender.clone())),
            reversal: Arc::new(ReversalService::new(db.clone(), event_sender)),
            reporting: Arc::new(ReportingService::new(db)),
            auth,
        }
    }
}
