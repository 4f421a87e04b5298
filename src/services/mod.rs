// Ledger engines
pub mod dispensing_service;
pub mod receiving_service;
pub mod reversal_service;

// Read-only aggregates
pub mod reporting_service;

// Catalog
pub mod product_service;
