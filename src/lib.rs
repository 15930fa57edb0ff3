//! Scan reconciliation and rolling report engine for hub logistics.
//!
//! Reconciles outbound and inbound package-scan streams per shipping
//! route, persists each day's aggregates into an append-only historical
//! store, and answers rolling-window queries over it.

pub mod analytics;
pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod reconcile;
pub mod reference;
pub mod windows;
