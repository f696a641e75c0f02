//! Application layer containing the store operations.
//!
//! `StoreService` is the entry point for listing, purchasing and consuming
//! products. Purchases go through the `PurchaseFlowCoordinator`, which funnels
//! UI and SDK events through a `tokio` channel so that each flow settles once.

pub mod purchase_flow;
pub mod store;
