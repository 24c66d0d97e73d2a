//! JSON REST API for Stockroom.
//!
//! Exposes an axum [`Router`] backed by a [`MovementLedger`] over any
//! [`InventoryStore`]. Authentication, TLS, and transport concerns are the
//! caller's responsibility; the acting principal is read from a
//! [`Principal`](stockroom_core::Principal) request extension.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stockroom_api::api_router(ledger.clone()))
//! ```

pub mod catalog;
pub mod error;
pub mod items;
pub mod movements;
pub mod principal;

use axum::{
  Router,
  routing::{get, post},
};
use stockroom_core::{ledger::MovementLedger, store::InventoryStore};

pub use error::ApiError;
pub use principal::CurrentPrincipal;

/// Build a fully-materialised API router for `ledger`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(ledger: MovementLedger<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Catalog
    .route(
      "/categories",
      get(catalog::list_categories::<S>).post(catalog::create_category::<S>),
    )
    .route(
      "/warehouses",
      get(catalog::list_warehouses::<S>).post(catalog::create_warehouse::<S>),
    )
    // Items
    .route("/items", get(items::list::<S>).post(items::create::<S>))
    .route("/items/expiring", get(items::expiring::<S>))
    .route("/items/{id}", get(items::get_one::<S>))
    // Movements
    .route("/movements", get(movements::search::<S>))
    .route("/movements/issue", post(movements::issue::<S>))
    .route("/movements/return", post(movements::return_stock::<S>))
    .route("/movements/write-off", post(movements::write_off::<S>))
    .route("/movements/recent", get(movements::recent::<S>))
    .route("/movements/item/{id}", get(movements::history::<S>))
    .with_state(ledger)
}
