//! The `InventoryStore` trait: the Item Store contract plus the
//! transactional unit of work the ledger runs every write through.
//!
//! The trait is implemented by storage backends (e.g.
//! `stockroom-store-sqlite`). Business validation never lives in a backend;
//! it arrives as the `plan` closure passed to
//! [`InventoryStore::commit_movement`].

use std::{future::Future, time::Instant};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  catalog::{Category, NewCategory, NewWarehouse, Warehouse},
  error::Classify,
  item::{ItemQuery, NewItem, SupplyItem},
  movement::{MovementQuery, MovementType, NewMovement, SupplyMovement},
  transition::Transition,
};

/// What a plan closure decides: the item's next state and the movement that
/// records it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMovement {
  pub transition: Transition,
  pub movement:   NewMovement,
}

/// Abstraction over an inventory storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: std::error::Error + Classify + From<crate::Error> + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Fails with [`Error::DuplicateCode`](crate::Error::DuplicateCode) if
  /// the code is taken.
  fn add_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Fails with [`Error::DuplicateCode`](crate::Error::DuplicateCode) if
  /// the code is taken.
  fn add_warehouse(
    &self,
    input: NewWarehouse,
  ) -> impl Future<Output = Result<Warehouse, Self::Error>> + Send + '_;

  fn list_warehouses(
    &self,
  ) -> impl Future<Output = Result<Vec<Warehouse>, Self::Error>> + Send + '_;

  // ── Items ─────────────────────────────────────────────────────────────

  /// Create and persist a new item with `version = 0`.
  ///
  /// Rejects input failing [`NewItem::validate`], a category or warehouse
  /// id that does not resolve
  /// ([`Error::CategoryNotFound`](crate::Error::CategoryNotFound),
  /// [`Error::WarehouseNotFound`](crate::Error::WarehouseNotFound)), and a
  /// batch number already taken
  /// ([`Error::DuplicateBatchNumber`](crate::Error::DuplicateBatchNumber)).
  fn add_item(
    &self,
    input: NewItem,
    today: NaiveDate,
  ) -> impl Future<Output = Result<SupplyItem, Self::Error>> + Send + '_;

  /// Retrieve an item by UUID. Returns `None` if not found.
  fn get_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SupplyItem>, Self::Error>> + Send + '_;

  /// List items matching `query`, oldest first.
  fn list_items<'a>(
    &'a self,
    query: &'a ItemQuery,
  ) -> impl Future<Output = Result<Vec<SupplyItem>, Self::Error>> + Send + 'a;

  // ── Unit of work ──────────────────────────────────────────────────────

  /// Atomically read item `item_id`, let `plan` validate it, write the
  /// planned transition and append the planned movement.
  ///
  /// The read takes the item's write lock, so no other writer can change it
  /// between `plan` and the update. The update is additionally guarded by
  /// the item's `version`; a mismatch fails with
  /// [`Error::ConcurrentModification`](crate::Error::ConcurrentModification).
  /// If the lock cannot be taken before `deadline` the call fails with
  /// [`Error::Timeout`](crate::Error::Timeout). Any error leaves both the
  /// item and the movement log untouched.
  fn commit_movement<F>(
    &self,
    item_id: Uuid,
    deadline: Instant,
    plan: F,
  ) -> impl Future<Output = Result<(SupplyItem, SupplyMovement), Self::Error>> + Send + '_
  where
    F: FnOnce(&SupplyItem) -> crate::Result<PlannedMovement> + Send + 'static;

  // ── Movement reads ────────────────────────────────────────────────────

  /// All movements of one item, newest first.
  fn history(
    &self,
    item_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SupplyMovement>, Self::Error>> + Send + '_;

  /// The `limit` newest movements across all items.
  fn recent(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SupplyMovement>, Self::Error>> + Send + '_;

  /// Movements matching `query`, newest first.
  fn search_movements<'a>(
    &'a self,
    query: &'a MovementQuery,
  ) -> impl Future<Output = Result<Vec<SupplyMovement>, Self::Error>> + Send + 'a;

  /// Sum of the quantities of all `kind` movements recorded for `item_id`.
  fn total_quantity(
    &self,
    item_id: Uuid,
    kind: MovementType,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
