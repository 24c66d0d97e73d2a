//! Error types for `stockroom-core`.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::item::ItemStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("item not found: {0}")]
  ItemNotFound(Uuid),

  #[error("category not found: {0}")]
  CategoryNotFound(Uuid),

  #[error("warehouse not found: {0}")]
  WarehouseNotFound(Uuid),

  #[error("item not in stock (status: {status})")]
  NotInStock { item_id: Uuid, status: ItemStatus },

  #[error("expired item cannot be issued (expired on {expired_on})")]
  Expired { item_id: Uuid, expired_on: NaiveDate },

  #[error("insufficient stock: available {available}, requested {requested}")]
  InsufficientStock { available: u32, requested: u32 },

  #[error("insufficient quantity to write off: available {available}, requested {requested}")]
  InsufficientForWriteOff { available: u32, requested: u32 },

  #[error("movement quantity must be positive")]
  InvalidQuantity,

  #[error("returning {requested} to item {item_id} would overflow its quantity")]
  QuantityOverflow { item_id: Uuid, requested: u32 },

  #[error("an item with batch number {0:?} already exists")]
  DuplicateBatchNumber(String),

  #[error("expiration date {0} is in the past")]
  ExpirationInPast(NaiveDate),

  #[error("an item created as {status} must have zero quantity, got {quantity}")]
  StatusRequiresEmptyStock { status: ItemStatus, quantity: u32 },

  #[error("a {entity} with code {code:?} already exists")]
  DuplicateCode { entity: &'static str, code: String },

  #[error("item {item_id} was modified concurrently (expected version {expected_version})")]
  ConcurrentModification { item_id: Uuid, expected_version: u64 },

  #[error("timed out waiting for item {0}")]
  Timeout(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse failure taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  BusinessRuleViolation,
  /// Isolation conflict; safe to retry from the initial read.
  ConcurrentModification,
  Timeout,
  /// Unexpected storage failure.
  Internal,
}

impl ErrorKind {
  pub fn is_retryable(self) -> bool { matches!(self, Self::ConcurrentModification) }
}

/// Implemented by every error type that can come out of an
/// [`InventoryStore`](crate::store::InventoryStore).
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::ItemNotFound(_) | Error::CategoryNotFound(_) | Error::WarehouseNotFound(_) => {
        ErrorKind::NotFound
      }
      Error::NotInStock { .. }
      | Error::Expired { .. }
      | Error::InsufficientStock { .. }
      | Error::InsufficientForWriteOff { .. }
      | Error::InvalidQuantity
      | Error::QuantityOverflow { .. }
      | Error::DuplicateBatchNumber(_)
      | Error::ExpirationInPast(_)
      | Error::StatusRequiresEmptyStock { .. }
      | Error::DuplicateCode { .. } => ErrorKind::BusinessRuleViolation,
      Error::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
      Error::Timeout(_) => ErrorKind::Timeout,
    }
  }
}
