//! Movements — the immutable audit trail of quantity changes.
//!
//! A movement is written in the same transaction as the item update it
//! describes and is never updated or deleted afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
  Issue,
  Return,
  WriteOff,
}

impl MovementType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Issue => "ISSUE",
      Self::Return => "RETURN",
      Self::WriteOff => "WRITE_OFF",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "ISSUE" => Some(Self::Issue),
      "RETURN" => Some(Self::Return),
      "WRITE_OFF" => Some(Self::WriteOff),
      _ => None,
    }
  }
}

impl fmt::Display for MovementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A persisted movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyMovement {
  pub movement_id:    Uuid,
  pub item_id:        Uuid,
  pub kind:           MovementType,
  /// The delta applied; always positive.
  pub quantity:       u32,
  pub recipient_name: Option<String>,
  pub recipient_unit: Option<String>,
  pub notes:          Option<String>,
  pub performed_by:   Principal,
  /// Assigned by the store when the transaction commits.
  pub performed_at:   DateTime<Utc>,
}

/// A movement that has been validated but not yet written. The store assigns
/// `movement_id` and `performed_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
  pub kind:           MovementType,
  pub quantity:       u32,
  pub recipient_name: Option<String>,
  pub recipient_unit: Option<String>,
  pub notes:          Option<String>,
  pub performed_by:   Principal,
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
  pub item_id:        Uuid,
  pub quantity:       u32,
  #[serde(default)]
  pub recipient_name: Option<String>,
  #[serde(default)]
  pub recipient_unit: Option<String>,
  #[serde(default)]
  pub notes:          Option<String>,
}

impl IssueRequest {
  pub fn new(item_id: Uuid, quantity: u32) -> Self {
    Self { item_id, quantity, recipient_name: None, recipient_unit: None, notes: None }
  }
}

/// Shared shape of return and write-off requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRequest {
  pub item_id:  Uuid,
  pub quantity: u32,
  #[serde(default)]
  pub notes:    Option<String>,
}

impl StockRequest {
  pub fn new(item_id: Uuid, quantity: u32) -> Self { Self { item_id, quantity, notes: None } }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for
/// [`InventoryStore::search_movements`](crate::store::InventoryStore::search_movements).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementQuery {
  pub item_id:          Option<Uuid>,
  pub kind:             Option<MovementType>,
  /// Inclusive lower bound on `performed_at`.
  pub performed_after:  Option<DateTime<Utc>>,
  /// Inclusive upper bound on `performed_at`.
  pub performed_before: Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
}
