//! Supply items — the mutable side of the ledger.
//!
//! An item's `quantity` and `status` change only through the
//! [`MovementLedger`](crate::ledger::MovementLedger). Every such change bumps
//! `version`, the token the store checks before writing.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
  InStock,
  /// Fully issued; quantity reached zero through issuance.
  Issued,
  /// Set by an external reclassification process, never by the ledger.
  Expired,
  /// Stock fully consumed by write-off.
  WrittenOff,
}

impl ItemStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InStock => "IN_STOCK",
      Self::Issued => "ISSUED",
      Self::Expired => "EXPIRED",
      Self::WrittenOff => "WRITTEN_OFF",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "IN_STOCK" => Some(Self::InStock),
      "ISSUED" => Some(Self::Issued),
      "EXPIRED" => Some(Self::Expired),
      "WRITTEN_OFF" => Some(Self::WrittenOff),
      _ => None,
    }
  }
}

impl fmt::Display for ItemStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// A tracked batch of material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyItem {
  pub item_id:         Uuid,
  pub name:            String,
  pub batch_number:    String,
  pub category_id:     Uuid,
  pub warehouse_id:    Option<Uuid>,
  pub quantity:        u32,
  pub unit:            Option<String>,
  pub expiration_date: Option<NaiveDate>,
  pub status:          ItemStatus,
  /// Optimistic concurrency token; incremented on every ledger write.
  pub version:         u64,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl SupplyItem {
  /// `true` if the item carries an expiration date strictly before `today`.
  pub fn is_expired_on(&self, today: NaiveDate) -> bool {
    self.expiration_date.is_some_and(|d| d < today)
  }
}

/// Input for creating an item. Everything except ids, timestamps and the
/// version is caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
  pub name:            String,
  pub batch_number:    String,
  pub category_id:     Uuid,
  #[serde(default)]
  pub warehouse_id:    Option<Uuid>,
  pub quantity:        u32,
  #[serde(default)]
  pub unit:            Option<String>,
  #[serde(default)]
  pub expiration_date: Option<NaiveDate>,
  #[serde(default = "default_status")]
  pub status:          ItemStatus,
}

fn default_status() -> ItemStatus { ItemStatus::InStock }

impl NewItem {
  /// Minimal in-stock item with no warehouse, unit or expiry.
  pub fn new(
    name: impl Into<String>,
    batch_number: impl Into<String>,
    category_id: Uuid,
    quantity: u32,
  ) -> Self {
    Self {
      name: name.into(),
      batch_number: batch_number.into(),
      category_id,
      warehouse_id: None,
      quantity,
      unit: None,
      expiration_date: None,
      status: ItemStatus::InStock,
    }
  }

  /// Field rules checked before any lookup: the expiration date may not lie
  /// before `today`, and an item created as `ISSUED` or `WRITTEN_OFF` must
  /// hold no stock.
  pub fn validate(&self, today: NaiveDate) -> crate::Result<()> {
    if let Some(d) = self.expiration_date.filter(|d| *d < today) {
      return Err(crate::Error::ExpirationInPast(d));
    }
    if matches!(self.status, ItemStatus::Issued | ItemStatus::WrittenOff) && self.quantity != 0 {
      return Err(crate::Error::StatusRequiresEmptyStock {
        status:   self.status,
        quantity: self.quantity,
      });
    }
    Ok(())
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`InventoryStore::list_items`](crate::store::InventoryStore::list_items).
/// All filters are conjunctive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemQuery {
  pub status:          Option<ItemStatus>,
  pub category_id:     Option<Uuid>,
  pub warehouse_id:    Option<Uuid>,
  /// Only items with an expiration date strictly before this date.
  pub expiring_before: Option<NaiveDate>,
  /// Only items whose quantity is strictly below this threshold.
  pub quantity_below:  Option<u32>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_serialises_screaming_snake() {
    let json = serde_json::to_string(&ItemStatus::WrittenOff).unwrap();
    assert_eq!(json, "\"WRITTEN_OFF\"");
    assert_eq!(ItemStatus::parse("IN_STOCK"), Some(ItemStatus::InStock));
    assert_eq!(ItemStatus::parse("in_stock"), None);
  }

  #[test]
  fn expiry_is_strictly_before_today() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut item = SupplyItem {
      item_id:         Uuid::new_v4(),
      name:            "Bandage".into(),
      batch_number:    "B-1".into(),
      category_id:     Uuid::new_v4(),
      warehouse_id:    None,
      quantity:        1,
      unit:            None,
      expiration_date: Some(today),
      status:          ItemStatus::InStock,
      version:         0,
      created_at:      Utc::now(),
      updated_at:      Utc::now(),
    };
    assert!(!item.is_expired_on(today));
    item.expiration_date = today.pred_opt();
    assert!(item.is_expired_on(today));
    item.expiration_date = None;
    assert!(!item.is_expired_on(today));
  }

  #[test]
  fn drained_statuses_require_zero_quantity() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut input = NewItem::new("Helmet", "H-9", Uuid::new_v4(), 50);

    input.status = ItemStatus::Issued;
    assert!(matches!(
      input.validate(today),
      Err(crate::Error::StatusRequiresEmptyStock { status: ItemStatus::Issued, quantity: 50 })
    ));
    input.status = ItemStatus::WrittenOff;
    input.quantity = 7;
    assert!(input.validate(today).is_err());

    input.quantity = 0;
    assert!(input.validate(today).is_ok());
    input.status = ItemStatus::Expired;
    input.quantity = 7;
    assert!(input.validate(today).is_ok());
  }

  #[test]
  fn expiration_today_is_accepted() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut input = NewItem::new("Saline", "S-9", Uuid::new_v4(), 1);
    input.expiration_date = Some(today);
    assert!(input.validate(today).is_ok());
    input.expiration_date = today.pred_opt();
    assert!(matches!(input.validate(today), Err(crate::Error::ExpirationInPast(_))));
  }
}
