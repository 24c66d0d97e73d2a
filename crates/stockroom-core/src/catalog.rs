//! Reference data an item points at: supply categories and warehouses.
//!
//! Items carry only the ids; [`InventoryStore::add_item`] checks that both
//! resolve before the item is written.
//!
//! [`InventoryStore::add_item`]: crate::store::InventoryStore::add_item

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  /// Short unique code, e.g. `MED`.
  pub code:        String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  pub code:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewCategory {
  pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
    Self { name: name.into(), code: code.into(), description: None }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
  pub warehouse_id: Uuid,
  pub name:         String,
  pub code:         String,
  pub address:      Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarehouse {
  pub name:    String,
  pub code:    String,
  #[serde(default)]
  pub address: Option<String>,
}

impl NewWarehouse {
  pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
    Self { name: name.into(), code: code.into(), address: None }
  }
}
