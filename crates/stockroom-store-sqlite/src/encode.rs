//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexicographic order equals chronological order. Calendar dates are
//! `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use stockroom_core::{
  catalog::{Category, Warehouse},
  item::{ItemStatus, SupplyItem},
  movement::{MovementType, SupplyMovement},
  principal::Principal,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<ItemStatus> {
  ItemStatus::parse(s).ok_or_else(|| Error::UnknownVariant { column: "status", value: s.to_owned() })
}

pub fn decode_kind(s: &str) -> Result<MovementType> {
  MovementType::parse(s).ok_or_else(|| Error::UnknownVariant { column: "kind", value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `categories` or `warehouses` row: id, name, code and one optional
/// free-text column, in [`CATEGORY_COLUMNS`](crate::schema::CATEGORY_COLUMNS)
/// / [`WAREHOUSE_COLUMNS`](crate::schema::WAREHOUSE_COLUMNS) order.
pub struct RawCatalogEntry {
  pub id:     String,
  pub name:   String,
  pub code:   String,
  pub detail: Option<String>,
}

impl RawCatalogEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, name: row.get(1)?, code: row.get(2)?, detail: row.get(3)? })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.id)?,
      name:        self.name,
      code:        self.code,
      description: self.detail,
    })
  }

  pub fn into_warehouse(self) -> Result<Warehouse> {
    Ok(Warehouse {
      warehouse_id: decode_uuid(&self.id)?,
      name:         self.name,
      code:         self.code,
      address:      self.detail,
    })
  }
}

/// Raw values read directly from a `supply_items` row, in
/// [`ITEM_COLUMNS`](crate::schema::ITEM_COLUMNS) order.
pub struct RawItem {
  pub item_id:         String,
  pub name:            String,
  pub batch_number:    String,
  pub category_id:     String,
  pub warehouse_id:    Option<String>,
  pub quantity:        u32,
  pub unit:            Option<String>,
  pub expiration_date: Option<String>,
  pub status:          String,
  pub version:         i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawItem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:         row.get(0)?,
      name:            row.get(1)?,
      batch_number:    row.get(2)?,
      category_id:     row.get(3)?,
      warehouse_id:    row.get(4)?,
      quantity:        row.get(5)?,
      unit:            row.get(6)?,
      expiration_date: row.get(7)?,
      status:          row.get(8)?,
      version:         row.get(9)?,
      created_at:      row.get(10)?,
      updated_at:      row.get(11)?,
    })
  }

  pub fn into_item(self) -> Result<SupplyItem> {
    Ok(SupplyItem {
      item_id:         decode_uuid(&self.item_id)?,
      name:            self.name,
      batch_number:    self.batch_number,
      category_id:     decode_uuid(&self.category_id)?,
      warehouse_id:    self.warehouse_id.as_deref().map(decode_uuid).transpose()?,
      quantity:        self.quantity,
      unit:            self.unit,
      expiration_date: self.expiration_date.as_deref().map(decode_date).transpose()?,
      status:          decode_status(&self.status)?,
      version:         self.version.max(0) as u64,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `supply_movements` row, in
/// [`MOVEMENT_COLUMNS`](crate::schema::MOVEMENT_COLUMNS) order.
pub struct RawMovement {
  pub movement_id:    String,
  pub item_id:        String,
  pub kind:           String,
  pub quantity:       u32,
  pub recipient_name: Option<String>,
  pub recipient_unit: Option<String>,
  pub notes:          Option<String>,
  pub performed_by:   String,
  pub performed_at:   String,
}

impl RawMovement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      movement_id:    row.get(0)?,
      item_id:        row.get(1)?,
      kind:           row.get(2)?,
      quantity:       row.get(3)?,
      recipient_name: row.get(4)?,
      recipient_unit: row.get(5)?,
      notes:          row.get(6)?,
      performed_by:   row.get(7)?,
      performed_at:   row.get(8)?,
    })
  }

  pub fn into_movement(self) -> Result<SupplyMovement> {
    Ok(SupplyMovement {
      movement_id:    decode_uuid(&self.movement_id)?,
      item_id:        decode_uuid(&self.item_id)?,
      kind:           decode_kind(&self.kind)?,
      quantity:       self.quantity,
      recipient_name: self.recipient_name,
      recipient_unit: self.recipient_unit,
      notes:          self.notes,
      performed_by:   Principal::resolve(Some(&self.performed_by)),
      performed_at:   decode_dt(&self.performed_at)?,
    })
  }
}
