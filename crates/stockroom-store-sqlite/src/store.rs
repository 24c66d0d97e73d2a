//! [`SqliteStore`] — the SQLite implementation of [`InventoryStore`].

use std::{
  path::Path,
  time::{Duration, Instant},
};

use chrono::{DateTime, NaiveDate, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use stockroom_core::{
  catalog::{Category, NewCategory, NewWarehouse, Warehouse},
  item::{ItemQuery, NewItem, SupplyItem},
  movement::{MovementQuery, MovementType, SupplyMovement},
  store::{InventoryStore, PlannedMovement},
};

use crate::{
  Error, Result,
  encode::{RawCatalogEntry, RawItem, RawMovement, encode_date, encode_dt, encode_uuid},
  error::is_busy,
  schema::{CATEGORY_COLUMNS, ITEM_COLUMNS, MOVEMENT_COLUMNS, SCHEMA, WAREHOUSE_COLUMNS},
};

/// Lock wait applied to calls that do not carry their own deadline.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Stored timestamps keep microseconds; truncate up front so values handed
/// back to callers equal what a later read returns.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An inventory store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Several
/// stores may be opened on the same file; SQLite's write lock then arbitrates
/// between them.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Body of [`InventoryStore::commit_movement`], run on the connection thread.
///
/// `BEGIN IMMEDIATE` takes SQLite's write lock before the item is read, so
/// the read, the plan and both writes see no interleaved writer. Returning
/// early drops `tx`, which rolls back.
fn commit_in_tx<F>(
  conn: &mut rusqlite::Connection,
  item_id: Uuid,
  deadline: Instant,
  plan: F,
) -> Result<(SupplyItem, SupplyMovement)>
where
  F: FnOnce(&SupplyItem) -> stockroom_core::Result<PlannedMovement>,
{
  let timeout = || Error::Core(stockroom_core::Error::Timeout(item_id));

  let remaining = deadline.saturating_duration_since(Instant::now());
  if remaining.is_zero() {
    return Err(timeout());
  }
  conn.busy_timeout(remaining)?;

  let tx = conn
    .transaction_with_behavior(TransactionBehavior::Immediate)
    .map_err(|e| if is_busy(&e) { timeout() } else { Error::Sqlite(e) })?;

  let id_str = encode_uuid(item_id);
  let item = tx
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM supply_items WHERE item_id = ?1"),
      rusqlite::params![id_str],
      RawItem::from_row,
    )
    .optional()?
    .ok_or(stockroom_core::Error::ItemNotFound(item_id))?
    .into_item()?;

  let PlannedMovement { transition, movement } = plan(&item)?;

  let performed_at = now();
  let at_str       = encode_dt(performed_at);

  let updated = tx.execute(
    "UPDATE supply_items
        SET quantity = ?1, status = ?2, version = version + 1, updated_at = ?3
      WHERE item_id = ?4 AND version = ?5",
    rusqlite::params![
      transition.quantity,
      transition.status.as_str(),
      at_str,
      id_str,
      item.version as i64,
    ],
  )?;
  if updated != 1 {
    return Err(
      stockroom_core::Error::ConcurrentModification {
        item_id,
        expected_version: item.version,
      }
      .into(),
    );
  }

  let movement = SupplyMovement {
    movement_id:    Uuid::new_v4(),
    item_id,
    kind:           movement.kind,
    quantity:       movement.quantity,
    recipient_name: movement.recipient_name,
    recipient_unit: movement.recipient_unit,
    notes:          movement.notes,
    performed_by:   movement.performed_by,
    performed_at,
  };

  tx.execute(
    "INSERT INTO supply_movements (
       movement_id, item_id, kind, quantity, recipient_name,
       recipient_unit, notes, performed_by, performed_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(movement.movement_id),
      id_str,
      movement.kind.as_str(),
      movement.quantity,
      movement.recipient_name,
      movement.recipient_unit,
      movement.notes,
      movement.performed_by.as_str(),
      at_str,
    ],
  )?;

  tx.commit()?;

  let item = SupplyItem {
    quantity: transition.quantity,
    status: transition.status,
    version: item.version + 1,
    updated_at: performed_at,
    ..item
  };
  Ok((item, movement))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Result of the checks `add_item` runs inside its transaction.
enum ItemInsert {
  Inserted,
  MissingCategory,
  MissingWarehouse,
  DuplicateBatch,
}

fn row_exists(conn: &rusqlite::Connection, sql: &str, param: &str) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, rusqlite::params![param], |_| Ok(())).optional()?.is_some())
}

/// Insert a catalog row unless its code is taken. Returns `false` on a
/// duplicate code.
fn insert_catalog_entry(
  conn: &mut rusqlite::Connection,
  table: &'static str,
  columns: &'static str,
  entry: &RawCatalogEntry,
) -> rusqlite::Result<bool> {
  conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  if row_exists(&tx, &format!("SELECT 1 FROM {table} WHERE code = ?1"), &entry.code)? {
    return Ok(false);
  }
  tx.execute(
    &format!("INSERT INTO {table} ({columns}) VALUES (?1, ?2, ?3, ?4)"),
    rusqlite::params![entry.id, entry.name, entry.code, entry.detail],
  )?;
  tx.commit()?;
  Ok(true)
}

fn list_catalog(
  conn: &rusqlite::Connection,
  table: &'static str,
  columns: &'static str,
) -> rusqlite::Result<Vec<RawCatalogEntry>> {
  let mut stmt = conn.prepare(&format!("SELECT {columns} FROM {table} ORDER BY name, rowid"))?;
  let rows = stmt.query_map([], RawCatalogEntry::from_row)?.collect();
  rows
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_category(&self, input: NewCategory) -> Result<Category> {
    let category = Category {
      category_id: Uuid::new_v4(),
      name:        input.name,
      code:        input.code,
      description: input.description,
    };
    let entry = RawCatalogEntry {
      id:     encode_uuid(category.category_id),
      name:   category.name.clone(),
      code:   category.code.clone(),
      detail: category.description.clone(),
    };

    let inserted = self
      .conn
      .call(move |conn| Ok(insert_catalog_entry(conn, "categories", CATEGORY_COLUMNS, &entry)?))
      .await?;
    if !inserted {
      return Err(
        stockroom_core::Error::DuplicateCode { entity: "category", code: category.code }.into(),
      );
    }
    debug!(category_id = %category.category_id, code = %category.code, "category created");
    Ok(category)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws = self
      .conn
      .call(|conn| Ok(list_catalog(conn, "categories", CATEGORY_COLUMNS)?))
      .await?;
    raws.into_iter().map(RawCatalogEntry::into_category).collect()
  }

  async fn add_warehouse(&self, input: NewWarehouse) -> Result<Warehouse> {
    let warehouse = Warehouse {
      warehouse_id: Uuid::new_v4(),
      name:         input.name,
      code:         input.code,
      address:      input.address,
    };
    let entry = RawCatalogEntry {
      id:     encode_uuid(warehouse.warehouse_id),
      name:   warehouse.name.clone(),
      code:   warehouse.code.clone(),
      detail: warehouse.address.clone(),
    };

    let inserted = self
      .conn
      .call(move |conn| Ok(insert_catalog_entry(conn, "warehouses", WAREHOUSE_COLUMNS, &entry)?))
      .await?;
    if !inserted {
      return Err(
        stockroom_core::Error::DuplicateCode { entity: "warehouse", code: warehouse.code }.into(),
      );
    }
    debug!(warehouse_id = %warehouse.warehouse_id, code = %warehouse.code, "warehouse created");
    Ok(warehouse)
  }

  async fn list_warehouses(&self) -> Result<Vec<Warehouse>> {
    let raws = self
      .conn
      .call(|conn| Ok(list_catalog(conn, "warehouses", WAREHOUSE_COLUMNS)?))
      .await?;
    raws.into_iter().map(RawCatalogEntry::into_warehouse).collect()
  }

  // ── Items ─────────────────────────────────────────────────────────────────

  async fn add_item(&self, input: NewItem, today: NaiveDate) -> Result<SupplyItem> {
    input.validate(today)?;

    let created_at = now();
    let item = SupplyItem {
      item_id: Uuid::new_v4(),
      name: input.name,
      batch_number: input.batch_number,
      category_id: input.category_id,
      warehouse_id: input.warehouse_id,
      quantity: input.quantity,
      unit: input.unit,
      expiration_date: input.expiration_date,
      status: input.status,
      version: 0,
      created_at,
      updated_at: created_at,
    };

    let id_str       = encode_uuid(item.item_id);
    let batch        = item.batch_number.clone();
    let name         = item.name.clone();
    let category_str = encode_uuid(item.category_id);
    let warehouse    = item.warehouse_id.map(encode_uuid);
    let quantity     = item.quantity;
    let unit         = item.unit.clone();
    let expiration   = item.expiration_date.map(encode_date);
    let status       = item.status.as_str();
    let at_str       = encode_dt(created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, "SELECT 1 FROM categories WHERE category_id = ?1", &category_str)? {
          return Ok(ItemInsert::MissingCategory);
        }
        if let Some(w) = &warehouse
          && !row_exists(&tx, "SELECT 1 FROM warehouses WHERE warehouse_id = ?1", w)?
        {
          return Ok(ItemInsert::MissingWarehouse);
        }
        if row_exists(&tx, "SELECT 1 FROM supply_items WHERE batch_number = ?1", &batch)? {
          return Ok(ItemInsert::DuplicateBatch);
        }

        tx.execute(
          "INSERT INTO supply_items (
             item_id, name, batch_number, category_id, warehouse_id, quantity,
             unit, expiration_date, status, version, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
          rusqlite::params![
            id_str,
            name,
            batch,
            category_str,
            warehouse,
            quantity,
            unit,
            expiration,
            status,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(ItemInsert::Inserted)
      })
      .await?;

    match outcome {
      ItemInsert::Inserted => {}
      ItemInsert::MissingCategory => {
        return Err(stockroom_core::Error::CategoryNotFound(item.category_id).into());
      }
      ItemInsert::MissingWarehouse => {
        let id = item.warehouse_id.unwrap_or_default();
        return Err(stockroom_core::Error::WarehouseNotFound(id).into());
      }
      ItemInsert::DuplicateBatch => {
        return Err(stockroom_core::Error::DuplicateBatchNumber(item.batch_number).into());
      }
    }
    debug!(item_id = %item.item_id, batch = %item.batch_number, "item created");
    Ok(item)
  }

  async fn get_item(&self, id: Uuid) -> Result<Option<SupplyItem>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ITEM_COLUMNS} FROM supply_items WHERE item_id = ?1"),
              rusqlite::params![id_str],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self, query: &ItemQuery) -> Result<Vec<SupplyItem>> {
    let status     = query.status.map(|s| s.as_str());
    let category   = query.category_id.map(encode_uuid);
    let warehouse  = query.warehouse_id.map(encode_uuid);
    let expiring   = query.expiring_before.map(encode_date);
    let below      = query.quantity_below;

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM supply_items
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR category_id = ?2)
              AND (?3 IS NULL OR warehouse_id = ?3)
              AND (?4 IS NULL OR (expiration_date IS NOT NULL AND expiration_date < ?4))
              AND (?5 IS NULL OR quantity < ?5)
            ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, category, warehouse, expiring, below],
            RawItem::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    debug!(count = raws.len(), "listed items");
    raws.into_iter().map(RawItem::into_item).collect()
  }

  // ── Unit of work ──────────────────────────────────────────────────────────

  async fn commit_movement<F>(
    &self,
    item_id: Uuid,
    deadline: Instant,
    plan: F,
  ) -> Result<(SupplyItem, SupplyMovement)>
  where
    F: FnOnce(&SupplyItem) -> stockroom_core::Result<PlannedMovement> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let outcome = commit_in_tx(conn, item_id, deadline, plan);
        // Later calls carry no deadline of their own.
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(outcome)
      })
      .await?
  }

  // ── Movement reads ────────────────────────────────────────────────────────

  async fn history(&self, item_id: Uuid) -> Result<Vec<SupplyMovement>> {
    self
      .search_movements(&MovementQuery { item_id: Some(item_id), ..MovementQuery::default() })
      .await
  }

  async fn recent(&self, limit: usize) -> Result<Vec<SupplyMovement>> {
    self
      .search_movements(&MovementQuery { limit: Some(limit), ..MovementQuery::default() })
      .await
  }

  async fn search_movements(&self, query: &MovementQuery) -> Result<Vec<SupplyMovement>> {
    let item_id = query.item_id.map(encode_uuid);
    let kind    = query.kind.map(|k| k.as_str());
    let after   = query.performed_after.map(encode_dt);
    let before  = query.performed_before.map(encode_dt);
    // SQLite treats a negative LIMIT as "no limit".
    let limit   = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawMovement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MOVEMENT_COLUMNS} FROM supply_movements
            WHERE (?1 IS NULL OR item_id = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR performed_at >= ?3)
              AND (?4 IS NULL OR performed_at <= ?4)
            ORDER BY performed_at DESC, seq DESC
            LIMIT ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![item_id, kind, after, before, limit],
            RawMovement::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMovement::into_movement).collect()
  }

  async fn total_quantity(&self, item_id: Uuid, kind: MovementType) -> Result<u64> {
    let id_str = encode_uuid(item_id);
    let kind   = kind.as_str();

    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(quantity), 0) FROM supply_movements
            WHERE item_id = ?1 AND kind = ?2",
          rusqlite::params![id_str, kind],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total.max(0) as u64)
  }
}
