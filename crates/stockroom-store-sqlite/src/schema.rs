//! SQL schema for the Stockroom SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    code        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS warehouses (
    warehouse_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    code         TEXT NOT NULL UNIQUE,
    address      TEXT
);

CREATE TABLE IF NOT EXISTS supply_items (
    item_id         TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    batch_number    TEXT NOT NULL UNIQUE,
    category_id     TEXT NOT NULL REFERENCES categories(category_id),
    warehouse_id    TEXT REFERENCES warehouses(warehouse_id),
    quantity        INTEGER NOT NULL CHECK (quantity >= 0),
    unit            TEXT,
    expiration_date TEXT,            -- YYYY-MM-DD or NULL
    status          TEXT NOT NULL
                    CHECK (status IN ('IN_STOCK', 'ISSUED', 'EXPIRED', 'WRITTEN_OFF')),
    version         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (status NOT IN ('ISSUED', 'WRITTEN_OFF') OR quantity = 0)
);

-- Movements are strictly append-only; the triggers below reject any
-- UPDATE or DELETE. `seq` orders rows that share a timestamp.
CREATE TABLE IF NOT EXISTS supply_movements (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    movement_id    TEXT NOT NULL UNIQUE,
    item_id        TEXT NOT NULL REFERENCES supply_items(item_id),
    kind           TEXT NOT NULL CHECK (kind IN ('ISSUE', 'RETURN', 'WRITE_OFF')),
    quantity       INTEGER NOT NULL CHECK (quantity > 0),
    recipient_name TEXT,
    recipient_unit TEXT,
    notes          TEXT,
    performed_by   TEXT NOT NULL,
    performed_at   TEXT NOT NULL     -- fixed-width RFC 3339 UTC; server-assigned
);

CREATE TRIGGER IF NOT EXISTS supply_movements_no_update
BEFORE UPDATE ON supply_movements
BEGIN
    SELECT RAISE(ABORT, 'supply_movements is append-only');
END;

CREATE TRIGGER IF NOT EXISTS supply_movements_no_delete
BEFORE DELETE ON supply_movements
BEGIN
    SELECT RAISE(ABORT, 'supply_movements is append-only');
END;

CREATE INDEX IF NOT EXISTS items_status_idx      ON supply_items(status);
CREATE INDEX IF NOT EXISTS items_category_idx    ON supply_items(category_id);
CREATE INDEX IF NOT EXISTS items_expiration_idx  ON supply_items(expiration_date);
CREATE INDEX IF NOT EXISTS movements_item_idx    ON supply_movements(item_id, performed_at);
CREATE INDEX IF NOT EXISTS movements_recent_idx  ON supply_movements(performed_at);

PRAGMA user_version = 1;
";

pub const CATEGORY_COLUMNS: &str = "category_id, name, code, description";

pub const WAREHOUSE_COLUMNS: &str = "warehouse_id, name, code, address";

/// Columns selected for every `supply_items` read, in [`RawItem`] order.
///
/// [`RawItem`]: crate::encode::RawItem
pub const ITEM_COLUMNS: &str = "item_id, name, batch_number, category_id, warehouse_id, \
   quantity, unit, expiration_date, status, version, created_at, updated_at";

/// Columns selected for every `supply_movements` read, in [`RawMovement`]
/// order.
///
/// [`RawMovement`]: crate::encode::RawMovement
pub const MOVEMENT_COLUMNS: &str = "movement_id, item_id, kind, quantity, recipient_name, \
   recipient_unit, notes, performed_by, performed_at";
