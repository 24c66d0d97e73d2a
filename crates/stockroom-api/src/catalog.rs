//! Handlers for `/categories` and `/warehouses`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/categories` | Ordered by name |
//! | `POST` | `/categories` | Body: [`NewCategory`]; returns 201 |
//! | `GET`  | `/warehouses` | Ordered by name |
//! | `POST` | `/warehouses` | Body: [`NewWarehouse`]; returns 201 |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use stockroom_core::{
  catalog::{Category, NewCategory, NewWarehouse, Warehouse},
  ledger::MovementLedger,
  store::InventoryStore,
};

use crate::error::ApiError;

fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be blank")));
  }
  Ok(())
}

// ─── Categories ───────────────────────────────────────────────────────────────

pub async fn list_categories<S>(
  State(ledger): State<MovementLedger<S>>,
) -> Result<Json<Vec<Category>>, ApiError>
where
  S: InventoryStore,
{
  Ok(Json(ledger.store().list_categories().await.map_err(ApiError::store)?))
}

pub async fn create_category<S>(
  State(ledger): State<MovementLedger<S>>,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  require("name", &body.name)?;
  require("code", &body.code)?;
  let category = ledger.store().add_category(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

// ─── Warehouses ───────────────────────────────────────────────────────────────

pub async fn list_warehouses<S>(
  State(ledger): State<MovementLedger<S>>,
) -> Result<Json<Vec<Warehouse>>, ApiError>
where
  S: InventoryStore,
{
  Ok(Json(ledger.store().list_warehouses().await.map_err(ApiError::store)?))
}

pub async fn create_warehouse<S>(
  State(ledger): State<MovementLedger<S>>,
  Json(body): Json<NewWarehouse>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  require("name", &body.name)?;
  require("code", &body.code)?;
  let warehouse = ledger.store().add_warehouse(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(warehouse)))
}
