//! Handlers for `/items` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/items` | Optional `status`, `category_id`, `warehouse_id`, `expiring_before`, `quantity_below` |
//! | `POST` | `/items` | Body: [`NewItem`]; returns 201 + stored item |
//! | `GET`  | `/items/expiring` | Optional `?days=N` (default 30) |
//! | `GET`  | `/items/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use stockroom_core::{
  item::{ItemQuery, NewItem, SupplyItem},
  ledger::MovementLedger,
  store::InventoryStore,
};
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 30;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /items[?status=...][&category_id=...][&quantity_below=...]`
pub async fn list<S>(
  State(ledger): State<MovementLedger<S>>,
  Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<SupplyItem>>, ApiError>
where
  S: InventoryStore,
{
  let items = ledger.store().list_items(&query).await.map_err(ApiError::store)?;
  Ok(Json(items))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /items` — returns 201 + the stored [`SupplyItem`].
pub async fn create<S>(
  State(ledger): State<MovementLedger<S>>,
  Json(body): Json<NewItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  if body.name.trim().is_empty() || body.batch_number.trim().is_empty() {
    return Err(ApiError::BadRequest("name and batch_number must not be blank".into()));
  }
  let item = ledger
    .store()
    .add_item(body, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(item)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /items/:id`
pub async fn get_one<S>(
  State(ledger): State<MovementLedger<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SupplyItem>, ApiError>
where
  S: InventoryStore,
{
  let item = ledger
    .store()
    .get_item(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("item {id} not found")))?;
  Ok(Json(item))
}

// ─── Expiring ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
  pub days: Option<u32>,
}

/// `GET /items/expiring[?days=N]`
pub async fn expiring<S>(
  State(ledger): State<MovementLedger<S>>,
  Query(params): Query<ExpiringParams>,
) -> Result<Json<Vec<SupplyItem>>, ApiError>
where
  S: InventoryStore,
{
  let days  = params.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
  let items = ledger
    .expiring_soon(days, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(items))
}
