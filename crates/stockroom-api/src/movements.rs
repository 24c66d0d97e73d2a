//! Handlers for `/movements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/movements/issue` | Body: [`IssueRequest`]; returns 201 + movement |
//! | `POST` | `/movements/return` | Body: [`StockRequest`]; returns 201 + movement |
//! | `POST` | `/movements/write-off` | Body: [`StockRequest`]; returns 201 + movement |
//! | `GET`  | `/movements/recent` | Ten newest movements |
//! | `GET`  | `/movements/item/:id` | Full history of one item, newest first |
//! | `GET`  | `/movements` | Optional `item_id`, `kind`, `performed_after`, `performed_before`, `limit` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use stockroom_core::{
  ledger::MovementLedger,
  movement::{IssueRequest, MovementQuery, StockRequest, SupplyMovement},
  store::InventoryStore,
};
use uuid::Uuid;

use crate::{error::ApiError, principal::CurrentPrincipal};

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /movements/issue`
pub async fn issue<S>(
  State(ledger): State<MovementLedger<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  let movement = ledger.issue(&principal, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(movement)))
}

/// `POST /movements/return`
pub async fn return_stock<S>(
  State(ledger): State<MovementLedger<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<StockRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  let movement = ledger.return_stock(&principal, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(movement)))
}

/// `POST /movements/write-off`
pub async fn write_off<S>(
  State(ledger): State<MovementLedger<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<StockRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  let movement = ledger.write_off(&principal, body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(movement)))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /movements/recent`
pub async fn recent<S>(
  State(ledger): State<MovementLedger<S>>,
) -> Result<Json<Vec<SupplyMovement>>, ApiError>
where
  S: InventoryStore,
{
  Ok(Json(ledger.recent().await.map_err(ApiError::store)?))
}

/// `GET /movements/item/:id`
pub async fn history<S>(
  State(ledger): State<MovementLedger<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SupplyMovement>>, ApiError>
where
  S: InventoryStore,
{
  Ok(Json(ledger.history(id).await.map_err(ApiError::store)?))
}

/// `GET /movements[?kind=ISSUE][&performed_after=...][&limit=N]`
pub async fn search<S>(
  State(ledger): State<MovementLedger<S>>,
  Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<SupplyMovement>>, ApiError>
where
  S: InventoryStore,
{
  Ok(Json(ledger.search(&query).await.map_err(ApiError::store)?))
}
