//! HTTP server assembly for Stockroom.
//!
//! Wires a [`MovementLedger`] into the JSON API, attaches the acting
//! [`Principal`] from a trusted request header, and adds request tracing.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::{Request, State},
  middleware::{self, Next},
  response::Response,
};
use serde::Deserialize;
use stockroom_core::{
  Principal,
  ledger::{MovementLedger, RetryPolicy},
  store::InventoryStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STOCKROOM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Header carrying the authenticated user name, set by a trusted proxy.
  /// When unset every write is recorded as `"system"`.
  #[serde(default)]
  pub principal_header: Option<String>,
  #[serde(default = "default_max_attempts")]
  pub max_attempts:     u32,
  #[serde(default = "default_backoff_ms")]
  pub backoff_ms:       u64,
  #[serde(default = "default_lock_timeout_ms")]
  pub lock_timeout_ms:  u64,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("stockroom.db") }
fn default_max_attempts() -> u32 { RetryPolicy::default().max_attempts }
fn default_backoff_ms() -> u64 { RetryPolicy::default().backoff.as_millis() as u64 }
fn default_lock_timeout_ms() -> u64 { RetryPolicy::default().lock_timeout.as_millis() as u64 }

impl ServerConfig {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.max_attempts.max(1),
      backoff:      Duration::from_millis(self.backoff_ms),
      lock_timeout: Duration::from_millis(self.lock_timeout_ms),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the API under `/api`, principal
/// resolution, and request tracing.
pub fn router<S>(ledger: MovementLedger<S>, principal_header: Option<&str>) -> Router
where
  S: InventoryStore + 'static,
{
  let header: Option<Arc<str>> = principal_header.map(Arc::from);
  Router::new()
    .nest("/api", stockroom_api::api_router(ledger))
    .layer(middleware::from_fn_with_state(header, attach_principal))
    .layer(TraceLayer::new_for_http())
}

/// Insert a [`Principal`] extension read from the configured header.
/// A missing, blank or non-UTF-8 value resolves to `"system"`.
async fn attach_principal(
  State(header): State<Option<Arc<str>>>,
  mut req: Request,
  next: Next,
) -> Response {
  let principal = Principal::resolve(
    header
      .as_deref()
      .and_then(|h| req.headers().get(h))
      .and_then(|v| v.to_str().ok()),
  );
  req.extensions_mut().insert(principal);
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use stockroom_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn app(principal_header: Option<&str>) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(MovementLedger::new(Arc::new(store)), principal_header)
  }

  async fn post(app: &Router, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
      builder = builder.header("x-remote-user", user);
    }
    let req    = builder.body(Body::from(body.to_string())).unwrap();
    let resp   = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes  = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  async fn seed(app: &Router) -> String {
    let (status, category) =
      post(app, "/api/categories", None, json!({ "name": "Medical", "code": "MED" })).await;
    assert_eq!(status, StatusCode::CREATED, "{category}");

    let (status, item) = post(
      app,
      "/api/items",
      None,
      json!({
        "name": "Field dressing",
        "batch_number": "FD-7",
        "category_id": category["category_id"],
        "quantity": 40,
      }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    item["item_id"].as_str().unwrap().to_owned()
  }

  #[tokio::test]
  async fn principal_is_taken_from_configured_header() {
    let app = app(Some("x-remote-user")).await;
    let id  = seed(&app).await;

    let (status, movement) = post(
      &app,
      "/api/movements/issue",
      Some("sgt.koval"),
      json!({ "item_id": id, "quantity": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{movement}");
    assert_eq!(movement["performed_by"], "sgt.koval");
  }

  #[tokio::test]
  async fn blank_header_falls_back_to_system() {
    let app = app(Some("x-remote-user")).await;
    let id  = seed(&app).await;

    let (_, movement) = post(
      &app,
      "/api/movements/write-off",
      Some("   "),
      json!({ "item_id": id, "quantity": 1 }),
    )
    .await;
    assert_eq!(movement["performed_by"], "system");
  }

  #[tokio::test]
  async fn header_ignored_when_not_configured() {
    let app = app(None).await;
    let id  = seed(&app).await;

    let (_, movement) = post(
      &app,
      "/api/movements/issue",
      Some("sgt.koval"),
      json!({ "item_id": id, "quantity": 1 }),
    )
    .await;
    assert_eq!(movement["performed_by"], "system");
  }

  #[test]
  fn config_defaults_and_overrides() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9000\nmax_attempts = 5\nbackoff_ms = 10\n",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.principal_header, None);

    let policy = cfg.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff, Duration::from_millis(10));
    assert_eq!(policy.lock_timeout, RetryPolicy::default().lock_timeout);
  }
}
