//! [`MovementLedger`] — issue, return and write-off orchestration.
//!
//! Every write runs as one [`InventoryStore::commit_movement`] unit of work:
//! read the item under lock, validate via [`crate::transition`], write the
//! item, append the movement, commit. Isolation conflicts are retried from
//! the initial read with exponential backoff; everything else surfaces
//! immediately.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  error::Classify,
  item::{ItemQuery, SupplyItem},
  movement::{
    IssueRequest, MovementQuery, MovementType, NewMovement, StockRequest, SupplyMovement,
  },
  principal::Principal,
  store::{InventoryStore, PlannedMovement},
  transition,
};

/// Number of movements returned by [`MovementLedger::recent`].
pub const RECENT_LIMIT: usize = 10;

// ─── Retry policy ────────────────────────────────────────────────────────────

/// Bounds on how long a single ledger write may wait and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Values below 1 behave as 1.
  pub max_attempts: u32,
  /// Delay before the first retry; doubled for each further retry.
  pub backoff:      Duration,
  /// Upper bound on waiting for the item's write lock, per attempt.
  pub lock_timeout: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff:      Duration::from_millis(25),
      lock_timeout: Duration::from_secs(5),
    }
  }
}

impl RetryPolicy {
  /// Delay to sleep after failed attempt number `attempt` (1-based).
  pub fn backoff_for(&self, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    self.backoff.saturating_mul(1 << shift)
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The state machine governing quantity changes, over any
/// [`InventoryStore`].
pub struct MovementLedger<S> {
  store:  Arc<S>,
  policy: RetryPolicy,
}

impl<S> Clone for MovementLedger<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store), policy: self.policy } }
}

fn today() -> NaiveDate { Utc::now().date_naive() }

impl<S: InventoryStore> MovementLedger<S> {
  pub fn new(store: Arc<S>) -> Self { Self::with_policy(store, RetryPolicy::default()) }

  pub fn with_policy(store: Arc<S>, policy: RetryPolicy) -> Self { Self { store, policy } }

  /// The underlying store, for item management and reads.
  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn policy(&self) -> RetryPolicy { self.policy }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Issue stock to a recipient.
  ///
  /// Fails if the item is missing, not `IN_STOCK`, expired before today, or
  /// holds less than `request.quantity`. Issuing the last unit marks the
  /// item `ISSUED`.
  pub async fn issue(
    &self,
    principal: &Principal,
    request: IssueRequest,
  ) -> Result<SupplyMovement, S::Error> {
    info!(
      item_id = %request.item_id,
      quantity = request.quantity,
      %principal,
      "issuing item"
    );

    let item_id = request.item_id;
    let performed_by = principal.clone();
    let movement = self
      .run(item_id, move |item: &SupplyItem| {
        let transition = transition::plan_issue(item, request.quantity, today())?;
        Ok(PlannedMovement {
          transition,
          movement: NewMovement {
            kind: MovementType::Issue,
            quantity: request.quantity,
            recipient_name: request.recipient_name,
            recipient_unit: request.recipient_unit,
            notes: request.notes,
            performed_by,
          },
        })
      })
      .await?;

    info!(movement_id = %movement.movement_id, "item issued");
    Ok(movement)
  }

  /// Return stock. Always succeeds for an existing item and resets its
  /// status to `IN_STOCK`.
  pub async fn return_stock(
    &self,
    principal: &Principal,
    request: StockRequest,
  ) -> Result<SupplyMovement, S::Error> {
    info!(
      item_id = %request.item_id,
      quantity = request.quantity,
      %principal,
      "returning item"
    );

    let movement = self
      .stock_movement(principal, request, MovementType::Return, transition::plan_return)
      .await?;

    info!(movement_id = %movement.movement_id, "item returned");
    Ok(movement)
  }

  /// Write stock off. Fails if the item holds less than `request.quantity`;
  /// writing off the last unit marks the item `WRITTEN_OFF`.
  pub async fn write_off(
    &self,
    principal: &Principal,
    request: StockRequest,
  ) -> Result<SupplyMovement, S::Error> {
    info!(
      item_id = %request.item_id,
      quantity = request.quantity,
      %principal,
      "writing off item"
    );

    let movement = self
      .stock_movement(principal, request, MovementType::WriteOff, transition::plan_write_off)
      .await?;

    info!(movement_id = %movement.movement_id, "item written off");
    Ok(movement)
  }

  async fn stock_movement(
    &self,
    principal: &Principal,
    request: StockRequest,
    kind: MovementType,
    plan: fn(&SupplyItem, u32) -> crate::Result<transition::Transition>,
  ) -> Result<SupplyMovement, S::Error> {
    let performed_by = principal.clone();
    self
      .run(request.item_id, move |item: &SupplyItem| {
        let transition = plan(item, request.quantity)?;
        Ok(PlannedMovement {
          transition,
          movement: NewMovement {
            kind,
            quantity: request.quantity,
            recipient_name: None,
            recipient_unit: None,
            notes: request.notes,
            performed_by,
          },
        })
      })
      .await
  }

  /// Drive `plan` through the store, retrying isolation conflicts.
  async fn run<F>(&self, item_id: Uuid, plan: F) -> Result<SupplyMovement, S::Error>
  where
    F: FnOnce(&SupplyItem) -> crate::Result<PlannedMovement> + Clone + Send + 'static,
  {
    let max_attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      let deadline = Instant::now() + self.policy.lock_timeout;
      match self.store.commit_movement(item_id, deadline, plan.clone()).await {
        Ok((item, movement)) => {
          debug!(
            %item_id,
            quantity = item.quantity,
            status = %item.status,
            version = item.version,
            "item updated"
          );
          return Ok(movement);
        }
        Err(e) if e.kind().is_retryable() && attempt < max_attempts => {
          let delay = self.policy.backoff_for(attempt);
          warn!(%item_id, attempt, ?delay, error = %e, "conflicting write, retrying");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Every movement of `item_id`, newest first.
  pub async fn history(&self, item_id: Uuid) -> Result<Vec<SupplyMovement>, S::Error> {
    self.store.history(item_id).await
  }

  /// The [`RECENT_LIMIT`] newest movements across all items.
  pub async fn recent(&self) -> Result<Vec<SupplyMovement>, S::Error> {
    self.store.recent(RECENT_LIMIT).await
  }

  pub async fn search(&self, query: &MovementQuery) -> Result<Vec<SupplyMovement>, S::Error> {
    self.store.search_movements(query).await
  }

  pub async fn total_quantity(
    &self,
    item_id: Uuid,
    kind: MovementType,
  ) -> Result<u64, S::Error> {
    self.store.total_quantity(item_id, kind).await
  }

  /// Items whose expiration date falls after `today` but before
  /// `today + days`.
  pub async fn expiring_soon(
    &self,
    days: u32,
    today: NaiveDate,
  ) -> Result<Vec<SupplyItem>, S::Error> {
    let query = ItemQuery {
      expiring_before: Some(
        today.checked_add_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MAX),
      ),
      ..ItemQuery::default()
    };
    let mut items = self.store.list_items(&query).await?;
    items.retain(|item| item.expiration_date.is_some_and(|d| d > today));
    Ok(items)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    sync::{
      Mutex,
      atomic::{AtomicU32, Ordering},
    },
  };

  use super::*;
  use crate::{
    Error, ErrorKind,
    catalog::{Category, NewCategory, NewWarehouse, Warehouse},
    item::{ItemStatus, NewItem},
  };

  /// In-memory store whose `commit_movement` can be made to fail with a
  /// number of injected conflicts before succeeding.
  #[derive(Default)]
  struct FakeStore {
    categories: Mutex<Vec<Category>>,
    warehouses: Mutex<Vec<Warehouse>>,
    items:      Mutex<HashMap<Uuid, SupplyItem>>,
    movements:  Mutex<Vec<SupplyMovement>>,
    conflicts:  AtomicU32,
    commits:    AtomicU32,
  }

  impl InventoryStore for FakeStore {
    type Error = Error;

    async fn add_category(&self, input: NewCategory) -> Result<Category, Error> {
      let category = Category {
        category_id: Uuid::new_v4(),
        name:        input.name,
        code:        input.code,
        description: input.description,
      };
      self.categories.lock().unwrap().push(category.clone());
      Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, Error> {
      Ok(self.categories.lock().unwrap().clone())
    }

    async fn add_warehouse(&self, input: NewWarehouse) -> Result<Warehouse, Error> {
      let warehouse = Warehouse {
        warehouse_id: Uuid::new_v4(),
        name:         input.name,
        code:         input.code,
        address:      input.address,
      };
      self.warehouses.lock().unwrap().push(warehouse.clone());
      Ok(warehouse)
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, Error> {
      Ok(self.warehouses.lock().unwrap().clone())
    }

    async fn add_item(&self, input: NewItem, today: NaiveDate) -> Result<SupplyItem, Error> {
      input.validate(today)?;
      let now = Utc::now();
      let item = SupplyItem {
        item_id:         Uuid::new_v4(),
        name:            input.name,
        batch_number:    input.batch_number,
        category_id:     input.category_id,
        warehouse_id:    input.warehouse_id,
        quantity:        input.quantity,
        unit:            input.unit,
        expiration_date: input.expiration_date,
        status:          input.status,
        version:         0,
        created_at:      now,
        updated_at:      now,
      };
      self.items.lock().unwrap().insert(item.item_id, item.clone());
      Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<SupplyItem>, Error> {
      Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<SupplyItem>, Error> {
      let items = self.items.lock().unwrap();
      Ok(
        items
          .values()
          .filter(|i| match (query.expiring_before, i.expiration_date) {
            (Some(before), Some(d)) => d < before,
            (Some(_), None) => false,
            (None, _) => true,
          })
          .cloned()
          .collect(),
      )
    }

    async fn commit_movement<F>(
      &self,
      item_id: Uuid,
      deadline: Instant,
      plan: F,
    ) -> Result<(SupplyItem, SupplyMovement), Error>
    where
      F: FnOnce(&SupplyItem) -> crate::Result<PlannedMovement> + Send + 'static,
    {
      self.commits.fetch_add(1, Ordering::SeqCst);
      if Instant::now() >= deadline {
        return Err(Error::Timeout(item_id));
      }

      let mut items = self.items.lock().unwrap();
      let item = items.get_mut(&item_id).ok_or(Error::ItemNotFound(item_id))?;

      if self
        .conflicts
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
      {
        return Err(Error::ConcurrentModification {
          item_id,
          expected_version: item.version,
        });
      }

      let planned = plan(item)?;
      item.quantity = planned.transition.quantity;
      item.status = planned.transition.status;
      item.version += 1;

      let movement = SupplyMovement {
        movement_id:    Uuid::new_v4(),
        item_id,
        kind:           planned.movement.kind,
        quantity:       planned.movement.quantity,
        recipient_name: planned.movement.recipient_name,
        recipient_unit: planned.movement.recipient_unit,
        notes:          planned.movement.notes,
        performed_by:   planned.movement.performed_by,
        performed_at:   Utc::now(),
      };
      self.movements.lock().unwrap().insert(0, movement.clone());
      Ok((item.clone(), movement))
    }

    async fn history(&self, item_id: Uuid) -> Result<Vec<SupplyMovement>, Error> {
      let movements = self.movements.lock().unwrap();
      Ok(movements.iter().filter(|m| m.item_id == item_id).cloned().collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SupplyMovement>, Error> {
      Ok(self.movements.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn search_movements(&self, _: &MovementQuery) -> Result<Vec<SupplyMovement>, Error> {
      Ok(self.movements.lock().unwrap().clone())
    }

    async fn total_quantity(&self, item_id: Uuid, kind: MovementType) -> Result<u64, Error> {
      let movements = self.movements.lock().unwrap();
      Ok(
        movements
          .iter()
          .filter(|m| m.item_id == item_id && m.kind == kind)
          .map(|m| u64::from(m.quantity))
          .sum(),
      )
    }
  }

  fn fast_policy() -> RetryPolicy {
    RetryPolicy {
      max_attempts: 3,
      backoff:      Duration::from_millis(1),
      lock_timeout: Duration::from_secs(5),
    }
  }

  async fn ledger_with(quantity: u32) -> (MovementLedger<FakeStore>, SupplyItem) {
    let store = Arc::new(FakeStore::default());
    let item = store
      .add_item(NewItem::new("Ration pack", "RP-7", Uuid::new_v4(), quantity), today())
      .await
      .unwrap();
    (MovementLedger::with_policy(store, fast_policy()), item)
  }

  fn operator() -> Principal { Principal::resolve(Some("operator")) }

  #[tokio::test]
  async fn issue_records_principal_and_recipient() {
    let (ledger, item) = ledger_with(100).await;

    let mut request = IssueRequest::new(item.item_id, 100);
    request.recipient_name = Some("Pvt. Shevchenko".into());
    request.recipient_unit = Some("3rd company".into());

    let movement = ledger.issue(&operator(), request).await.unwrap();
    assert_eq!(movement.kind, MovementType::Issue);
    assert_eq!(movement.quantity, 100);
    assert_eq!(movement.performed_by.as_str(), "operator");
    assert_eq!(movement.recipient_unit.as_deref(), Some("3rd company"));

    let after = ledger.store().get_item(item.item_id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 0);
    assert_eq!(after.status, ItemStatus::Issued);
    assert_eq!(after.version, 1);
  }

  #[tokio::test]
  async fn conflicts_are_retried_until_success() {
    let (ledger, item) = ledger_with(10).await;
    ledger.store().conflicts.store(2, Ordering::SeqCst);

    ledger
      .write_off(&operator(), StockRequest::new(item.item_id, 4))
      .await
      .unwrap();

    assert_eq!(ledger.store().commits.load(Ordering::SeqCst), 3);
    let after = ledger.store().get_item(item.item_id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 6);
  }

  #[tokio::test]
  async fn conflicts_surface_after_max_attempts() {
    let (ledger, item) = ledger_with(10).await;
    ledger.store().conflicts.store(5, Ordering::SeqCst);

    let err = ledger
      .return_stock(&operator(), StockRequest::new(item.item_id, 1))
      .await
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
    assert_eq!(ledger.store().commits.load(Ordering::SeqCst), 3);
    assert!(ledger.history(item.item_id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn business_violations_are_not_retried() {
    let (ledger, item) = ledger_with(5).await;

    let err = ledger
      .write_off(&operator(), StockRequest::new(item.item_id, 10))
      .await
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    assert_eq!(ledger.store().commits.load(Ordering::SeqCst), 1);
    let after = ledger.store().get_item(item.item_id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 5);
    assert_eq!(after.version, 0);
  }

  #[tokio::test]
  async fn lock_timeout_is_reported_as_timeout() {
    let (ledger, item) = ledger_with(5).await;
    let ledger = MovementLedger::with_policy(
      Arc::clone(ledger.store()),
      RetryPolicy { lock_timeout: Duration::ZERO, ..fast_policy() },
    );

    let err = ledger
      .issue(&operator(), IssueRequest::new(item.item_id, 1))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(ledger.store().commits.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn missing_item_is_not_found() {
    let (ledger, _) = ledger_with(5).await;
    let err = ledger
      .issue(&operator(), IssueRequest::new(Uuid::new_v4(), 1))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_issues_never_overdraw() {
    let (ledger, item) = ledger_with(10).await;
    let ledger = Arc::new(ledger);
    let item_id = item.item_id;

    // Eight requests of 3 against 10 units: exactly three can succeed.
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
          ledger.issue(&operator(), IssueRequest::new(item_id, 3)).await
        })
      })
      .collect();

    let mut succeeded = 0;
    for h in handles {
      if h.await.unwrap().is_ok() {
        succeeded += 1;
      }
    }

    assert_eq!(succeeded, 3);
    let after = ledger.store().get_item(item.item_id).await.unwrap().unwrap();
    assert_eq!(after.quantity, 1);
    assert_eq!(after.status, ItemStatus::InStock);
  }

  #[tokio::test]
  async fn expiring_soon_excludes_already_expired() {
    let store = Arc::new(FakeStore::default());
    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    for (batch, offset) in [("past", -1i64), ("soon", 5), ("later", 60)] {
      let mut input = NewItem::new("Antiseptic", batch, Uuid::new_v4(), 1);
      input.expiration_date = Some(today + chrono::Duration::days(offset));
      // Created a month back so the already-expired batch passes validation.
      store.add_item(input, today - chrono::Duration::days(30)).await.unwrap();
    }
    let ledger = MovementLedger::new(store);

    let soon = ledger.expiring_soon(30, today).await.unwrap();
    assert_eq!(soon.len(), 1);
    assert_eq!(soon[0].batch_number, "soon");
  }

  #[test]
  fn backoff_doubles_per_attempt() {
    let policy = RetryPolicy { backoff: Duration::from_millis(10), ..RetryPolicy::default() };
    assert_eq!(policy.backoff_for(1), Duration::from_millis(10));
    assert_eq!(policy.backoff_for(2), Duration::from_millis(20));
    assert_eq!(policy.backoff_for(3), Duration::from_millis(40));
  }
}
