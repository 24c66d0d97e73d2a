//! The item state machine, as pure functions.
//!
//! ```text
//! IN_STOCK --issue(all)------> ISSUED
//! IN_STOCK --write_off(all)--> WRITTEN_OFF
//! any      --return----------> IN_STOCK
//! ```
//!
//! Each `plan_*` function checks preconditions in a fixed order and returns
//! the item's next `(quantity, status)`. Nothing here touches storage.

use chrono::NaiveDate;

use crate::{
  Error, Result,
  item::{ItemStatus, SupplyItem},
};

/// The next quantity and status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub quantity: u32,
  pub status:   ItemStatus,
}

fn require_positive(requested: u32) -> Result<()> {
  if requested == 0 {
    return Err(Error::InvalidQuantity);
  }
  Ok(())
}

/// Issue `requested` units. Checks, in order: status, expiry, availability.
pub fn plan_issue(item: &SupplyItem, requested: u32, today: NaiveDate) -> Result<Transition> {
  require_positive(requested)?;

  if item.status != ItemStatus::InStock {
    return Err(Error::NotInStock { item_id: item.item_id, status: item.status });
  }

  if let Some(expired_on) = item.expiration_date.filter(|d| *d < today) {
    return Err(Error::Expired { item_id: item.item_id, expired_on });
  }

  let remaining = item.quantity.checked_sub(requested).ok_or(Error::InsufficientStock {
    available: item.quantity,
    requested,
  })?;

  Ok(Transition {
    quantity: remaining,
    status:   if remaining == 0 { ItemStatus::Issued } else { ItemStatus::InStock },
  })
}

/// Return `requested` units. Always resets the status to `IN_STOCK`,
/// including from `WRITTEN_OFF` and `EXPIRED`.
pub fn plan_return(item: &SupplyItem, requested: u32) -> Result<Transition> {
  require_positive(requested)?;

  let quantity = item.quantity.checked_add(requested).ok_or(Error::QuantityOverflow {
    item_id: item.item_id,
    requested,
  })?;

  Ok(Transition { quantity, status: ItemStatus::InStock })
}

/// Write off `requested` units. Status is not checked; reaching zero marks
/// the item `WRITTEN_OFF`, otherwise the status is left as it was.
pub fn plan_write_off(item: &SupplyItem, requested: u32) -> Result<Transition> {
  require_positive(requested)?;

  let remaining = item.quantity.checked_sub(requested).ok_or(Error::InsufficientForWriteOff {
    available: item.quantity,
    requested,
  })?;

  Ok(Transition {
    quantity: remaining,
    status:   if remaining == 0 { ItemStatus::WrittenOff } else { item.status },
  })
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 3, 14).unwrap() }

  fn item(quantity: u32, status: ItemStatus) -> SupplyItem {
    SupplyItem {
      item_id: Uuid::new_v4(),
      name: "Field dressing".into(),
      batch_number: "FD-001".into(),
      category_id: Uuid::new_v4(),
      warehouse_id: None,
      quantity,
      unit: Some("pcs".into()),
      expiration_date: None,
      status,
      version: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn issue_decrements_and_keeps_in_stock() {
    for q in 1..=12u32 {
      for n in 1..q {
        let t = plan_issue(&item(q, ItemStatus::InStock), n, today()).unwrap();
        assert_eq!(t, Transition { quantity: q - n, status: ItemStatus::InStock });
      }
    }
  }

  #[test]
  fn issuing_everything_marks_issued() {
    let t = plan_issue(&item(100, ItemStatus::InStock), 100, today()).unwrap();
    assert_eq!(t, Transition { quantity: 0, status: ItemStatus::Issued });
  }

  #[test]
  fn issue_more_than_available_reports_both_amounts() {
    let err = plan_issue(&item(5, ItemStatus::InStock), 6, today()).unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { available: 5, requested: 6 }));
  }

  #[test]
  fn issue_requires_in_stock() {
    for status in [ItemStatus::Issued, ItemStatus::Expired, ItemStatus::WrittenOff] {
      let err = plan_issue(&item(10, status), 1, today()).unwrap_err();
      assert!(matches!(err, Error::NotInStock { status: s, .. } if s == status));
    }
  }

  #[test]
  fn expired_item_rejected_regardless_of_quantity() {
    let mut it = item(1000, ItemStatus::InStock);
    it.expiration_date = today().pred_opt();
    let err = plan_issue(&it, 1, today()).unwrap_err();
    assert!(matches!(err, Error::Expired { .. }));
  }

  #[test]
  fn item_expiring_today_is_still_issuable() {
    let mut it = item(3, ItemStatus::InStock);
    it.expiration_date = Some(today());
    assert!(plan_issue(&it, 3, today()).is_ok());
  }

  #[test]
  fn status_is_checked_before_expiry_and_quantity() {
    let mut it = item(0, ItemStatus::Issued);
    it.expiration_date = today().pred_opt();
    let err = plan_issue(&it, 5, today()).unwrap_err();
    assert!(matches!(err, Error::NotInStock { .. }));
  }

  #[test]
  fn zero_quantity_is_rejected_everywhere() {
    let it = item(10, ItemStatus::InStock);
    assert!(matches!(plan_issue(&it, 0, today()), Err(Error::InvalidQuantity)));
    assert!(matches!(plan_return(&it, 0), Err(Error::InvalidQuantity)));
    assert!(matches!(plan_write_off(&it, 0), Err(Error::InvalidQuantity)));
  }

  #[test]
  fn return_resets_any_status_to_in_stock() {
    for status in [
      ItemStatus::InStock,
      ItemStatus::Issued,
      ItemStatus::Expired,
      ItemStatus::WrittenOff,
    ] {
      let t = plan_return(&item(0, status), 10).unwrap();
      assert_eq!(t, Transition { quantity: 10, status: ItemStatus::InStock });
    }
  }

  #[test]
  fn return_overflow_is_rejected() {
    let err = plan_return(&item(u32::MAX, ItemStatus::InStock), 1).unwrap_err();
    assert!(matches!(err, Error::QuantityOverflow { requested: 1, .. }));
  }

  #[test]
  fn write_off_to_zero_marks_written_off() {
    let t = plan_write_off(&item(7, ItemStatus::InStock), 7).unwrap();
    assert_eq!(t, Transition { quantity: 0, status: ItemStatus::WrittenOff });

    let partial = plan_write_off(&item(7, ItemStatus::Expired), 2).unwrap();
    assert_eq!(partial, Transition { quantity: 5, status: ItemStatus::Expired });
  }

  #[test]
  fn write_off_more_than_available_fails() {
    let err = plan_write_off(&item(5, ItemStatus::InStock), 10).unwrap_err();
    assert!(matches!(err, Error::InsufficientForWriteOff { available: 5, requested: 10 }));
  }
}
