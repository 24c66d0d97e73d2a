//! The identity recorded as `performed_by` on every movement.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name used when no authenticated principal is available.
pub const SYSTEM: &str = "system";

/// The resolved acting principal. Passed explicitly into every ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
  /// Resolve a possibly-absent identity. `None` and blank names fall back to
  /// [`SYSTEM`]; this never fails.
  pub fn resolve(name: Option<&str>) -> Self {
    match name.map(str::trim) {
      Some(n) if !n.is_empty() => Self(n.to_owned()),
      _ => Self::system(),
    }
  }

  pub fn system() -> Self { Self(SYSTEM.to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for Principal {
  fn default() -> Self { Self::system() }
}

impl fmt::Display for Principal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absent_or_blank_resolves_to_system() {
    assert_eq!(Principal::resolve(None).as_str(), "system");
    assert_eq!(Principal::resolve(Some("   ")).as_str(), "system");
    assert_eq!(Principal::resolve(Some(" sgt.kovalenko ")).as_str(), "sgt.kovalenko");
  }
}
