//! Extractor for the acting principal.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use stockroom_core::Principal;

/// The principal attached to the request by an upstream authentication
/// layer, or `"system"` when there is none. Never rejects.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Self(parts.extensions.get::<Principal>().cloned().unwrap_or_default()))
  }
}
