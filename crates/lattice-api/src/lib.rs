//! JSON REST API for Lattice.
//!
//! Exposes an axum [`Router`] backed by a [`Curator`]. Auth, TLS, and
//! transport concerns are the caller's responsibility; the acting admin is
//! read from the optional `x-actor-id` header and only used for auditing.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lattice_api::api_router(curator.clone()))
//! ```

pub mod error;
pub mod prerequisites;
pub mod topics;

use std::sync::Arc;

use axum::{
  Router,
  http::HeaderMap,
  routing::{get, post},
};
use lattice_core::{advisory::Advisor, audit::AuditSink, curator::Curator, store::GraphStore};

pub use error::ApiError;

/// Header carrying the acting admin's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Router state.
pub type SharedCurator<S, A, L> = Arc<Curator<S, A, L>>;

pub(crate) fn actor(headers: &HeaderMap) -> Option<String> {
  headers
    .get(ACTOR_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

/// Build a fully-materialised API router for `curator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, A, L>(curator: SharedCurator<S, A, L>) -> Router<()>
where
  S: GraphStore + 'static,
  A: Advisor + 'static,
  L: AuditSink + 'static,
{
  Router::new()
    // Prerequisites
    .route("/prerequisites", get(prerequisites::list::<S, A, L>))
    .route("/prerequisites/merge/preview", post(prerequisites::preview::<S, A, L>))
    .route("/prerequisites/merge", post(prerequisites::merge::<S, A, L>))
    .route("/prerequisites/{id}", get(prerequisites::get_one::<S, A, L>))
    .route("/prerequisites/{id}/deprecate", post(prerequisites::deprecate::<S, A, L>))
    .route("/prerequisites/{id}/flag", post(prerequisites::flag::<S, A, L>))
    .route("/prerequisites/{id}/rename", post(prerequisites::rename::<S, A, L>))
    .route("/prerequisites/{id}/concepts", post(prerequisites::link_concepts::<S, A, L>))
    .route(
      "/prerequisites/{id}/recommendation",
      get(prerequisites::recommendation::<S, A, L>),
    )
    // Topics
    .route("/lessons/{lesson_id}/topics", get(topics::list::<S, A, L>))
    .route("/lessons/{lesson_id}/topics/merge", post(topics::merge::<S, A, L>))
    .route(
      "/lessons/{lesson_id}/topics/{topic_id}/subtopics/merge",
      post(topics::merge_subtopics::<S, A, L>),
    )
    .route("/topics/{id}/resolve", get(topics::resolve::<S, A, L>))
    .with_state(curator)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn actor_header_is_trimmed_and_optional() {
    let mut headers = HeaderMap::new();
    assert_eq!(actor(&headers), None);

    headers.insert(ACTOR_HEADER, HeaderValue::from_static("  admin-7 "));
    assert_eq!(actor(&headers).as_deref(), Some("admin-7"));

    headers.insert(ACTOR_HEADER, HeaderValue::from_static("   "));
    assert_eq!(actor(&headers), None);
  }
}
