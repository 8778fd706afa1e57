//! HTTP host for the Lattice curation API.
//!
//! Wires a [`SqliteStore`] and an optional [`HttpAdvisor`] into a
//! [`Curator`] and serves the JSON API under `/api`.

pub mod advisory;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use lattice_core::{advisory::Advisor, audit::AuditSink, curator::Curator, store::GraphStore};
use lattice_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use advisory::{AdvisoryConfig, HttpAdvisor};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LATTICE__*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Without this section every recommendation reports the advisor as
  /// unavailable.
  #[serde(default)]
  pub advisory:   Option<AdvisoryConfig>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// The curator the server binary runs.
pub type AppCurator = Curator<SqliteStore, Option<HttpAdvisor>, SqliteStore>;

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level [`Router`]: the API under `/api` plus a liveness check.
pub fn router<S, A, L>(curator: Arc<Curator<S, A, L>>) -> Router
where
  S: GraphStore + 'static,
  A: Advisor + 'static,
  L: AuditSink + 'static,
{
  Router::new()
    .route("/healthz", get(healthz))
    .nest("/api", lattice_api::api_router(curator))
    .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str { "ok" }

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use lattice_core::{
    edge::PrerequisiteTopicEdge,
    prerequisite::Prerequisite,
    store::GraphStore,
    topic::Topic,
  };
  use lattice_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt;
  use uuid::Uuid;

  use super::*;

  async fn make_curator() -> Arc<AppCurator> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(Curator::new(store.clone(), None, store))
  }

  /// Two prerequisites linked to the same topic with frequencies 4 and 8.
  async fn seed_pair(curator: &AppCurator) -> (Uuid, Uuid, Uuid) {
    curator
      .store()
      .with_transaction(|tx| {
        let topic = Topic::new(Uuid::new_v4(), "Derivatives");
        tx.insert_topic(&topic)?;
        let a = Prerequisite::new("limits");
        let b = Prerequisite::new("Limits of functions");
        tx.insert_prerequisite(&a)?;
        tx.insert_prerequisite(&b)?;
        for (p, frequency) in [(&a, 4), (&b, 8)] {
          let edge =
            PrerequisiteTopicEdge::new(p.prerequisite_id, topic.topic_id, frequency, "exam-analysis");
          tx.insert_edge(&edge)?;
        }
        Ok((a.prerequisite_id, b.prerequisite_id, topic.topic_id))
      })
      .await
      .unwrap()
  }

  async fn oneshot_raw(
    curator: Arc<AppCurator>,
    method:  &str,
    uri:     &str,
    headers: Vec<(&str, &str)>,
    body:    Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(curator).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Health ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn healthz_returns_ok() {
    let resp = oneshot_raw(make_curator().await, "GET", "/healthz", vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Merge ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn merge_into_new_node_sums_frequencies() {
    let curator = make_curator().await;
    let (a, b, topic_id) = seed_pair(&curator).await;

    let resp = oneshot_raw(
      curator.clone(),
      "POST",
      "/api/prerequisites/merge",
      vec![("x-actor-id", "admin-1")],
      Some(json!({ "prerequisite_ids": [a, b], "canonical_name": "Limits" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome = body_json(resp).await;
    assert_eq!(outcome["canonical"]["name"], "Limits");
    assert_eq!(outcome["created_canonical"], true);

    let canonical = outcome["canonical"]["prerequisite_id"].as_str().unwrap();
    let resp = oneshot_raw(
      curator.clone(),
      "GET",
      &format!("/api/prerequisites/{canonical}"),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail = body_json(resp).await;
    let edges = detail["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["topic_id"], topic_id.to_string());
    assert_eq!(edges[0]["frequency"], 12);
    assert_eq!(edges[0]["strength"], "STRONG");

    let resp = oneshot_raw(curator, "GET", &format!("/api/prerequisites/{a}"), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn merge_with_both_canonical_fields_is_400() {
    let curator = make_curator().await;
    let (a, b, _) = seed_pair(&curator).await;

    let resp = oneshot_raw(
      curator,
      "POST",
      "/api/prerequisites/merge",
      vec![],
      Some(json!({ "prerequisite_ids": [a, b], "canonical_name": "Limits", "canonical_id": a })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["kind"], "validation");
  }

  #[tokio::test]
  async fn malformed_merge_body_is_400_and_writes_nothing() {
    let curator = make_curator().await;
    seed_pair(&curator).await;

    for body in [r#"{"prerequisite_ids": ["#, r#"{"prerequisite_ids": "not-a-list"}"#] {
      let req = Request::builder()
        .method("POST")
        .uri("/api/prerequisites/merge")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
      let resp = router(curator.clone()).oneshot(req).await.unwrap();
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
      let err = body_json(resp).await;
      assert_eq!(err["kind"], "validation");
      assert!(err["error"].as_str().unwrap().starts_with("bad request:"));
    }

    let resp = oneshot_raw(curator.clone(), "GET", "/api/prerequisites", vec![], None).await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
    assert!(curator.store().list_audit(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn preview_is_read_only() {
    let curator = make_curator().await;
    let (a, b, _) = seed_pair(&curator).await;

    let resp = oneshot_raw(
      curator.clone(),
      "POST",
      "/api/prerequisites/merge/preview",
      vec![],
      Some(json!({ "prerequisite_ids": [a, b] })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(curator, "GET", "/api/prerequisites", vec![], None).await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_prerequisite_is_404() {
    let curator = make_curator().await;
    let uri = format!("/api/prerequisites/{}", Uuid::new_v4());
    let resp = oneshot_raw(curator, "GET", &uri, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["kind"], "not_found");
  }

  #[tokio::test]
  async fn deprecating_twice_is_409_and_audited_once() {
    let curator = make_curator().await;
    let (a, _, _) = seed_pair(&curator).await;
    let uri = format!("/api/prerequisites/{a}/deprecate");

    let first = oneshot_raw(curator.clone(), "POST", &uri, vec![("x-actor-id", "admin-7")], None).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["status"], "DEPRECATED");

    let second = oneshot_raw(curator.clone(), "POST", &uri, vec![("x-actor-id", "admin-7")], None).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let audit = curator.store().list_audit(Some(a)).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor_id.as_deref(), Some("admin-7"));
  }

  #[tokio::test]
  async fn recommendation_without_advisor_still_lists_actions() {
    let curator = make_curator().await;
    let (a, _, _) = seed_pair(&curator).await;

    let resp = oneshot_raw(
      curator,
      "GET",
      &format!("/api/prerequisites/{a}/recommendation"),
      vec![],
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let options = body_json(resp).await;
    assert!(options["advice"].is_null());
    assert!(options["advisory_error"].is_string());
    assert_eq!(options["available_actions"].as_array().unwrap().len(), 4);
    assert_eq!(options["can_deprecate"], true);
  }

  // ── Topics ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn topic_merge_then_resolve_follows_tombstone() {
    let curator = make_curator().await;
    let lesson_id = Uuid::new_v4();
    let (source, target) = curator
      .store()
      .with_transaction(move |tx| {
        let source = Topic::new(lesson_id, "Chain rule");
        let target = Topic::new(lesson_id, "Differentiation rules");
        tx.insert_topic(&source)?;
        tx.insert_topic(&target)?;
        Ok((source.topic_id, target.topic_id))
      })
      .await
      .unwrap();

    let resp = oneshot_raw(
      curator.clone(),
      "POST",
      &format!("/api/lessons/{lesson_id}/topics/merge"),
      vec![],
      Some(json!({ "source_topic_id": source, "target_topic_id": target })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(curator, "GET", &format!("/api/topics/{source}/resolve"), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["topic_id"], target.to_string());
  }
}
