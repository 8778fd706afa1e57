//! Handlers for `/prerequisites` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/prerequisites` | Optional `?status`, `text`, `limit`, `offset` |
//! | `GET`  | `/prerequisites/{id}` | Node with its concepts and edges |
//! | `POST` | `/prerequisites/merge/preview` | Body: `{"prerequisite_ids":[...]}` |
//! | `POST` | `/prerequisites/merge` | Body: [`MergeBody`] |
//! | `POST` | `/prerequisites/{id}/deprecate` | No body |
//! | `POST` | `/prerequisites/{id}/flag` | Body: `{"reason":"..."}` |
//! | `POST` | `/prerequisites/{id}/rename` | Body: `{"name":"...","canonical_key":"..."}` |
//! | `POST` | `/prerequisites/{id}/concepts` | Body: `{"concept_ids":[...]}` |
//! | `GET`  | `/prerequisites/{id}/recommendation` | Advisory suggestion + actions |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::HeaderMap,
};
use lattice_core::{
  advisory::Advisor,
  audit::AuditSink,
  curator::ReviewOptions,
  lifecycle::StatusKind,
  merge::{CanonicalChoice, MergeOutcome, MergeRequest},
  prerequisite::Prerequisite,
  preview::MergePreview,
  review::{LinkOutcome, PrerequisiteDetail},
  store::{GraphStore, PrerequisiteQuery},
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{SharedCurator, actor, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<StatusKind>,
  pub text:   Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /prerequisites[?status=NEEDS_REVIEW][&text=...][&limit=..&offset=..]`
pub async fn list<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Prerequisite>>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let query = PrerequisiteQuery {
    status: params.status,
    text:   params.text,
    limit:  params.limit,
    offset: params.offset,
  };
  Ok(Json(curator.list_prerequisites(query).await?))
}

/// `GET /prerequisites/{id}`
pub async fn get_one<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PrerequisiteDetail>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  Ok(Json(curator.prerequisite_detail(id).await?))
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
  pub prerequisite_ids: Vec<Uuid>,
}

/// `POST /prerequisites/merge/preview`; read-only.
pub async fn preview<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  body: Result<Json<PreviewBody>, JsonRejection>,
) -> Result<Json<MergePreview>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  Ok(Json(curator.preview_merge(body.prerequisite_ids).await?))
}

/// Exactly one of `canonical_name` (merge into a new node) and
/// `canonical_id` (keep a member of the pool) must be set.
#[derive(Debug, Deserialize)]
pub struct MergeBody {
  pub prerequisite_ids: Vec<Uuid>,
  pub canonical_name:   Option<String>,
  pub canonical_id:     Option<Uuid>,
}

/// `POST /prerequisites/merge`
pub async fn merge<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  headers: HeaderMap,
  body: Result<Json<MergeBody>, JsonRejection>,
) -> Result<Json<MergeOutcome>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(?actor, pool = body.prerequisite_ids.len(), "merge prerequisites requested");
  let request = MergeRequest {
    prerequisite_ids: body.prerequisite_ids,
    canonical:        CanonicalChoice::from_parts(body.canonical_name, body.canonical_id)?,
  };
  Ok(Json(curator.merge_prerequisites(request, actor).await?))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// `POST /prerequisites/{id}/deprecate`
pub async fn deprecate<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Json<Prerequisite>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let actor = actor(&headers);
  debug!(?actor, prerequisite = %id, "deprecate requested");
  Ok(Json(curator.deprecate_prerequisite(id, actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct FlagBody {
  pub reason: String,
}

/// `POST /prerequisites/{id}/flag`
pub async fn flag<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  body: Result<Json<FlagBody>, JsonRejection>,
) -> Result<Json<Prerequisite>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(?actor, prerequisite = %id, "flag for review requested");
  Ok(Json(curator.flag_for_review(id, body.reason, actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name:          String,
  pub canonical_key: Option<String>,
}

/// `POST /prerequisites/{id}/rename`
pub async fn rename<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  body: Result<Json<RenameBody>, JsonRejection>,
) -> Result<Json<Prerequisite>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(?actor, prerequisite = %id, "rename requested");
  let renamed = curator
    .rename_prerequisite(id, body.name, body.canonical_key, actor)
    .await?;
  Ok(Json(renamed))
}

#[derive(Debug, Deserialize)]
pub struct LinkBody {
  pub concept_ids: Vec<Uuid>,
}

/// `POST /prerequisites/{id}/concepts`
pub async fn link_concepts<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  body: Result<Json<LinkBody>, JsonRejection>,
) -> Result<Json<LinkOutcome>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(
    ?actor,
    prerequisite = %id,
    concepts = body.concept_ids.len(),
    "link concepts requested"
  );
  Ok(Json(curator.link_concepts(id, body.concept_ids, actor).await?))
}

/// `GET /prerequisites/{id}/recommendation`
///
/// Always 200 for an existing node; an unavailable advisor shows up as
/// `advisory_error` in the body.
pub async fn recommendation<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReviewOptions>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  Ok(Json(curator.recommend(id).await?))
}
