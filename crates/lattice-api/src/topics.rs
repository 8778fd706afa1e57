//! Handlers for topic and subtopic endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/lessons/{lesson_id}/topics` | Includes merged tombstones |
//! | `POST` | `/lessons/{lesson_id}/topics/merge` | Body: `{"source_topic_id","target_topic_id"}` |
//! | `POST` | `/lessons/{lesson_id}/topics/{topic_id}/subtopics/merge` | Body: `{"source_subtopic_id","target_subtopic_id"}` |
//! | `GET`  | `/topics/{id}/resolve` | Follows merged-into links to the live topic |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::HeaderMap,
};
use lattice_core::{
  advisory::Advisor,
  audit::AuditSink,
  store::GraphStore,
  topic::Topic,
  topic_merge::{SubtopicMergeOutcome, SubtopicMergeRequest, TopicMergeOutcome, TopicMergeRequest},
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{SharedCurator, actor, error::ApiError};

/// `GET /lessons/{lesson_id}/topics`
pub async fn list<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(lesson_id): Path<Uuid>,
) -> Result<Json<Vec<Topic>>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  Ok(Json(curator.list_topics(lesson_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TopicMergeBody {
  pub source_topic_id: Uuid,
  pub target_topic_id: Uuid,
}

/// `POST /lessons/{lesson_id}/topics/merge`
pub async fn merge<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(lesson_id): Path<Uuid>,
  headers: HeaderMap,
  body: Result<Json<TopicMergeBody>, JsonRejection>,
) -> Result<Json<TopicMergeOutcome>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(
    ?actor,
    %lesson_id,
    source = %body.source_topic_id,
    target = %body.target_topic_id,
    "merge topics requested"
  );
  let request = TopicMergeRequest {
    lesson_id,
    source_topic_id: body.source_topic_id,
    target_topic_id: body.target_topic_id,
  };
  Ok(Json(curator.merge_topics(request, actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubtopicMergeBody {
  pub source_subtopic_id: Uuid,
  pub target_subtopic_id: Uuid,
}

/// `POST /lessons/{lesson_id}/topics/{topic_id}/subtopics/merge`
pub async fn merge_subtopics<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path((lesson_id, topic_id)): Path<(Uuid, Uuid)>,
  headers: HeaderMap,
  body: Result<Json<SubtopicMergeBody>, JsonRejection>,
) -> Result<Json<SubtopicMergeOutcome>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  let Json(body) = body?;
  let actor = actor(&headers);
  debug!(?actor, topic = %topic_id, "merge subtopics requested");
  let request = SubtopicMergeRequest {
    lesson_id,
    topic_id,
    source_subtopic_id: body.source_subtopic_id,
    target_subtopic_id: body.target_subtopic_id,
  };
  Ok(Json(curator.merge_subtopics(request, actor).await?))
}

/// `GET /topics/{id}/resolve`
pub async fn resolve<S, A, L>(
  State(curator): State<SharedCurator<S, A, L>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  Ok(Json(curator.resolve_topic(id).await?))
}
