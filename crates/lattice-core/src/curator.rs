//! [`Curator`]: the service facade every caller goes through.
//!
//! Each mutating operation claims the nodes it touches in [`MergeLocks`],
//! runs its engine function inside one [`GraphStore::with_transaction`]
//! scope, and appends an audit record once the transaction has committed.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  advisory::{Advice, Advisor, AdvisoryContext, EdgeContext},
  audit::{AuditAction, AuditRecord, AuditSink},
  edge::PrerequisiteTopicEdge,
  lifecycle::ReviewDecision,
  locks::MergeLocks,
  merge::{self, MergeOutcome, MergeRequest},
  prerequisite::Prerequisite,
  preview::{self, MergePreview},
  review::{self, LinkOutcome, PrerequisiteDetail},
  store::{GraphRead, GraphStore, GraphTx, PrerequisiteQuery},
  topic::Topic,
  topic_merge::{
    self, SubtopicMergeOutcome, SubtopicMergeRequest, TopicMergeOutcome, TopicMergeRequest,
  },
};

/// What an admin sees before deciding on a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOptions {
  pub prerequisite:      Prerequisite,
  pub advice:            Option<Advice>,
  /// Why no advice is available, when the advisor failed.
  pub advisory_error:    Option<String>,
  pub available_actions: Vec<ReviewDecision>,
  pub can_deprecate:     bool,
}

/// New evidence for a prerequisite → topic edge, from upstream extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
  pub prerequisite_id: Uuid,
  pub topic_id:        Uuid,
  pub subtopic_id:     Option<Uuid>,
  pub source:          String,
  pub count:           u32,
}

pub struct Curator<S, A, L> {
  store:   S,
  advisor: A,
  audit:   L,
  locks:   MergeLocks,
}

impl<S, A, L> Curator<S, A, L>
where
  S: GraphStore,
  A: Advisor,
  L: AuditSink,
{
  pub fn new(store: S, advisor: A, audit: L) -> Self {
    Self { store, advisor, audit, locks: MergeLocks::new() }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn locks(&self) -> &MergeLocks { &self.locks }

  // ─── Plumbing ─────────────────────────────────────────────────────────────

  async fn query<T, F>(&self, operation: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphRead) -> Result<T> + Send + 'static,
  {
    self.store.read(f).await.map_err(|e| e.into_execution(operation))
  }

  /// Run `f` in a write transaction. Backend failures come back as
  /// [`Error::Execution`] naming `operation`.
  async fn execute<T, F>(&self, operation: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphTx) -> Result<T> + Send + 'static,
  {
    let result = self
      .store
      .with_transaction(f)
      .await
      .map_err(|e| e.into_execution(operation));
    if let Err(e @ Error::Execution { .. }) = &result {
      error!(operation, error = %e, "transaction rolled back");
    }
    result
  }

  async fn record(
    &self,
    entity: EntityKind,
    entity_id: Uuid,
    action: AuditAction,
    actor: Option<String>,
    details: serde_json::Value,
  ) {
    let record = AuditRecord::new(entity, entity_id, action, actor, details);
    if let Err(e) = self.audit.append(record).await {
      warn!(%entity, %entity_id, %action, error = %e, "failed to append audit record");
    }
  }

  // ─── Merges ───────────────────────────────────────────────────────────────

  pub async fn preview_merge(&self, ids: Vec<Uuid>) -> Result<MergePreview> {
    self
      .query("preview_merge", move |graph| preview::preview_merge(graph, &ids))
      .await
  }

  pub async fn merge_prerequisites(
    &self,
    request: MergeRequest,
    actor: Option<String>,
  ) -> Result<MergeOutcome> {
    let _guard = self.locks.acquire(&request.node_ids())?;
    let outcome = self
      .execute("merge_prerequisites", move |tx| merge::merge_prerequisites(tx, &request))
      .await?;

    let canonical_id = outcome.canonical.prerequisite_id;
    info!(
      canonical = %canonical_id,
      created = outcome.created_canonical,
      sources = outcome.sources.len(),
      edges_transferred = outcome.edges_transferred,
      edges_merged = outcome.edges_merged,
      concepts_transferred = outcome.concepts_transferred,
      "merged prerequisites"
    );
    self
      .record(
        EntityKind::Prerequisite,
        canonical_id,
        AuditAction::MergePrerequisites,
        actor,
        json!({
          "canonical_name":       outcome.canonical.name,
          "created_canonical":    outcome.created_canonical,
          "sources":              outcome.sources,
          "edges_transferred":    outcome.edges_transferred,
          "edges_merged":         outcome.edges_merged,
          "concepts_transferred": outcome.concepts_transferred,
          "cards_repointed":      outcome.cards_repointed,
        }),
      )
      .await;
    Ok(outcome)
  }

  pub async fn merge_topics(
    &self,
    request: TopicMergeRequest,
    actor: Option<String>,
  ) -> Result<TopicMergeOutcome> {
    let _guard = self.locks.acquire(&[request.source_topic_id, request.target_topic_id])?;
    let lesson_id = request.lesson_id;
    let outcome = self
      .execute("merge_topics", move |tx| topic_merge::merge_topics(tx, &request))
      .await?;

    info!(
      source = %outcome.source_topic_id,
      target = %outcome.target_topic_id,
      questions_moved = outcome.questions_moved,
      edges_merged = outcome.edges_merged,
      "merged topics"
    );
    self
      .record(
        EntityKind::Topic,
        outcome.source_topic_id,
        AuditAction::MergeTopics,
        actor,
        json!({ "lesson_id": lesson_id, "outcome": outcome }),
      )
      .await;
    Ok(outcome)
  }

  pub async fn merge_subtopics(
    &self,
    request: SubtopicMergeRequest,
    actor: Option<String>,
  ) -> Result<SubtopicMergeOutcome> {
    let _guard = self.locks.acquire(&[
      request.topic_id,
      request.source_subtopic_id,
      request.target_subtopic_id,
    ])?;
    let topic_id = request.topic_id;
    let outcome = self
      .execute("merge_subtopics", move |tx| topic_merge::merge_subtopics(tx, &request))
      .await?;

    info!(
      topic = %topic_id,
      source = %outcome.source_subtopic_id,
      target = %outcome.target_subtopic_id,
      questions_moved = outcome.questions_moved,
      "merged subtopics"
    );
    self
      .record(
        EntityKind::Subtopic,
        outcome.source_subtopic_id,
        AuditAction::MergeSubtopics,
        actor,
        json!({ "topic_id": topic_id, "outcome": outcome }),
      )
      .await;
    Ok(outcome)
  }

  pub async fn resolve_topic(&self, id: Uuid) -> Result<Topic> {
    self
      .query("resolve_topic", move |graph| topic_merge::resolve_topic(graph, id))
      .await
  }

  pub async fn list_topics(&self, lesson_id: Uuid) -> Result<Vec<Topic>> {
    self
      .query("list_topics", move |graph| graph.list_topics(lesson_id))
      .await
  }

  // ─── Review lifecycle ─────────────────────────────────────────────────────

  pub async fn deprecate_prerequisite(
    &self,
    id: Uuid,
    actor: Option<String>,
  ) -> Result<Prerequisite> {
    let _guard = self.locks.acquire(&[id])?;
    let prerequisite = self
      .execute("deprecate_prerequisite", move |tx| review::deprecate(tx, id))
      .await?;

    info!(prerequisite = %id, "deprecated prerequisite");
    self
      .record(
        EntityKind::Prerequisite,
        id,
        AuditAction::Deprecate,
        actor,
        json!({ "name": prerequisite.name }),
      )
      .await;
    Ok(prerequisite)
  }

  pub async fn flag_for_review(
    &self,
    id: Uuid,
    reason: String,
    actor: Option<String>,
  ) -> Result<Prerequisite> {
    let _guard = self.locks.acquire(&[id])?;
    let prerequisite = self
      .execute("flag_for_review", move |tx| review::flag_for_review(tx, id, &reason))
      .await?;

    let reason = prerequisite.status.review_reason().unwrap_or_default().to_owned();
    info!(prerequisite = %id, %reason, "flagged prerequisite for review");
    self
      .record(
        EntityKind::Prerequisite,
        id,
        AuditAction::FlagForReview,
        actor,
        json!({ "reason": reason }),
      )
      .await;
    Ok(prerequisite)
  }

  pub async fn rename_prerequisite(
    &self,
    id: Uuid,
    name: String,
    canonical_key: Option<String>,
    actor: Option<String>,
  ) -> Result<Prerequisite> {
    let _guard = self.locks.acquire(&[id])?;
    let prerequisite = self
      .execute("rename_prerequisite", move |tx| review::rename(tx, id, &name, canonical_key))
      .await?;

    info!(prerequisite = %id, name = %prerequisite.name, "renamed prerequisite");
    self
      .record(
        EntityKind::Prerequisite,
        id,
        AuditAction::Rename,
        actor,
        json!({
          "name":          prerequisite.name,
          "canonical_key": prerequisite.canonical_key,
        }),
      )
      .await;
    Ok(prerequisite)
  }

  pub async fn link_concepts(
    &self,
    id: Uuid,
    concept_ids: Vec<Uuid>,
    actor: Option<String>,
  ) -> Result<LinkOutcome> {
    let _guard = self.locks.acquire(&[id])?;
    let outcome = self
      .execute("link_concepts", move |tx| review::link_concepts(tx, id, &concept_ids))
      .await?;

    info!(prerequisite = %id, newly_linked = outcome.newly_linked.len(), "linked concepts");
    self
      .record(
        EntityKind::Prerequisite,
        id,
        AuditAction::LinkConcepts,
        actor,
        json!({ "newly_linked": outcome.newly_linked }),
      )
      .await;
    Ok(outcome)
  }

  /// Surface the advisor's suggestion for `id` alongside the actions the
  /// admin can still take. Never mutates anything; a failing advisor only
  /// leaves `advice` empty.
  pub async fn recommend(&self, id: Uuid) -> Result<ReviewOptions> {
    let context = self
      .query("recommend", move |graph| advisory_context(graph, id))
      .await?;
    let prerequisite = context.prerequisite.clone();
    let available_actions = ReviewDecision::available_for(&prerequisite.status);
    let can_deprecate = !prerequisite.status.is_deprecated();

    // Nothing left to decide on a deprecated node.
    if !can_deprecate {
      return Ok(ReviewOptions {
        prerequisite,
        advice: None,
        advisory_error: None,
        available_actions,
        can_deprecate,
      });
    }

    let (advice, advisory_error) = match self.advisor.recommend(context).await {
      Ok(advice) => {
        debug!(prerequisite = %id, decision = %advice.decision, "advisor responded");
        (Some(advice), None)
      }
      Err(e) => {
        warn!(prerequisite = %id, error = %e, "advisory service failed");
        (None, Some(e.to_string()))
      }
    };

    Ok(ReviewOptions {
      prerequisite,
      advice,
      advisory_error,
      available_actions,
      can_deprecate,
    })
  }

  // ─── Reads and upstream writes ────────────────────────────────────────────

  pub async fn list_prerequisites(&self, query: PrerequisiteQuery) -> Result<Vec<Prerequisite>> {
    self
      .query("list_prerequisites", move |graph| graph.list_prerequisites(&query))
      .await
  }

  pub async fn prerequisite_detail(&self, id: Uuid) -> Result<PrerequisiteDetail> {
    self
      .query("prerequisite_detail", move |graph| review::detail(graph, id))
      .await
  }

  pub async fn record_evidence(&self, evidence: Evidence) -> Result<PrerequisiteTopicEdge> {
    let _guard = self.locks.acquire(&[evidence.prerequisite_id, evidence.topic_id])?;
    let edge = self
      .execute("record_evidence", move |tx| {
        review::record_evidence(
          tx,
          evidence.prerequisite_id,
          evidence.topic_id,
          evidence.subtopic_id,
          &evidence.source,
          evidence.count,
        )
      })
      .await?;
    debug!(
      edge = %edge.edge_id,
      frequency = edge.frequency,
      strength = %edge.strength,
      "recorded evidence"
    );
    Ok(edge)
  }
}

fn advisory_context<G: GraphRead + ?Sized>(graph: &G, id: Uuid) -> Result<AdvisoryContext> {
  let detail = review::detail(graph, id)?;
  let edges = detail
    .edges
    .iter()
    .map(|edge| {
      let topic = graph
        .get_topic(edge.topic_id)?
        .ok_or_else(|| Error::not_found(EntityKind::Topic, edge.topic_id))?;
      Ok(EdgeContext {
        topic_id:   edge.topic_id,
        topic_name: topic.display_name,
        frequency:  edge.frequency,
        strength:   edge.strength,
      })
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(AdvisoryContext {
    prerequisite: detail.prerequisite,
    concepts: detail.concepts,
    edges,
  })
}
