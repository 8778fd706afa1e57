//! The graph accessor traits and supporting query types.
//!
//! [`GraphStore`] hands out transaction scopes. Inside a scope, work goes
//! through [`GraphRead`] (queries only) or [`GraphTx`] (queries and writes).
//! Every relation the engine needs is an explicit, named method here; there
//! are no implicit joins.
//!
//! The scope traits are synchronous: a backend runs the whole closure on its
//! own connection, then commits if it returned `Ok` and rolls back otherwise.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  concept::Concept,
  edge::PrerequisiteTopicEdge,
  lifecycle::StatusKind,
  prerequisite::Prerequisite,
  reference::{ExamQuestion, QuestionCard, ReferenceCounts},
  topic::{Subtopic, Topic},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`GraphRead::list_prerequisites`].
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteQuery {
  pub status: Option<StatusKind>,
  /// Case-insensitive substring filter on the name.
  pub text:   Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Read scope ──────────────────────────────────────────────────────────────

pub trait GraphRead {
  // ── Prerequisites ─────────────────────────────────────────────────────

  fn get_prerequisite(&self, id: Uuid) -> Result<Option<Prerequisite>>;

  fn list_prerequisites(&self, query: &PrerequisiteQuery) -> Result<Vec<Prerequisite>>;

  /// Edges, concept links and question cards still pointing at `id`.
  fn prerequisite_references(&self, id: Uuid) -> Result<ReferenceCounts>;

  // ── Topics ────────────────────────────────────────────────────────────

  fn get_topic(&self, id: Uuid) -> Result<Option<Topic>>;

  fn list_topics(&self, lesson_id: Uuid) -> Result<Vec<Topic>>;

  fn get_subtopic(&self, id: Uuid) -> Result<Option<Subtopic>>;

  fn subtopics_for_topic(&self, topic_id: Uuid) -> Result<Vec<Subtopic>>;

  /// Subtopic named exactly `name` under `topic_id`.
  fn find_subtopic(&self, topic_id: Uuid, name: &str) -> Result<Option<Subtopic>>;

  // ── Edges ─────────────────────────────────────────────────────────────

  fn edges_for_prerequisite(&self, prerequisite_id: Uuid) -> Result<Vec<PrerequisiteTopicEdge>>;

  fn edges_for_topic(&self, topic_id: Uuid) -> Result<Vec<PrerequisiteTopicEdge>>;

  fn find_edge(
    &self,
    prerequisite_id: Uuid,
    topic_id: Uuid,
  ) -> Result<Option<PrerequisiteTopicEdge>>;

  // ── Concepts ──────────────────────────────────────────────────────────

  fn get_concept(&self, id: Uuid) -> Result<Option<Concept>>;

  fn concepts_for_prerequisite(&self, prerequisite_id: Uuid) -> Result<Vec<Concept>>;

  // ── Referencing records ───────────────────────────────────────────────

  fn get_exam_question(&self, id: Uuid) -> Result<Option<ExamQuestion>>;

  fn get_question_card(&self, id: Uuid) -> Result<Option<QuestionCard>>;

  fn count_exam_questions_for_topic(&self, topic_id: Uuid) -> Result<u64>;

  fn count_exam_questions_for_subtopic(&self, subtopic_id: Uuid) -> Result<u64>;
}

// ─── Write scope ─────────────────────────────────────────────────────────────

/// Writes inside a transaction. Re-point methods return the number of rows
/// they moved.
pub trait GraphTx: GraphRead {
  // ── Prerequisites ─────────────────────────────────────────────────────

  fn insert_prerequisite(&self, prerequisite: &Prerequisite) -> Result<()>;

  /// Persist name, canonical key, status and `updated_at`.
  fn update_prerequisite(&self, prerequisite: &Prerequisite) -> Result<()>;

  fn delete_prerequisite(&self, id: Uuid) -> Result<()>;

  // ── Topics ────────────────────────────────────────────────────────────

  fn insert_topic(&self, topic: &Topic) -> Result<()>;

  /// Persist names, status and `updated_at`.
  fn update_topic(&self, topic: &Topic) -> Result<()>;

  fn insert_subtopic(&self, subtopic: &Subtopic) -> Result<()>;

  fn move_subtopic(&self, subtopic_id: Uuid, topic_id: Uuid) -> Result<()>;

  fn delete_subtopic(&self, subtopic_id: Uuid) -> Result<()>;

  // ── Edges ─────────────────────────────────────────────────────────────

  fn insert_edge(&self, edge: &PrerequisiteTopicEdge) -> Result<()>;

  /// Persist every column of the edge identified by `edge.edge_id`,
  /// including re-pointed prerequisite or topic ids.
  fn update_edge(&self, edge: &PrerequisiteTopicEdge) -> Result<()>;

  fn delete_edge(&self, edge_id: Uuid) -> Result<()>;

  fn repoint_edges_subtopic(&self, from: Uuid, to: Uuid) -> Result<u64>;

  // ── Concepts ──────────────────────────────────────────────────────────

  fn insert_concept(&self, concept: &Concept) -> Result<()>;

  /// Bind a concept; returns `false` if the pair already existed.
  fn link_concept(&self, prerequisite_id: Uuid, concept_id: Uuid) -> Result<bool>;

  fn unlink_all_concepts(&self, prerequisite_id: Uuid) -> Result<u64>;

  // ── Referencing records ───────────────────────────────────────────────

  fn insert_exam_question(&self, question: &ExamQuestion) -> Result<()>;

  fn insert_question_card(&self, card: &QuestionCard) -> Result<()>;

  fn repoint_exam_questions_topic(&self, from: Uuid, to: Uuid) -> Result<u64>;

  fn repoint_exam_questions_subtopic(&self, from: Uuid, to: Uuid) -> Result<u64>;

  fn repoint_question_cards_topic(&self, from: Uuid, to: Uuid) -> Result<u64>;

  fn repoint_question_cards_prerequisite(&self, from: Uuid, to: Uuid) -> Result<u64>;
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over a graph storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GraphStore: Send + Sync {
  /// Run `f` against a consistent read-only view. Nothing `f` could do is a
  /// write, and the scope is always rolled back.
  fn read<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphRead) -> Result<T> + Send + 'static;

  /// Run `f` inside a write transaction: committed if `f` returns `Ok`,
  /// rolled back otherwise, so no partial state is ever observable.
  fn with_transaction<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphTx) -> Result<T> + Send + 'static;
}
