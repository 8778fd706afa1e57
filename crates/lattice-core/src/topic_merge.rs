//! Topic and subtopic merges within a lesson.
//!
//! A merged topic is tombstoned, not deleted. Exam questions, question cards,
//! edges and subtopics move to the target first; the post-conditions then
//! require that nothing live still points at the source.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  store::{GraphRead, GraphTx},
  topic::{Subtopic, Topic, TopicStatus},
};

// ─── Topics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicMergeRequest {
  pub lesson_id:       Uuid,
  pub source_topic_id: Uuid,
  pub target_topic_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMergeOutcome {
  pub source_topic_id:   Uuid,
  pub target_topic_id:   Uuid,
  pub questions_moved:   u64,
  pub cards_repointed:   u64,
  /// Source edges folded into an existing target edge.
  pub edges_merged:      usize,
  /// Source edges re-pointed to the target unchanged.
  pub edges_transferred: usize,
  /// Source subtopics folded into a same-named target subtopic.
  pub subtopics_merged:  usize,
  /// Source subtopics moved under the target.
  pub subtopics_moved:   usize,
}

fn load_topic<G: GraphRead + ?Sized>(graph: &G, id: Uuid) -> Result<Topic> {
  graph.get_topic(id)?.ok_or_else(|| Error::not_found(EntityKind::Topic, id))
}

fn ensure_in_lesson(topic: &Topic, lesson_id: Uuid) -> Result<()> {
  if topic.lesson_id != lesson_id {
    return Err(Error::Validation(format!(
      "topic {} belongs to lesson {}, not lesson {lesson_id}",
      topic.topic_id, topic.lesson_id
    )));
  }
  Ok(())
}

fn ensure_active(topic: &Topic) -> Result<()> {
  if let TopicStatus::Merged { merged_into } = topic.status {
    return Err(Error::Conflict(format!(
      "topic {} was already merged into {merged_into}",
      topic.topic_id
    )));
  }
  Ok(())
}

/// Per-prerequisite frequency totals across the edges of `topics`.
fn prerequisite_totals<G: GraphRead + ?Sized>(
  graph: &G,
  topics: &[Uuid],
) -> Result<BTreeMap<Uuid, u64>> {
  let mut totals = BTreeMap::new();
  for &topic in topics {
    for edge in graph.edges_for_topic(topic)? {
      *totals.entry(edge.prerequisite_id).or_insert(0) += u64::from(edge.frequency);
    }
  }
  Ok(totals)
}

/// Pre-flight checks; run before the first write.
fn preflight<G: GraphRead + ?Sized>(
  graph: &G,
  request: &TopicMergeRequest,
) -> Result<(Topic, Topic)> {
  if request.source_topic_id == request.target_topic_id {
    return Err(Error::Validation(format!(
      "cannot merge topic {} into itself",
      request.source_topic_id
    )));
  }
  let source = load_topic(graph, request.source_topic_id)?;
  let target = load_topic(graph, request.target_topic_id)?;
  ensure_in_lesson(&source, request.lesson_id)?;
  ensure_in_lesson(&target, request.lesson_id)?;
  ensure_active(&source)?;
  ensure_active(&target)?;
  Ok((source, target))
}

pub fn merge_topics<G: GraphTx + ?Sized>(
  tx: &G,
  request: &TopicMergeRequest,
) -> Result<TopicMergeOutcome> {
  const OPERATION: &str = "merge_topics";

  let (mut source, target) = preflight(tx, request)?;
  let (source_id, target_id) = (source.topic_id, target.topic_id);
  let before = prerequisite_totals(tx, &[source_id, target_id])?;

  // 1. Exam questions and question cards.
  let questions_moved = tx.repoint_exam_questions_topic(source_id, target_id)?;
  let cards_repointed = tx.repoint_question_cards_topic(source_id, target_id)?;

  // 2. Edges.
  let mut edges_merged = 0;
  let mut edges_transferred = 0;
  for mut edge in tx.edges_for_topic(source_id)? {
    match tx.find_edge(edge.prerequisite_id, target_id)? {
      Some(mut existing) => {
        existing.absorb(&edge)?;
        tx.update_edge(&existing)?;
        tx.delete_edge(edge.edge_id)?;
        edges_merged += 1;
      }
      None => {
        edge.topic_id = target_id;
        edge.updated_at = Utc::now();
        tx.update_edge(&edge)?;
        edges_transferred += 1;
      }
    }
  }

  // 3. Subtopics.
  let mut subtopics_merged = 0;
  let mut subtopics_moved = 0;
  for subtopic in tx.subtopics_for_topic(source_id)? {
    match tx.find_subtopic(target_id, &subtopic.name)? {
      Some(existing) => {
        tx.repoint_exam_questions_subtopic(subtopic.subtopic_id, existing.subtopic_id)?;
        tx.repoint_edges_subtopic(subtopic.subtopic_id, existing.subtopic_id)?;
        tx.delete_subtopic(subtopic.subtopic_id)?;
        subtopics_merged += 1;
      }
      None => {
        tx.move_subtopic(subtopic.subtopic_id, target_id)?;
        subtopics_moved += 1;
      }
    }
  }

  // 4. Tombstone.
  source.status = TopicStatus::Merged { merged_into: target_id };
  source.updated_at = Utc::now();
  tx.update_topic(&source)?;

  // 5. Post-conditions.
  let stranded = tx.count_exam_questions_for_topic(source_id)?;
  if stranded != 0 {
    return Err(Error::execution(
      OPERATION,
      format!("{stranded} exam questions still point at merged topic {source_id}"),
    ));
  }
  let leftover = tx.edges_for_topic(source_id)?.len();
  if leftover != 0 {
    return Err(Error::execution(
      OPERATION,
      format!("{leftover} edges remain on merged topic {source_id}"),
    ));
  }
  let after = prerequisite_totals(tx, &[target_id])?;
  if after != before {
    return Err(Error::execution(
      OPERATION,
      format!("edge frequency not conserved merging topic {source_id} into {target_id}"),
    ));
  }
  if let Some(edge) = tx.edges_for_topic(target_id)?.iter().find(|e| !e.is_consistent()) {
    return Err(Error::execution(
      OPERATION,
      format!("edge {} has strength {} for frequency {}", edge.edge_id, edge.strength, edge.frequency),
    ));
  }

  Ok(TopicMergeOutcome {
    source_topic_id: source_id,
    target_topic_id: target_id,
    questions_moved,
    cards_repointed,
    edges_merged,
    edges_transferred,
    subtopics_merged,
    subtopics_moved,
  })
}

/// Follow the tombstone chain from `id` to the live topic.
pub fn resolve_topic<G: GraphRead + ?Sized>(graph: &G, id: Uuid) -> Result<Topic> {
  let mut topic = load_topic(graph, id)?;
  let mut hops = 0;
  while let Some(next) = topic.status.merged_into() {
    hops += 1;
    if hops > 64 {
      return Err(Error::execution(
        "resolve_topic",
        format!("merge chain starting at topic {id} does not terminate"),
      ));
    }
    topic = load_topic(graph, next)?;
  }
  Ok(topic)
}

// ─── Subtopics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubtopicMergeRequest {
  pub lesson_id:          Uuid,
  pub topic_id:           Uuid,
  pub source_subtopic_id: Uuid,
  pub target_subtopic_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtopicMergeOutcome {
  pub source_subtopic_id: Uuid,
  pub target_subtopic_id: Uuid,
  pub questions_moved:    u64,
  pub edges_repointed:    u64,
}

fn load_subtopic<G: GraphRead + ?Sized>(graph: &G, id: Uuid, topic_id: Uuid) -> Result<Subtopic> {
  let subtopic = graph
    .get_subtopic(id)?
    .ok_or_else(|| Error::not_found(EntityKind::Subtopic, id))?;
  if subtopic.topic_id != topic_id {
    return Err(Error::Validation(format!(
      "subtopic {id} belongs to topic {}, not topic {topic_id}",
      subtopic.topic_id
    )));
  }
  Ok(subtopic)
}

pub fn merge_subtopics<G: GraphTx + ?Sized>(
  tx: &G,
  request: &SubtopicMergeRequest,
) -> Result<SubtopicMergeOutcome> {
  if request.source_subtopic_id == request.target_subtopic_id {
    return Err(Error::Validation(format!(
      "cannot merge subtopic {} into itself",
      request.source_subtopic_id
    )));
  }
  let topic = load_topic(tx, request.topic_id)?;
  ensure_in_lesson(&topic, request.lesson_id)?;
  ensure_active(&topic)?;
  let source = load_subtopic(tx, request.source_subtopic_id, topic.topic_id)?;
  let target = load_subtopic(tx, request.target_subtopic_id, topic.topic_id)?;

  let questions_moved =
    tx.repoint_exam_questions_subtopic(source.subtopic_id, target.subtopic_id)?;
  let edges_repointed = tx.repoint_edges_subtopic(source.subtopic_id, target.subtopic_id)?;
  tx.delete_subtopic(source.subtopic_id)?;

  let stranded = tx.count_exam_questions_for_subtopic(source.subtopic_id)?;
  if stranded != 0 {
    return Err(Error::execution(
      "merge_subtopics",
      format!("{stranded} exam questions still point at subtopic {}", source.subtopic_id),
    ));
  }

  Ok(SubtopicMergeOutcome {
    source_subtopic_id: source.subtopic_id,
    target_subtopic_id: target.subtopic_id,
    questions_moved,
    edges_repointed,
  })
}
