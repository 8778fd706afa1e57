//! Review lifecycle operations on a single prerequisite: deprecate, flag,
//! rename, link concepts. Each one routes its status change through the
//! transition table in [`crate::lifecycle`].

use serde::Serialize;
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  concept::Concept,
  edge::PrerequisiteTopicEdge,
  lifecycle::{Resolution, Transition},
  merge::distinct_ids,
  prerequisite::Prerequisite,
  store::{GraphRead, GraphTx},
};

fn load<G: GraphRead + ?Sized>(graph: &G, id: Uuid) -> Result<Prerequisite> {
  graph
    .get_prerequisite(id)?
    .ok_or_else(|| Error::not_found(EntityKind::Prerequisite, id))
}

pub fn deprecate<G: GraphTx + ?Sized>(tx: &G, id: Uuid) -> Result<Prerequisite> {
  let mut prerequisite = load(tx, id)?;
  prerequisite.transition(&Transition::Deprecate)?;
  tx.update_prerequisite(&prerequisite)?;
  Ok(prerequisite)
}

/// Entry point for upstream heuristics that want a human to look at a node.
pub fn flag_for_review<G: GraphTx + ?Sized>(
  tx: &G,
  id: Uuid,
  reason: &str,
) -> Result<Prerequisite> {
  let reason = reason.trim();
  if reason.is_empty() {
    return Err(Error::Validation("a review flag needs a reason".into()));
  }
  let mut prerequisite = load(tx, id)?;
  prerequisite.transition(&Transition::Flag { reason: reason.to_owned() })?;
  tx.update_prerequisite(&prerequisite)?;
  Ok(prerequisite)
}

pub fn rename<G: GraphTx + ?Sized>(
  tx: &G,
  id: Uuid,
  name: &str,
  canonical_key: Option<String>,
) -> Result<Prerequisite> {
  let name = name.trim();
  if name.is_empty() {
    return Err(Error::Validation(format!("new name for prerequisite {id} is blank")));
  }
  let mut prerequisite = load(tx, id)?;
  prerequisite.transition(&Transition::Resolve(Resolution::Renamed))?;
  prerequisite.name = name.to_owned();
  if let Some(key) = canonical_key.filter(|k| !k.trim().is_empty()) {
    prerequisite.canonical_key = Some(key);
  }
  tx.update_prerequisite(&prerequisite)?;
  Ok(prerequisite)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkOutcome {
  pub prerequisite: Prerequisite,
  /// Concepts that were not linked before this call.
  pub newly_linked: Vec<Uuid>,
}

pub fn link_concepts<G: GraphTx + ?Sized>(
  tx: &G,
  id: Uuid,
  concept_ids: &[Uuid],
) -> Result<LinkOutcome> {
  let concept_ids = distinct_ids(concept_ids);
  if concept_ids.is_empty() {
    return Err(Error::Validation(format!(
      "linking prerequisite {id} needs at least one concept"
    )));
  }
  let mut prerequisite = load(tx, id)?;
  prerequisite.transition(&Transition::Resolve(Resolution::Linked))?;

  for &concept_id in &concept_ids {
    if tx.get_concept(concept_id)?.is_none() {
      return Err(Error::not_found(EntityKind::Concept, concept_id));
    }
  }

  let mut newly_linked = Vec::new();
  for &concept_id in &concept_ids {
    if tx.link_concept(id, concept_id)? {
      newly_linked.push(concept_id);
    }
  }
  prerequisite.adopt_concept_key(concept_ids[0]);
  tx.update_prerequisite(&prerequisite)?;

  Ok(LinkOutcome { prerequisite, newly_linked })
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// A prerequisite with the relations an admin needs to judge it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrerequisiteDetail {
  pub prerequisite: Prerequisite,
  pub concepts:     Vec<Concept>,
  pub edges:        Vec<PrerequisiteTopicEdge>,
}

pub fn detail<G: GraphRead + ?Sized>(graph: &G, id: Uuid) -> Result<PrerequisiteDetail> {
  let prerequisite = load(graph, id)?;
  Ok(PrerequisiteDetail {
    concepts: graph.concepts_for_prerequisite(id)?,
    edges: graph.edges_for_prerequisite(id)?,
    prerequisite,
  })
}

// ─── Evidence ────────────────────────────────────────────────────────────────

/// Record `count` more exam questions evidencing `prerequisite_id → topic_id`,
/// creating the edge on first sight. Strength is re-derived either way.
pub fn record_evidence<G: GraphTx + ?Sized>(
  tx: &G,
  prerequisite_id: Uuid,
  topic_id: Uuid,
  subtopic_id: Option<Uuid>,
  source: &str,
  count: u32,
) -> Result<PrerequisiteTopicEdge> {
  load(tx, prerequisite_id)?;
  let topic = tx
    .get_topic(topic_id)?
    .ok_or_else(|| Error::not_found(EntityKind::Topic, topic_id))?;
  if let Some(merged_into) = topic.status.merged_into() {
    return Err(Error::Conflict(format!(
      "topic {topic_id} was merged into {merged_into}; record evidence against the target"
    )));
  }

  match tx.find_edge(prerequisite_id, topic_id)? {
    Some(mut edge) => {
      let total = edge.frequency.checked_add(count).ok_or_else(|| {
        Error::execution(
          "record_evidence",
          format!("frequency overflow on edge {}", edge.edge_id),
        )
      })?;
      edge.set_frequency(total);
      if edge.subtopic_id.is_none() {
        edge.subtopic_id = subtopic_id;
      }
      tx.update_edge(&edge)?;
      Ok(edge)
    }
    None => {
      let mut edge = PrerequisiteTopicEdge::new(prerequisite_id, topic_id, count, source);
      edge.subtopic_id = subtopic_id;
      tx.insert_edge(&edge)?;
      Ok(edge)
    }
  }
}
