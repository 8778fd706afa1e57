//! Dry-run projection of a prerequisite merge.
//!
//! Typed against [`GraphRead`], so it cannot write. The executor re-validates
//! everything from scratch; nothing here is authoritative.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  concept::Concept,
  lifecycle::StatusKind,
  merge::distinct_ids,
  store::GraphRead,
  strength::Strength,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
  pub prerequisite_id: Uuid,
  pub name:            String,
  pub status:          StatusKind,
  pub concept_count:   usize,
  pub edge_count:      usize,
  pub total_frequency: u64,
}

/// A concept bound to two or more candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedConcept {
  pub concept_id:      Uuid,
  pub preferred_label: String,
  pub shared_by:       Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtopicRef {
  pub subtopic_id: Uuid,
  pub name:        String,
}

/// The single edge a topic would keep after the merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedEdge {
  pub topic_id:           Uuid,
  pub topic_name:         String,
  pub combined_frequency: u64,
  pub strength:           Strength,
  /// Highest tier among the candidates' current edges to this topic.
  pub previous_strength:  Strength,
  pub subtopics:          Vec<SubtopicRef>,
  /// Candidates that currently have an edge to this topic.
  pub contributors:       Vec<Uuid>,
}

impl ProjectedEdge {
  pub fn is_upgrade(&self) -> bool { self.strength > self.previous_strength }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSummary {
  pub total_concepts:       usize,
  pub shared_concept_count: usize,
  pub topics_affected:      usize,
  pub strength_upgrades:    usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergePreview {
  pub candidates:      Vec<CandidateSummary>,
  /// Requested ids that no longer exist.
  pub missing:         Vec<Uuid>,
  pub shared_concepts: Vec<SharedConcept>,
  pub projected_edges: Vec<ProjectedEdge>,
  pub summary:         PreviewSummary,
}

#[derive(Default)]
struct TopicAccumulator {
  combined:     u64,
  strongest:    Option<Strength>,
  subtopics:    BTreeSet<Uuid>,
  contributors: Vec<Uuid>,
}

/// Project the outcome of merging `ids`.
///
/// Fails with a validation error unless at least two distinct ids exist.
pub fn preview_merge<G: GraphRead + ?Sized>(graph: &G, ids: &[Uuid]) -> Result<MergePreview> {
  let requested = distinct_ids(ids);

  let mut found = Vec::with_capacity(requested.len());
  let mut missing = Vec::new();
  for id in requested {
    match graph.get_prerequisite(id)? {
      Some(p) => found.push(p),
      None => missing.push(id),
    }
  }

  if found.len() < 2 {
    return Err(Error::Validation(format!(
      "a merge preview needs at least 2 distinct existing prerequisites, got {} (missing: {})",
      found.len(),
      crate::error::join_ids(&missing),
    )));
  }

  let mut candidates = Vec::with_capacity(found.len());
  let mut concept_owners: BTreeMap<Uuid, (Concept, Vec<Uuid>)> = BTreeMap::new();
  let mut topics: BTreeMap<Uuid, TopicAccumulator> = BTreeMap::new();

  for prerequisite in &found {
    let id = prerequisite.prerequisite_id;
    let concepts = graph.concepts_for_prerequisite(id)?;
    let edges = graph.edges_for_prerequisite(id)?;

    candidates.push(CandidateSummary {
      prerequisite_id: id,
      name:            prerequisite.name.clone(),
      status:          prerequisite.status.kind(),
      concept_count:   concepts.len(),
      edge_count:      edges.len(),
      total_frequency: edges.iter().map(|e| u64::from(e.frequency)).sum(),
    });

    for concept in concepts {
      concept_owners
        .entry(concept.concept_id)
        .or_insert_with(|| (concept, Vec::new()))
        .1
        .push(id);
    }

    for edge in edges {
      let acc = topics.entry(edge.topic_id).or_default();
      acc.combined += u64::from(edge.frequency);
      acc.strongest = acc.strongest.max(Some(edge.strength));
      acc.subtopics.extend(edge.subtopic_id);
      acc.contributors.push(id);
    }
  }

  let total_concepts = concept_owners.len();
  let mut shared_concepts: Vec<SharedConcept> = concept_owners
    .into_values()
    .filter(|(_, owners)| owners.len() >= 2)
    .map(|(concept, shared_by)| SharedConcept {
      concept_id: concept.concept_id,
      preferred_label: concept.preferred_label,
      shared_by,
    })
    .collect();
  shared_concepts.sort_by(|a, b| {
    a.preferred_label.cmp(&b.preferred_label).then(a.concept_id.cmp(&b.concept_id))
  });

  let mut projected_edges = Vec::with_capacity(topics.len());
  for (topic_id, acc) in topics {
    let topic = graph
      .get_topic(topic_id)?
      .ok_or_else(|| Error::not_found(EntityKind::Topic, topic_id))?;

    let mut subtopics = Vec::with_capacity(acc.subtopics.len());
    for subtopic_id in acc.subtopics {
      if let Some(s) = graph.get_subtopic(subtopic_id)? {
        subtopics.push(SubtopicRef { subtopic_id, name: s.name });
      }
    }

    let strength = Strength::classify(acc.combined);
    let previous_strength = acc.strongest.unwrap_or(Strength::Weak);
    if strength < previous_strength {
      return Err(Error::execution(
        "preview_merge",
        format!(
          "projected strength for topic {topic_id} drops from {previous_strength} to {strength}"
        ),
      ));
    }

    projected_edges.push(ProjectedEdge {
      topic_id,
      topic_name: topic.display_name,
      combined_frequency: acc.combined,
      strength,
      previous_strength,
      subtopics,
      contributors: acc.contributors,
    });
  }
  projected_edges.sort_by(|a, b| {
    a.topic_name.cmp(&b.topic_name).then(a.topic_id.cmp(&b.topic_id))
  });

  let summary = PreviewSummary {
    total_concepts,
    shared_concept_count: shared_concepts.len(),
    topics_affected: projected_edges.len(),
    strength_upgrades: projected_edges.iter().filter(|e| e.is_upgrade()).count(),
  };

  Ok(MergePreview { candidates, missing, shared_concepts, projected_edges, summary })
}
