//! Prerequisite merge: collapse a pool of prerequisites into one canonical
//! node inside a single transaction.
//!
//! [`merge_prerequisites`] validates, rewires edges, concept links and
//! question cards, deletes the sources, and then checks its own
//! post-conditions against a snapshot taken before any write. A failed check
//! is returned as an error, which makes the surrounding scope roll back.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  EntityKind, Error, Result,
  edge::PrerequisiteTopicEdge,
  lifecycle::{Resolution, Transition},
  prerequisite::Prerequisite,
  store::{GraphRead, GraphTx},
};

const OPERATION: &str = "merge_prerequisites";

// ─── Request ─────────────────────────────────────────────────────────────────

/// Which node survives the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalChoice {
  /// A member of the pool is kept.
  Existing(Uuid),
  /// Every pool member is folded into a newly created node.
  New { name: String },
}

impl CanonicalChoice {
  /// Build from the optional-field pair used on the wire. Exactly one must
  /// be present.
  pub fn from_parts(canonical_name: Option<String>, canonical_id: Option<Uuid>) -> Result<Self> {
    match (canonical_name, canonical_id) {
      (Some(_), Some(_)) => Err(Error::Validation(
        "specify either canonical_name or canonical_id, not both".into(),
      )),
      (None, None) => Err(Error::Validation(
        "a merge needs a canonical_name or a canonical_id".into(),
      )),
      (None, Some(id)) => Ok(Self::Existing(id)),
      (Some(name), None) => {
        let name = name.trim();
        if name.is_empty() {
          Err(Error::Validation("canonical_name must not be blank".into()))
        } else {
          Ok(Self::New { name: name.to_owned() })
        }
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
  pub prerequisite_ids: Vec<Uuid>,
  pub canonical:        CanonicalChoice,
}

impl MergeRequest {
  /// Every node id the merge may touch, for locking.
  pub fn node_ids(&self) -> Vec<Uuid> {
    let mut ids = distinct_ids(&self.prerequisite_ids);
    if let CanonicalChoice::Existing(id) = self.canonical
      && !ids.contains(&id)
    {
      ids.push(id);
    }
    ids
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSource {
  pub prerequisite_id: Uuid,
  pub name:            String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
  pub canonical:            Prerequisite,
  pub created_canonical:    bool,
  pub sources:              Vec<MergedSource>,
  /// Source edges re-pointed to the canonical node unchanged.
  pub edges_transferred:    usize,
  /// Source edges folded into an existing canonical edge.
  pub edges_merged:         usize,
  pub concepts_transferred: usize,
  pub cards_repointed:      u64,
}

// ─── Executor ────────────────────────────────────────────────────────────────

/// `ids` with duplicates removed, first occurrence kept.
pub fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
  let mut seen = HashSet::with_capacity(ids.len());
  ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Load every pool member, failing on the first missing one.
fn load_pool<G: GraphRead + ?Sized>(graph: &G, ids: &[Uuid]) -> Result<Vec<Prerequisite>> {
  ids
    .iter()
    .map(|&id| {
      graph
        .get_prerequisite(id)?
        .ok_or_else(|| Error::not_found(EntityKind::Prerequisite, id))
    })
    .collect()
}

/// Per-topic frequency totals across `owners`' edges.
fn topic_totals<G: GraphRead + ?Sized>(
  graph: &G,
  owners: impl IntoIterator<Item = Uuid>,
) -> Result<BTreeMap<Uuid, u64>> {
  let mut totals = BTreeMap::new();
  for owner in owners {
    for edge in graph.edges_for_prerequisite(owner)? {
      *totals.entry(edge.topic_id).or_insert(0) += u64::from(edge.frequency);
    }
  }
  Ok(totals)
}

pub fn merge_prerequisites<G: GraphTx + ?Sized>(
  tx: &G,
  request: &MergeRequest,
) -> Result<MergeOutcome> {
  // 1. Validate.
  let ids = distinct_ids(&request.prerequisite_ids);
  if ids.len() < 2 {
    return Err(Error::Validation(format!(
      "a merge needs at least 2 distinct prerequisites, got {}",
      ids.len()
    )));
  }
  if let CanonicalChoice::Existing(id) = request.canonical
    && !ids.contains(&id)
  {
    return Err(Error::Validation(format!(
      "canonical prerequisite {id} is not one of the merged prerequisites"
    )));
  }
  let pool = load_pool(tx, &ids)?;
  let before = topic_totals(tx, ids.iter().copied())?;

  // 2. Resolve the canonical node.
  let (mut canonical, created_canonical) = match &request.canonical {
    CanonicalChoice::Existing(id) => {
      let existing = pool
        .iter()
        .find(|p| p.prerequisite_id == *id)
        .cloned()
        .ok_or_else(|| Error::not_found(EntityKind::Prerequisite, *id))?;
      (existing, false)
    }
    CanonicalChoice::New { name } => {
      let fresh = Prerequisite::new(name.clone());
      tx.insert_prerequisite(&fresh)?;
      (fresh, true)
    }
  };
  let canonical_id = canonical.prerequisite_id;
  canonical.transition(&Transition::Resolve(Resolution::MergedAsCanonical))?;

  let sources: Vec<Prerequisite> =
    pool.into_iter().filter(|p| p.prerequisite_id != canonical_id).collect();

  let mut edges_transferred = 0;
  let mut edges_merged = 0;
  let mut concepts_transferred = 0;
  let mut cards_repointed = 0;

  for source in &sources {
    let source_id = source.prerequisite_id;

    // 3. Edges: fold into an existing canonical edge, or re-point.
    for mut edge in tx.edges_for_prerequisite(source_id)? {
      match tx.find_edge(canonical_id, edge.topic_id)? {
        Some(mut target) => {
          target.absorb(&edge)?;
          tx.update_edge(&target)?;
          tx.delete_edge(edge.edge_id)?;
          edges_merged += 1;
        }
        None => {
          edge.prerequisite_id = canonical_id;
          edge.updated_at = Utc::now();
          tx.update_edge(&edge)?;
          edges_transferred += 1;
        }
      }
    }

    // 4. Concept bindings.
    for concept in tx.concepts_for_prerequisite(source_id)? {
      if tx.link_concept(canonical_id, concept.concept_id)? {
        concepts_transferred += 1;
      }
    }
    tx.unlink_all_concepts(source_id)?;

    // 5. Referencing records.
    cards_repointed += tx.repoint_question_cards_prerequisite(source_id, canonical_id)?;

    // 6. The source itself.
    tx.delete_prerequisite(source_id)?;
  }

  if let Some(first) = tx.concepts_for_prerequisite(canonical_id)?.first() {
    canonical.adopt_concept_key(first.concept_id);
  }
  tx.update_prerequisite(&canonical)?;

  verify(tx, canonical_id, &sources, &before)?;

  Ok(MergeOutcome {
    canonical,
    created_canonical,
    sources: sources
      .into_iter()
      .map(|p| MergedSource { prerequisite_id: p.prerequisite_id, name: p.name })
      .collect(),
    edges_transferred,
    edges_merged,
    concepts_transferred,
    cards_repointed,
  })
}

/// Post-conditions checked before commit.
fn verify<G: GraphRead + ?Sized>(
  graph: &G,
  canonical_id: Uuid,
  sources: &[Prerequisite],
  before: &BTreeMap<Uuid, u64>,
) -> Result<()> {
  let edges: Vec<PrerequisiteTopicEdge> = graph.edges_for_prerequisite(canonical_id)?;

  let mut topics = BTreeSet::new();
  for edge in &edges {
    if !topics.insert(edge.topic_id) {
      return Err(Error::execution(
        OPERATION,
        format!(
          "duplicate edge for prerequisite {canonical_id} and topic {}",
          edge.topic_id
        ),
      ));
    }
    if !edge.is_consistent() {
      return Err(Error::execution(
        OPERATION,
        format!(
          "edge {} has strength {} for frequency {}",
          edge.edge_id, edge.strength, edge.frequency
        ),
      ));
    }
  }

  let after = topic_totals(graph, [canonical_id])?;
  if &after != before {
    let topic = before
      .keys()
      .chain(after.keys())
      .find(|t| before.get(t) != after.get(t))
      .copied()
      .unwrap_or_default();
    return Err(Error::execution(
      OPERATION,
      format!(
        "frequency not conserved for topic {topic}: {} before, {} after",
        before.get(&topic).copied().unwrap_or(0),
        after.get(&topic).copied().unwrap_or(0),
      ),
    ));
  }

  for source in sources {
    let id = source.prerequisite_id;
    if graph.get_prerequisite(id)?.is_some() {
      return Err(Error::execution(OPERATION, format!("source prerequisite {id} still exists")));
    }
    let refs = graph.prerequisite_references(id)?;
    if !refs.is_empty() {
      return Err(Error::execution(
        OPERATION,
        format!(
          "deleted prerequisite {id} is still referenced by {} edges, {} concept links, {} question cards",
          refs.edges, refs.concept_links, refs.question_cards
        ),
      ));
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[test]
  fn canonical_choice_requires_exactly_one_mode() {
    let id = Uuid::new_v4();
    assert_eq!(
      CanonicalChoice::from_parts(None, Some(id)).unwrap(),
      CanonicalChoice::Existing(id)
    );
    assert_eq!(
      CanonicalChoice::from_parts(Some("  Facial nerve course ".into()), None).unwrap(),
      CanonicalChoice::New { name: "Facial nerve course".into() }
    );

    for (name, id) in [(Some("x".to_string()), Some(id)), (None, None), (Some("  ".into()), None)] {
      let err = CanonicalChoice::from_parts(name, id).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Validation);
    }
  }

  #[test]
  fn distinct_ids_keeps_first_occurrence_order() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    assert_eq!(distinct_ids(&[b, a, b, c, a]), vec![b, a, c]);
  }

  #[test]
  fn node_ids_include_outside_canonical_once() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let req = MergeRequest {
      prerequisite_ids: vec![a, b, a],
      canonical:        CanonicalChoice::Existing(c),
    };
    assert_eq!(req.node_ids(), vec![a, b, c]);

    let req = MergeRequest {
      prerequisite_ids: vec![a, b],
      canonical:        CanonicalChoice::Existing(b),
    };
    assert_eq!(req.node_ids(), vec![a, b]);
  }
}
