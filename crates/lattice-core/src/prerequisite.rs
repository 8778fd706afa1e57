//! Prerequisite: an atomic unit of background knowledge inferred from exam
//! questions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  lifecycle::{PrerequisiteStatus, Transition},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prerequisite {
  pub prerequisite_id: Uuid,
  pub name:            String,
  /// Stable dedup key, e.g. `concept:<id>` once bound to a concept.
  pub canonical_key:   Option<String>,
  #[serde(flatten)]
  pub status:          PrerequisiteStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Prerequisite {
  /// A fresh `Active` prerequisite with no canonical key.
  pub fn new(name: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      prerequisite_id: Uuid::new_v4(),
      name:            name.into(),
      canonical_key:   None,
      status:          PrerequisiteStatus::Active,
      created_at:      now,
      updated_at:      now,
    }
  }

  /// Move to the status `transition` leads to, stamping `updated_at`.
  /// Illegal transitions are conflicts naming this node.
  pub fn transition(&mut self, transition: &Transition) -> Result<()> {
    let next = self.status.apply(transition).map_err(|e| {
      Error::Conflict(format!("prerequisite {}: {e}", self.prerequisite_id))
    })?;
    self.status = next;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Bind the canonical key to `concept_id` unless one is already set.
  pub fn adopt_concept_key(&mut self, concept_id: Uuid) {
    if self.canonical_key.is_none() {
      self.canonical_key = Some(concept_key(concept_id));
    }
  }
}

pub fn concept_key(concept_id: Uuid) -> String { format!("concept:{concept_id}") }

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, lifecycle::Resolution};

  #[test]
  fn second_deprecation_is_a_conflict_naming_the_node() {
    let mut p = Prerequisite::new("Course of the facial nerve");
    p.transition(&Transition::Deprecate).unwrap();

    let err = p.transition(&Transition::Deprecate).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains(&p.prerequisite_id.to_string()));
    assert_eq!(p.status, PrerequisiteStatus::Deprecated);
  }

  #[test]
  fn rename_resolution_clears_review_reason() {
    let mut p = Prerequisite::new("facial n. course");
    p.status = PrerequisiteStatus::NeedsReview { reason: "abbreviation".into() };
    p.transition(&Transition::Resolve(Resolution::Renamed)).unwrap();
    assert_eq!(p.status.review_reason(), None);
  }

  #[test]
  fn existing_canonical_key_is_kept() {
    let mut p = Prerequisite::new("Brachial plexus");
    p.canonical_key = Some("manual:brachial-plexus".into());
    p.adopt_concept_key(Uuid::new_v4());
    assert_eq!(p.canonical_key.as_deref(), Some("manual:brachial-plexus"));
  }

  #[test]
  fn status_serializes_flat() {
    let mut p = Prerequisite::new("Cranial nerves");
    p.status = PrerequisiteStatus::NeedsReview { reason: "vague".into() };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["status"], "NEEDS_REVIEW");
    assert_eq!(json["reason"], "vague");
  }
}
