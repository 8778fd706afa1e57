//! Prerequisite → topic edges.
//!
//! At most one edge exists per `(prerequisite_id, topic_id)`. The strength is
//! derived from the frequency and is re-asserted by every method that changes
//! the frequency; fields are public for the storage layer, but callers should
//! change frequency only through [`PrerequisiteTopicEdge::set_frequency`] or
//! [`PrerequisiteTopicEdge::absorb`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, strength::Strength};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteTopicEdge {
  pub edge_id:         Uuid,
  pub prerequisite_id: Uuid,
  pub topic_id:        Uuid,
  pub subtopic_id:     Option<Uuid>,
  /// Number of exam questions evidencing this link.
  pub frequency:       u32,
  pub strength:        Strength,
  /// Provenance tag, e.g. `"exam-analysis"` or `"manual"`.
  pub source:          String,
  pub updated_at:      DateTime<Utc>,
}

impl PrerequisiteTopicEdge {
  pub fn new(
    prerequisite_id: Uuid,
    topic_id: Uuid,
    frequency: u32,
    source: impl Into<String>,
  ) -> Self {
    Self {
      edge_id: Uuid::new_v4(),
      prerequisite_id,
      topic_id,
      subtopic_id: None,
      frequency,
      strength: Strength::classify(u64::from(frequency)),
      source: source.into(),
      updated_at: Utc::now(),
    }
  }

  pub fn with_subtopic(mut self, subtopic_id: Uuid) -> Self {
    self.subtopic_id = Some(subtopic_id);
    self
  }

  pub fn set_frequency(&mut self, frequency: u32) {
    self.frequency = frequency;
    self.strength = Strength::classify(u64::from(frequency));
    self.updated_at = Utc::now();
  }

  /// Fold `other`'s evidence into this edge: frequencies add, strength is
  /// recomputed, and a missing subtopic is taken from `other`.
  ///
  /// Aggregation never lowers the tier; a lower tier means the frequency
  /// arithmetic is broken and is reported as an execution error.
  pub fn absorb(&mut self, other: &PrerequisiteTopicEdge) -> Result<()> {
    let before = self.strength.max(other.strength);
    let total = self.frequency.checked_add(other.frequency).ok_or_else(|| {
      Error::execution(
        "aggregate edge frequency",
        format!(
          "frequency overflow folding edge {} into edge {} (prerequisite {}, topic {}): {} + {}",
          other.edge_id,
          self.edge_id,
          self.prerequisite_id,
          self.topic_id,
          self.frequency,
          other.frequency
        ),
      )
    })?;
    self.set_frequency(total);
    if self.subtopic_id.is_none() {
      self.subtopic_id = other.subtopic_id;
    }
    if self.strength < before {
      return Err(Error::execution(
        "aggregate edge frequency",
        format!(
          "strength downgrade from {before} to {} on edge {} (prerequisite {}, topic {})",
          self.strength, self.edge_id, self.prerequisite_id, self.topic_id
        ),
      ));
    }
    Ok(())
  }

  pub fn is_consistent(&self) -> bool {
    self.strength == Strength::classify(u64::from(self.frequency))
  }
}
