//! Concepts: controlled-vocabulary entities a prerequisite may be bound to,
//! enabling deduplication by meaning rather than surface text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum ConceptStatus {
  #[default]
  Active,
  Provisional,
  Deprecated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAlias {
  pub alias:      String,
  pub normalized: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
  pub concept_id:       Uuid,
  pub preferred_label:  String,
  pub normalized_label: String,
  /// Free-form vocabulary type, e.g. `"anatomy"` or `"physiology"`.
  pub concept_type:     String,
  pub status:           ConceptStatus,
  pub aliases:          Vec<ConceptAlias>,
  pub created_at:       DateTime<Utc>,
}

impl Concept {
  pub fn new(preferred_label: impl Into<String>, concept_type: impl Into<String>) -> Self {
    let preferred_label = preferred_label.into();
    Self {
      concept_id:       Uuid::new_v4(),
      normalized_label: normalize_label(&preferred_label),
      preferred_label,
      concept_type:     concept_type.into(),
      status:           ConceptStatus::default(),
      aliases:          Vec::new(),
      created_at:       Utc::now(),
    }
  }

  pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
    let alias = alias.into();
    let normalized = normalize_label(&alias);
    if !self.aliases.iter().any(|a| a.normalized == normalized) {
      self.aliases.push(ConceptAlias { alias, normalized });
    }
    self
  }
}

/// Lowercase, turn punctuation into spaces, collapse whitespace.
pub fn normalize_label(label: &str) -> String {
  let cleaned: String = label
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .flat_map(char::to_lowercase)
    .collect();
  cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalization_folds_case_punctuation_and_spacing() {
    assert_eq!(normalize_label("  Facial   Nerve/Course "), "facial nerve course");
    assert_eq!(normalize_label("CN VII (facial)"), "cn vii facial");
    assert_eq!(normalize_label("Ménière's disease"), "ménière s disease");
  }

  #[test]
  fn aliases_are_deduplicated_by_normal_form() {
    let c = Concept::new("Facial nerve", "anatomy")
      .with_alias("CN VII")
      .with_alias("cn  vii");
    assert_eq!(c.aliases.len(), 1);
    assert_eq!(c.aliases[0].alias, "CN VII");
    assert_eq!(c.aliases[0].normalized, "cn vii");
    assert_eq!(c.normalized_label, "facial nerve");
  }
}
