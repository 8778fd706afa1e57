//! Review lifecycle of a prerequisite.
//!
//! A prerequisite is `Active`, `NeedsReview` (flagged by upstream heuristics,
//! with a reason), or `Deprecated` (terminal). Every status change goes
//! through [`PrerequisiteStatus::apply`], the single transition table.

use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The review status of a prerequisite. The reason exists exactly when the
/// node needs review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrerequisiteStatus {
  Active,
  NeedsReview { reason: String },
  Deprecated,
}

/// Fieldless projection of [`PrerequisiteStatus`]; used for filtering and as
/// the stored column value.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum StatusKind {
  Active,
  NeedsReview,
  Deprecated,
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// How a flagged node was resolved back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
  Linked,
  Renamed,
  MergedAsCanonical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  Deprecate,
  Flag { reason: String },
  Resolve(Resolution),
}

impl Transition {
  fn label(&self) -> &'static str {
    match self {
      Self::Deprecate => "deprecate",
      Self::Flag { .. } => "flag for review",
      Self::Resolve(Resolution::Linked) => "link concepts",
      Self::Resolve(Resolution::Renamed) => "rename",
      Self::Resolve(Resolution::MergedAsCanonical) => "merge as canonical",
    }
  }
}

/// A transition the table does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a {from} prerequisite")]
pub struct IllegalTransition {
  pub from:   StatusKind,
  pub action: &'static str,
}

impl PrerequisiteStatus {
  pub fn kind(&self) -> StatusKind {
    match self {
      Self::Active => StatusKind::Active,
      Self::NeedsReview { .. } => StatusKind::NeedsReview,
      Self::Deprecated => StatusKind::Deprecated,
    }
  }

  pub fn review_reason(&self) -> Option<&str> {
    match self {
      Self::NeedsReview { reason } => Some(reason),
      _ => None,
    }
  }

  pub fn is_deprecated(&self) -> bool { matches!(self, Self::Deprecated) }

  /// Apply `transition`, returning the next status.
  ///
  /// `Deprecated` is terminal: every transition out of it is rejected,
  /// including a second deprecation.
  pub fn apply(
    &self,
    transition: &Transition,
  ) -> Result<PrerequisiteStatus, IllegalTransition> {
    match (self, transition) {
      (Self::Deprecated, t) => Err(IllegalTransition {
        from:   StatusKind::Deprecated,
        action: t.label(),
      }),
      (_, Transition::Deprecate) => Ok(Self::Deprecated),
      (_, Transition::Flag { reason }) => {
        Ok(Self::NeedsReview { reason: reason.clone() })
      }
      (_, Transition::Resolve(_)) => Ok(Self::Active),
    }
  }
}

// ─── Review decisions ────────────────────────────────────────────────────────

/// The admin-facing decision labels, also used by the advisory service.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ReviewDecision {
  Link,
  Rename,
  Merge,
  Ignore,
}

impl ReviewDecision {
  /// Decisions an admin may still act on for a node in `status`.
  pub fn available_for(status: &PrerequisiteStatus) -> Vec<ReviewDecision> {
    if status.is_deprecated() {
      Vec::new()
    } else {
      vec![Self::Link, Self::Rename, Self::Merge, Self::Ignore]
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn flagged() -> PrerequisiteStatus {
    PrerequisiteStatus::NeedsReview { reason: "looks like a duplicate".into() }
  }

  #[test]
  fn deprecate_from_active_and_needs_review() {
    for from in [PrerequisiteStatus::Active, flagged()] {
      assert_eq!(
        from.apply(&Transition::Deprecate).unwrap(),
        PrerequisiteStatus::Deprecated
      );
    }
  }

  #[test]
  fn deprecated_is_terminal() {
    let dep = PrerequisiteStatus::Deprecated;
    let err = dep.apply(&Transition::Deprecate).unwrap_err();
    assert_eq!(err.from, StatusKind::Deprecated);
    assert_eq!(err.to_string(), "cannot deprecate a deprecated prerequisite");

    assert!(dep.apply(&Transition::Resolve(Resolution::Linked)).is_err());
    assert!(dep.apply(&Transition::Flag { reason: "x".into() }).is_err());
  }

  #[test]
  fn resolution_returns_flagged_node_to_active() {
    for r in [Resolution::Linked, Resolution::Renamed, Resolution::MergedAsCanonical] {
      assert_eq!(
        flagged().apply(&Transition::Resolve(r)).unwrap(),
        PrerequisiteStatus::Active
      );
    }
  }

  #[test]
  fn flag_replaces_reason() {
    let next = flagged()
      .apply(&Transition::Flag { reason: "ambiguous wording".into() })
      .unwrap();
    assert_eq!(next.review_reason(), Some("ambiguous wording"));
  }

  #[test]
  fn decisions_parse_case_insensitively() {
    assert_eq!("merge".parse::<ReviewDecision>().unwrap(), ReviewDecision::Merge);
    assert_eq!("IGNORE".parse::<ReviewDecision>().unwrap(), ReviewDecision::Ignore);
    let json: ReviewDecision = serde_json::from_str("\"LINK\"").unwrap();
    assert_eq!(json, ReviewDecision::Link);
  }

  #[test]
  fn deprecated_nodes_offer_no_actions() {
    assert!(ReviewDecision::available_for(&PrerequisiteStatus::Deprecated).is_empty());
    assert_eq!(ReviewDecision::available_for(&PrerequisiteStatus::Active).len(), 4);
  }
}
