//! Error types for `lattice-core`.
//!
//! Every variant folds onto one of four caller-facing classes via
//! [`Error::kind`]: validation, not-found, conflict, and execution.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The kind of graph entity an error refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Prerequisite,
  Topic,
  Subtopic,
  Concept,
  Edge,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityKind, id: Uuid },

  #[error("conflict: {0}")]
  Conflict(String),

  /// Another operation currently holds the advisory lock on these nodes.
  #[error("nodes locked by an operation in progress: {}", join_ids(.ids))]
  Locked { ids: Vec<Uuid> },

  /// A post-condition failed inside a transaction, or the store rejected it.
  /// The transaction has been rolled back.
  #[error("{operation} aborted: {reason}")]
  Execution {
    operation: &'static str,
    reason:    String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Caller-facing error class.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Execution,
}

impl Error {
  pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn execution(operation: &'static str, reason: impl Into<String>) -> Self {
    Self::Execution { operation, reason: reason.into() }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::Conflict(_) | Self::Locked { .. } => ErrorKind::Conflict,
      Self::Execution { .. } | Self::Store(_) | Self::Serialization(_) => {
        ErrorKind::Execution
      }
    }
  }

  /// Re-label failures raised inside `operation` as execution errors of
  /// that operation. Validation, not-found and conflict errors pass through.
  pub fn into_execution(self, operation: &'static str) -> Self {
    match self {
      Self::Execution { reason, .. } => Self::execution(operation, reason),
      Self::Store(e) => Self::execution(operation, e.to_string()),
      Self::Serialization(e) => Self::execution(operation, e.to_string()),
      other => other,
    }
  }
}

pub(crate) fn join_ids(ids: &[Uuid]) -> String {
  ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn locked_folds_onto_conflict() {
    let err = Error::Locked { ids: vec![Uuid::nil()] };
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains(&Uuid::nil().to_string()));
  }

  #[test]
  fn store_errors_become_execution_errors() {
    let io = std::io::Error::other("disk full");
    let err = Error::Store(Box::new(io)).into_execution("merge_prerequisites");
    assert!(matches!(
      err,
      Error::Execution { operation: "merge_prerequisites", ref reason } if reason == "disk full"
    ));
  }

  #[test]
  fn nested_execution_errors_take_the_outer_operation() {
    let err = Error::execution("aggregate edge frequency", "overflow")
      .into_execution("merge_topics");
    assert_eq!(err.to_string(), "merge_topics aborted: overflow");
  }

  #[test]
  fn validation_passes_through_into_execution() {
    let err = Error::Validation("too few ids".into()).into_execution("merge");
    assert_eq!(err.kind(), ErrorKind::Validation);
  }
}
