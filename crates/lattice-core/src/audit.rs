//! Post-hoc audit records for completed curation actions.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EntityKind;

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
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
  MergePrerequisites,
  MergeTopics,
  MergeSubtopics,
  Deprecate,
  FlagForReview,
  Rename,
  LinkConcepts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
  pub audit_id:    Uuid,
  pub entity_type: String,
  pub entity_id:   Uuid,
  pub action:      AuditAction,
  pub actor_id:    Option<String>,
  pub details:     serde_json::Value,
  pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
  pub fn new(
    entity: EntityKind,
    entity_id: Uuid,
    action: AuditAction,
    actor_id: Option<String>,
    details: serde_json::Value,
  ) -> Self {
    Self {
      audit_id: Uuid::new_v4(),
      entity_type: entity.to_string(),
      entity_id,
      action,
      actor_id,
      details,
      recorded_at: Utc::now(),
    }
  }
}

/// Append-only destination for [`AuditRecord`]s.
///
/// Called after the business transaction has committed; a failing sink is
/// logged by the caller and never undoes the action.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn append(
    &self,
    record: AuditRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
