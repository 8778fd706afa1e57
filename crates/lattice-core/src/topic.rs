//! Topics and subtopics.
//!
//! A topic is never deleted. Merging tombstones it: the row stays, its status
//! records where it was merged into, and historical references keep
//! resolving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicStatus {
  Active,
  Merged { merged_into: Uuid },
}

impl TopicStatus {
  pub fn merged_into(&self) -> Option<Uuid> {
    match self {
      Self::Merged { merged_into } => Some(*merged_into),
      Self::Active => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:     Uuid,
  pub lesson_id:    Uuid,
  pub name:         String,
  pub display_name: String,
  #[serde(flatten)]
  pub status:       TopicStatus,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Topic {
  pub fn new(lesson_id: Uuid, name: impl Into<String>) -> Self {
    let name = name.into();
    let now = Utc::now();
    Self {
      topic_id: Uuid::new_v4(),
      lesson_id,
      display_name: name.clone(),
      name,
      status: TopicStatus::Active,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Unique per `(name, topic_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
  pub subtopic_id: Uuid,
  pub topic_id:    Uuid,
  pub name:        String,
}

impl Subtopic {
  pub fn new(topic_id: Uuid, name: impl Into<String>) -> Self {
    Self { subtopic_id: Uuid::new_v4(), topic_id, name: name.into() }
  }
}
