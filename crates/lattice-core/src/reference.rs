//! Records that point into the graph. Merges re-point them; nothing here is
//! inspected for business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An analysed exam question, classified under a topic and maybe a subtopic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
  pub question_id: Uuid,
  pub lesson_id:   Uuid,
  pub topic_id:    Option<Uuid>,
  pub subtopic_id: Option<Uuid>,
  pub created_at:  DateTime<Utc>,
}

impl ExamQuestion {
  pub fn new(lesson_id: Uuid, topic_id: Option<Uuid>, subtopic_id: Option<Uuid>) -> Self {
    Self {
      question_id: Uuid::new_v4(),
      lesson_id,
      topic_id,
      subtopic_id,
      created_at: Utc::now(),
    }
  }
}

/// A generated study question card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCard {
  pub card_id:         Uuid,
  pub topic_id:        Option<Uuid>,
  pub prerequisite_id: Option<Uuid>,
  pub created_at:      DateTime<Utc>,
}

impl QuestionCard {
  pub fn new(topic_id: Option<Uuid>, prerequisite_id: Option<Uuid>) -> Self {
    Self {
      card_id: Uuid::new_v4(),
      topic_id,
      prerequisite_id,
      created_at: Utc::now(),
    }
  }
}

/// Everything that still points at a prerequisite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCounts {
  pub edges:          u64,
  pub concept_links:  u64,
  pub question_cards: u64,
}

impl ReferenceCounts {
  pub fn is_empty(&self) -> bool {
    self.edges == 0 && self.concept_links == 0 && self.question_cards == 0
  }
}
