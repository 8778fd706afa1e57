//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their `snake_case` names. Rows are first read into `Raw*` structs
//! of plain column values, then decoded outside the row callback.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use lattice_core::{
  audit::{AuditAction, AuditRecord},
  concept::{Concept, ConceptAlias, ConceptStatus},
  edge::PrerequisiteTopicEdge,
  lifecycle::{PrerequisiteStatus, StatusKind},
  prerequisite::Prerequisite,
  reference::{ExamQuestion, QuestionCard},
  strength::Strength,
  topic::{Subtopic, Topic, TopicStatus},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a strum-encoded enum column.
fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

// ─── Status columns ──────────────────────────────────────────────────────────

/// `(status, review_reason)` column pair.
pub fn encode_prerequisite_status(status: &PrerequisiteStatus) -> (&'static str, Option<String>) {
  let kind: &'static str = match status.kind() {
    StatusKind::Active => "active",
    StatusKind::NeedsReview => "needs_review",
    StatusKind::Deprecated => "deprecated",
  };
  (kind, status.review_reason().map(str::to_owned))
}

fn decode_prerequisite_status(status: &str, reason: Option<String>) -> Result<PrerequisiteStatus> {
  match (decode_enum::<StatusKind>("prerequisites.status", status)?, reason) {
    (StatusKind::Active, _) => Ok(PrerequisiteStatus::Active),
    (StatusKind::NeedsReview, Some(reason)) => Ok(PrerequisiteStatus::NeedsReview { reason }),
    (StatusKind::NeedsReview, None) => Err(Error::Decode {
      column: "prerequisites.review_reason",
      value:  "NULL".into(),
    }),
    (StatusKind::Deprecated, _) => Ok(PrerequisiteStatus::Deprecated),
  }
}

/// `(status, merged_into)` column pair.
pub fn encode_topic_status(status: &TopicStatus) -> (&'static str, Option<String>) {
  match status {
    TopicStatus::Active => ("active", None),
    TopicStatus::Merged { merged_into } => ("merged", Some(encode_uuid(*merged_into))),
  }
}

fn decode_topic_status(status: &str, merged_into: Option<String>) -> Result<TopicStatus> {
  match (status, merged_into) {
    ("active", None) => Ok(TopicStatus::Active),
    ("merged", Some(into)) => Ok(TopicStatus::Merged { merged_into: decode_uuid(&into)? }),
    (other, _) => Err(Error::Decode { column: "topics.status", value: other.to_owned() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PREREQUISITE_COLUMNS: &str =
  "prerequisite_id, name, canonical_key, status, review_reason, created_at, updated_at";

pub struct RawPrerequisite {
  pub prerequisite_id: String,
  pub name:            String,
  pub canonical_key:   Option<String>,
  pub status:          String,
  pub review_reason:   Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawPrerequisite {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      prerequisite_id: row.get(0)?,
      name:            row.get(1)?,
      canonical_key:   row.get(2)?,
      status:          row.get(3)?,
      review_reason:   row.get(4)?,
      created_at:      row.get(5)?,
      updated_at:      row.get(6)?,
    })
  }

  pub fn into_prerequisite(self) -> Result<Prerequisite> {
    Ok(Prerequisite {
      prerequisite_id: decode_uuid(&self.prerequisite_id)?,
      name:            self.name,
      canonical_key:   self.canonical_key,
      status:          decode_prerequisite_status(&self.status, self.review_reason)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const TOPIC_COLUMNS: &str =
  "topic_id, lesson_id, name, display_name, status, merged_into, created_at, updated_at";

pub struct RawTopic {
  pub topic_id:     String,
  pub lesson_id:    String,
  pub name:         String,
  pub display_name: String,
  pub status:       String,
  pub merged_into:  Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawTopic {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:     row.get(0)?,
      lesson_id:    row.get(1)?,
      name:         row.get(2)?,
      display_name: row.get(3)?,
      status:       row.get(4)?,
      merged_into:  row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      topic_id:     decode_uuid(&self.topic_id)?,
      lesson_id:    decode_uuid(&self.lesson_id)?,
      name:         self.name,
      display_name: self.display_name,
      status:       decode_topic_status(&self.status, self.merged_into)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const SUBTOPIC_COLUMNS: &str = "subtopic_id, topic_id, name";

pub struct RawSubtopic {
  pub subtopic_id: String,
  pub topic_id:    String,
  pub name:        String,
}

impl RawSubtopic {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { subtopic_id: row.get(0)?, topic_id: row.get(1)?, name: row.get(2)? })
  }

  pub fn into_subtopic(self) -> Result<Subtopic> {
    Ok(Subtopic {
      subtopic_id: decode_uuid(&self.subtopic_id)?,
      topic_id:    decode_uuid(&self.topic_id)?,
      name:        self.name,
    })
  }
}

pub const EDGE_COLUMNS: &str = "edge_id, prerequisite_id, topic_id, subtopic_id, frequency, \
                                strength, source, updated_at";

pub struct RawEdge {
  pub edge_id:         String,
  pub prerequisite_id: String,
  pub topic_id:        String,
  pub subtopic_id:     Option<String>,
  pub frequency:       u32,
  pub strength:        String,
  pub source:          String,
  pub updated_at:      String,
}

impl RawEdge {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      edge_id:         row.get(0)?,
      prerequisite_id: row.get(1)?,
      topic_id:        row.get(2)?,
      subtopic_id:     row.get(3)?,
      frequency:       row.get(4)?,
      strength:        row.get(5)?,
      source:          row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_edge(self) -> Result<PrerequisiteTopicEdge> {
    Ok(PrerequisiteTopicEdge {
      edge_id:         decode_uuid(&self.edge_id)?,
      prerequisite_id: decode_uuid(&self.prerequisite_id)?,
      topic_id:        decode_uuid(&self.topic_id)?,
      subtopic_id:     decode_opt_uuid(self.subtopic_id)?,
      frequency:       self.frequency,
      strength:        decode_enum::<Strength>("prerequisite_topic_edges.strength", &self.strength)?,
      source:          self.source,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const CONCEPT_COLUMNS: &str =
  "c.concept_id, c.preferred_label, c.normalized_label, c.concept_type, c.status, c.created_at";

pub struct RawConcept {
  pub concept_id:       String,
  pub preferred_label:  String,
  pub normalized_label: String,
  pub concept_type:     String,
  pub status:           String,
  pub created_at:       String,
}

impl RawConcept {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      concept_id:       row.get(0)?,
      preferred_label:  row.get(1)?,
      normalized_label: row.get(2)?,
      concept_type:     row.get(3)?,
      status:           row.get(4)?,
      created_at:       row.get(5)?,
    })
  }

  /// Aliases live in their own table and are attached by the caller.
  pub fn into_concept(self, aliases: Vec<ConceptAlias>) -> Result<Concept> {
    Ok(Concept {
      concept_id:       decode_uuid(&self.concept_id)?,
      preferred_label:  self.preferred_label,
      normalized_label: self.normalized_label,
      concept_type:     self.concept_type,
      status:           decode_enum::<ConceptStatus>("concepts.status", &self.status)?,
      aliases,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub fn alias_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptAlias> {
  Ok(ConceptAlias { alias: row.get(0)?, normalized: row.get(1)? })
}

pub struct RawExamQuestion {
  pub question_id: String,
  pub lesson_id:   String,
  pub topic_id:    Option<String>,
  pub subtopic_id: Option<String>,
  pub created_at:  String,
}

impl RawExamQuestion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id: row.get(0)?,
      lesson_id:   row.get(1)?,
      topic_id:    row.get(2)?,
      subtopic_id: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_question(self) -> Result<ExamQuestion> {
    Ok(ExamQuestion {
      question_id: decode_uuid(&self.question_id)?,
      lesson_id:   decode_uuid(&self.lesson_id)?,
      topic_id:    decode_opt_uuid(self.topic_id)?,
      subtopic_id: decode_opt_uuid(self.subtopic_id)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawQuestionCard {
  pub card_id:         String,
  pub topic_id:        Option<String>,
  pub prerequisite_id: Option<String>,
  pub created_at:      String,
}

impl RawQuestionCard {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      card_id:         row.get(0)?,
      topic_id:        row.get(1)?,
      prerequisite_id: row.get(2)?,
      created_at:      row.get(3)?,
    })
  }

  pub fn into_card(self) -> Result<QuestionCard> {
    Ok(QuestionCard {
      card_id:         decode_uuid(&self.card_id)?,
      topic_id:        decode_opt_uuid(self.topic_id)?,
      prerequisite_id: decode_opt_uuid(self.prerequisite_id)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAuditRecord {
  pub audit_id:    String,
  pub entity_type: String,
  pub entity_id:   String,
  pub action:      String,
  pub actor_id:    Option<String>,
  pub details:     String,
  pub recorded_at: String,
}

impl RawAuditRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:    row.get(0)?,
      entity_type: row.get(1)?,
      entity_id:   row.get(2)?,
      action:      row.get(3)?,
      actor_id:    row.get(4)?,
      details:     row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<AuditRecord> {
    Ok(AuditRecord {
      audit_id:    decode_uuid(&self.audit_id)?,
      entity_type: self.entity_type,
      entity_id:   decode_uuid(&self.entity_id)?,
      action:      decode_enum::<AuditAction>("audit_log.action", &self.action)?,
      actor_id:    self.actor_id,
      details:     serde_json::from_str(&self.details)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
