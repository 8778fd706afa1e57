//! [`SqliteGraph`]: the graph accessor over one open SQLite transaction.

use lattice_core::{
  EntityKind,
  concept::{Concept, ConceptAlias},
  edge::PrerequisiteTopicEdge,
  prerequisite::Prerequisite,
  reference::{ExamQuestion, QuestionCard, ReferenceCounts},
  store::{GraphRead, GraphTx, PrerequisiteQuery},
  topic::{Subtopic, Topic},
};
use rusqlite::{Connection, OptionalExtension as _, Params, Row, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CONCEPT_COLUMNS, EDGE_COLUMNS, PREREQUISITE_COLUMNS, RawConcept, RawEdge, RawExamQuestion,
    RawPrerequisite, RawQuestionCard, RawSubtopic, RawTopic, SUBTOPIC_COLUMNS, TOPIC_COLUMNS,
    alias_from_row, encode_dt, encode_prerequisite_status, encode_topic_status, encode_uuid,
  },
};

type CoreResult<T> = lattice_core::Result<T>;

/// Borrowed view of a connection that is inside a transaction.
///
/// Constructed only by [`crate::SqliteStore`], which owns the transaction
/// and decides whether to commit it.
pub struct SqliteGraph<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteGraph<'c> {
  pub(crate) fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn one<R>(
    &self,
    sql: &str,
    params: impl Params,
    map: impl FnOnce(&Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Option<R>> {
    Ok(self.conn.query_row(sql, params, map).optional()?)
  }

  fn many<R>(
    &self,
    sql: &str,
    params: impl Params,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Vec<R>> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, map)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  /// Run a write and return the number of affected rows.
  fn exec(&self, sql: &str, params: impl Params) -> Result<u64> {
    let mut stmt = self.conn.prepare_cached(sql)?;
    Ok(stmt.execute(params)? as u64)
  }

  fn count(&self, sql: &str, params: impl Params) -> Result<u64> {
    let n: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as u64)
  }

  /// Fails with not-found if a keyed write touched no row.
  fn exec_one(&self, entity: EntityKind, id: Uuid, sql: &str, params: impl Params) -> CoreResult<()> {
    if self.exec(sql, params)? == 0 {
      return Err(lattice_core::Error::not_found(entity, id));
    }
    Ok(())
  }

  fn aliases(&self, concept_id: &str) -> Result<Vec<ConceptAlias>> {
    self.many(
      "SELECT alias, normalized FROM concept_aliases WHERE concept_id = ?1 ORDER BY rowid",
      params![concept_id],
      alias_from_row,
    )
  }

  fn concepts(&self, raws: Vec<RawConcept>) -> Result<Vec<Concept>> {
    raws
      .into_iter()
      .map(|raw| {
        let aliases = self.aliases(&raw.concept_id)?;
        raw.into_concept(aliases)
      })
      .collect()
  }

  fn edges(&self, sql: &str, id: Uuid) -> Result<Vec<PrerequisiteTopicEdge>> {
    self
      .many(sql, params![encode_uuid(id)], RawEdge::from_row)?
      .into_iter()
      .map(RawEdge::into_edge)
      .collect()
  }
}

/// Escape `LIKE` wildcards so `text` matches literally under `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

// ─── GraphRead impl ──────────────────────────────────────────────────────────

impl GraphRead for SqliteGraph<'_> {
  // ── Prerequisites ─────────────────────────────────────────────────────────

  fn get_prerequisite(&self, id: Uuid) -> CoreResult<Option<Prerequisite>> {
    let raw = self.one(
      &format!("SELECT {PREREQUISITE_COLUMNS} FROM prerequisites WHERE prerequisite_id = ?1"),
      params![encode_uuid(id)],
      RawPrerequisite::from_row,
    )?;
    Ok(raw.map(RawPrerequisite::into_prerequisite).transpose()?)
  }

  fn list_prerequisites(&self, query: &PrerequisiteQuery) -> CoreResult<Vec<Prerequisite>> {
    let status = query.status.map(|s| s.to_string());
    let pattern = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| format!("%{}%", escape_like(t)));
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

    let raws = self.many(
      &format!(
        "SELECT {PREREQUISITE_COLUMNS} FROM prerequisites
         WHERE (?1 IS NULL OR status = ?1)
           AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\\')
         ORDER BY name, prerequisite_id
         LIMIT ?3 OFFSET ?4"
      ),
      params![status, pattern, limit, offset],
      RawPrerequisite::from_row,
    )?;
    Ok(
      raws
        .into_iter()
        .map(RawPrerequisite::into_prerequisite)
        .collect::<Result<_>>()?,
    )
  }

  fn prerequisite_references(&self, id: Uuid) -> CoreResult<ReferenceCounts> {
    let id = encode_uuid(id);
    Ok(ReferenceCounts {
      edges:          self.count(
        "SELECT COUNT(*) FROM prerequisite_topic_edges WHERE prerequisite_id = ?1",
        params![id],
      )?,
      concept_links:  self.count(
        "SELECT COUNT(*) FROM prerequisite_concepts WHERE prerequisite_id = ?1",
        params![id],
      )?,
      question_cards: self.count(
        "SELECT COUNT(*) FROM question_cards WHERE prerequisite_id = ?1",
        params![id],
      )?,
    })
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  fn get_topic(&self, id: Uuid) -> CoreResult<Option<Topic>> {
    let raw = self.one(
      &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
      params![encode_uuid(id)],
      RawTopic::from_row,
    )?;
    Ok(raw.map(RawTopic::into_topic).transpose()?)
  }

  fn list_topics(&self, lesson_id: Uuid) -> CoreResult<Vec<Topic>> {
    let raws = self.many(
      &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE lesson_id = ?1 ORDER BY name, topic_id"),
      params![encode_uuid(lesson_id)],
      RawTopic::from_row,
    )?;
    Ok(raws.into_iter().map(RawTopic::into_topic).collect::<Result<_>>()?)
  }

  fn get_subtopic(&self, id: Uuid) -> CoreResult<Option<Subtopic>> {
    let raw = self.one(
      &format!("SELECT {SUBTOPIC_COLUMNS} FROM subtopics WHERE subtopic_id = ?1"),
      params![encode_uuid(id)],
      RawSubtopic::from_row,
    )?;
    Ok(raw.map(RawSubtopic::into_subtopic).transpose()?)
  }

  fn subtopics_for_topic(&self, topic_id: Uuid) -> CoreResult<Vec<Subtopic>> {
    let raws = self.many(
      &format!("SELECT {SUBTOPIC_COLUMNS} FROM subtopics WHERE topic_id = ?1 ORDER BY name"),
      params![encode_uuid(topic_id)],
      RawSubtopic::from_row,
    )?;
    Ok(raws.into_iter().map(RawSubtopic::into_subtopic).collect::<Result<_>>()?)
  }

  fn find_subtopic(&self, topic_id: Uuid, name: &str) -> CoreResult<Option<Subtopic>> {
    let raw = self.one(
      &format!("SELECT {SUBTOPIC_COLUMNS} FROM subtopics WHERE topic_id = ?1 AND name = ?2"),
      params![encode_uuid(topic_id), name],
      RawSubtopic::from_row,
    )?;
    Ok(raw.map(RawSubtopic::into_subtopic).transpose()?)
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  fn edges_for_prerequisite(&self, prerequisite_id: Uuid) -> CoreResult<Vec<PrerequisiteTopicEdge>> {
    Ok(self.edges(
      &format!(
        "SELECT {EDGE_COLUMNS} FROM prerequisite_topic_edges
         WHERE prerequisite_id = ?1 ORDER BY topic_id"
      ),
      prerequisite_id,
    )?)
  }

  fn edges_for_topic(&self, topic_id: Uuid) -> CoreResult<Vec<PrerequisiteTopicEdge>> {
    Ok(self.edges(
      &format!(
        "SELECT {EDGE_COLUMNS} FROM prerequisite_topic_edges
         WHERE topic_id = ?1 ORDER BY prerequisite_id"
      ),
      topic_id,
    )?)
  }

  fn find_edge(
    &self,
    prerequisite_id: Uuid,
    topic_id: Uuid,
  ) -> CoreResult<Option<PrerequisiteTopicEdge>> {
    let raw = self.one(
      &format!(
        "SELECT {EDGE_COLUMNS} FROM prerequisite_topic_edges
         WHERE prerequisite_id = ?1 AND topic_id = ?2"
      ),
      params![encode_uuid(prerequisite_id), encode_uuid(topic_id)],
      RawEdge::from_row,
    )?;
    Ok(raw.map(RawEdge::into_edge).transpose()?)
  }

  // ── Concepts ──────────────────────────────────────────────────────────────

  fn get_concept(&self, id: Uuid) -> CoreResult<Option<Concept>> {
    let raw = self.one(
      &format!("SELECT {CONCEPT_COLUMNS} FROM concepts c WHERE c.concept_id = ?1"),
      params![encode_uuid(id)],
      RawConcept::from_row,
    )?;
    Ok(self.concepts(raw.into_iter().collect())?.pop())
  }

  fn concepts_for_prerequisite(&self, prerequisite_id: Uuid) -> CoreResult<Vec<Concept>> {
    // Link order, so "the first concept" is stable.
    let raws = self.many(
      &format!(
        "SELECT {CONCEPT_COLUMNS}
         FROM prerequisite_concepts pc
         JOIN concepts c ON c.concept_id = pc.concept_id
         WHERE pc.prerequisite_id = ?1
         ORDER BY pc.rowid"
      ),
      params![encode_uuid(prerequisite_id)],
      RawConcept::from_row,
    )?;
    Ok(self.concepts(raws)?)
  }

  // ── Referencing records ───────────────────────────────────────────────────

  fn get_exam_question(&self, id: Uuid) -> CoreResult<Option<ExamQuestion>> {
    let raw = self.one(
      "SELECT question_id, lesson_id, topic_id, subtopic_id, created_at
       FROM exam_questions WHERE question_id = ?1",
      params![encode_uuid(id)],
      RawExamQuestion::from_row,
    )?;
    Ok(raw.map(RawExamQuestion::into_question).transpose()?)
  }

  fn get_question_card(&self, id: Uuid) -> CoreResult<Option<QuestionCard>> {
    let raw = self.one(
      "SELECT card_id, topic_id, prerequisite_id, created_at
       FROM question_cards WHERE card_id = ?1",
      params![encode_uuid(id)],
      RawQuestionCard::from_row,
    )?;
    Ok(raw.map(RawQuestionCard::into_card).transpose()?)
  }

  fn count_exam_questions_for_topic(&self, topic_id: Uuid) -> CoreResult<u64> {
    Ok(self.count(
      "SELECT COUNT(*) FROM exam_questions WHERE topic_id = ?1",
      params![encode_uuid(topic_id)],
    )?)
  }

  fn count_exam_questions_for_subtopic(&self, subtopic_id: Uuid) -> CoreResult<u64> {
    Ok(self.count(
      "SELECT COUNT(*) FROM exam_questions WHERE subtopic_id = ?1",
      params![encode_uuid(subtopic_id)],
    )?)
  }
}

// ─── GraphTx impl ────────────────────────────────────────────────────────────

impl GraphTx for SqliteGraph<'_> {
  // ── Prerequisites ─────────────────────────────────────────────────────────

  fn insert_prerequisite(&self, p: &Prerequisite) -> CoreResult<()> {
    let (status, reason) = encode_prerequisite_status(&p.status);
    self.exec(
      &format!("INSERT INTO prerequisites ({PREREQUISITE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
      params![
        encode_uuid(p.prerequisite_id),
        p.name,
        p.canonical_key,
        status,
        reason,
        encode_dt(p.created_at),
        encode_dt(p.updated_at),
      ],
    )?;
    Ok(())
  }

  fn update_prerequisite(&self, p: &Prerequisite) -> CoreResult<()> {
    let (status, reason) = encode_prerequisite_status(&p.status);
    self.exec_one(
      EntityKind::Prerequisite,
      p.prerequisite_id,
      "UPDATE prerequisites
       SET name = ?2, canonical_key = ?3, status = ?4, review_reason = ?5, updated_at = ?6
       WHERE prerequisite_id = ?1",
      params![
        encode_uuid(p.prerequisite_id),
        p.name,
        p.canonical_key,
        status,
        reason,
        encode_dt(p.updated_at),
      ],
    )
  }

  fn delete_prerequisite(&self, id: Uuid) -> CoreResult<()> {
    self.exec_one(
      EntityKind::Prerequisite,
      id,
      "DELETE FROM prerequisites WHERE prerequisite_id = ?1",
      params![encode_uuid(id)],
    )
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  fn insert_topic(&self, t: &Topic) -> CoreResult<()> {
    let (status, merged_into) = encode_topic_status(&t.status);
    self.exec(
      &format!("INSERT INTO topics ({TOPIC_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
      params![
        encode_uuid(t.topic_id),
        encode_uuid(t.lesson_id),
        t.name,
        t.display_name,
        status,
        merged_into,
        encode_dt(t.created_at),
        encode_dt(t.updated_at),
      ],
    )?;
    Ok(())
  }

  fn update_topic(&self, t: &Topic) -> CoreResult<()> {
    let (status, merged_into) = encode_topic_status(&t.status);
    self.exec_one(
      EntityKind::Topic,
      t.topic_id,
      "UPDATE topics
       SET name = ?2, display_name = ?3, status = ?4, merged_into = ?5, updated_at = ?6
       WHERE topic_id = ?1",
      params![
        encode_uuid(t.topic_id),
        t.name,
        t.display_name,
        status,
        merged_into,
        encode_dt(t.updated_at),
      ],
    )
  }

  fn insert_subtopic(&self, s: &Subtopic) -> CoreResult<()> {
    self.exec(
      &format!("INSERT INTO subtopics ({SUBTOPIC_COLUMNS}) VALUES (?1, ?2, ?3)"),
      params![encode_uuid(s.subtopic_id), encode_uuid(s.topic_id), s.name],
    )?;
    Ok(())
  }

  fn move_subtopic(&self, subtopic_id: Uuid, topic_id: Uuid) -> CoreResult<()> {
    self.exec_one(
      EntityKind::Subtopic,
      subtopic_id,
      "UPDATE subtopics SET topic_id = ?2 WHERE subtopic_id = ?1",
      params![encode_uuid(subtopic_id), encode_uuid(topic_id)],
    )
  }

  fn delete_subtopic(&self, subtopic_id: Uuid) -> CoreResult<()> {
    self.exec_one(
      EntityKind::Subtopic,
      subtopic_id,
      "DELETE FROM subtopics WHERE subtopic_id = ?1",
      params![encode_uuid(subtopic_id)],
    )
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  fn insert_edge(&self, e: &PrerequisiteTopicEdge) -> CoreResult<()> {
    self.exec(
      &format!(
        "INSERT INTO prerequisite_topic_edges ({EDGE_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
      ),
      params![
        encode_uuid(e.edge_id),
        encode_uuid(e.prerequisite_id),
        encode_uuid(e.topic_id),
        e.subtopic_id.map(encode_uuid),
        e.frequency,
        e.strength.as_ref(),
        e.source,
        encode_dt(e.updated_at),
      ],
    )?;
    Ok(())
  }

  fn update_edge(&self, e: &PrerequisiteTopicEdge) -> CoreResult<()> {
    self.exec_one(
      EntityKind::Edge,
      e.edge_id,
      "UPDATE prerequisite_topic_edges
       SET prerequisite_id = ?2, topic_id = ?3, subtopic_id = ?4, frequency = ?5,
           strength = ?6, source = ?7, updated_at = ?8
       WHERE edge_id = ?1",
      params![
        encode_uuid(e.edge_id),
        encode_uuid(e.prerequisite_id),
        encode_uuid(e.topic_id),
        e.subtopic_id.map(encode_uuid),
        e.frequency,
        e.strength.as_ref(),
        e.source,
        encode_dt(e.updated_at),
      ],
    )
  }

  fn delete_edge(&self, edge_id: Uuid) -> CoreResult<()> {
    self.exec_one(
      EntityKind::Edge,
      edge_id,
      "DELETE FROM prerequisite_topic_edges WHERE edge_id = ?1",
      params![encode_uuid(edge_id)],
    )
  }

  fn repoint_edges_subtopic(&self, from: Uuid, to: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "UPDATE prerequisite_topic_edges SET subtopic_id = ?2 WHERE subtopic_id = ?1",
      params![encode_uuid(from), encode_uuid(to)],
    )?)
  }

  // ── Concepts ──────────────────────────────────────────────────────────────

  fn insert_concept(&self, c: &Concept) -> CoreResult<()> {
    let id = encode_uuid(c.concept_id);
    self.exec(
      "INSERT INTO concepts
         (concept_id, preferred_label, normalized_label, concept_type, status, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        id,
        c.preferred_label,
        c.normalized_label,
        c.concept_type,
        c.status.as_ref(),
        encode_dt(c.created_at),
      ],
    )?;
    for alias in &c.aliases {
      self.exec(
        "INSERT INTO concept_aliases (concept_id, alias, normalized) VALUES (?1, ?2, ?3)",
        params![id, alias.alias, alias.normalized],
      )?;
    }
    Ok(())
  }

  fn link_concept(&self, prerequisite_id: Uuid, concept_id: Uuid) -> CoreResult<bool> {
    let inserted = self.exec(
      "INSERT OR IGNORE INTO prerequisite_concepts (prerequisite_id, concept_id, linked_at)
       VALUES (?1, ?2, ?3)",
      params![
        encode_uuid(prerequisite_id),
        encode_uuid(concept_id),
        encode_dt(chrono::Utc::now()),
      ],
    )?;
    Ok(inserted == 1)
  }

  fn unlink_all_concepts(&self, prerequisite_id: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "DELETE FROM prerequisite_concepts WHERE prerequisite_id = ?1",
      params![encode_uuid(prerequisite_id)],
    )?)
  }

  // ── Referencing records ───────────────────────────────────────────────────

  fn insert_exam_question(&self, q: &ExamQuestion) -> CoreResult<()> {
    self.exec(
      "INSERT INTO exam_questions (question_id, lesson_id, topic_id, subtopic_id, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        encode_uuid(q.question_id),
        encode_uuid(q.lesson_id),
        q.topic_id.map(encode_uuid),
        q.subtopic_id.map(encode_uuid),
        encode_dt(q.created_at),
      ],
    )?;
    Ok(())
  }

  fn insert_question_card(&self, c: &QuestionCard) -> CoreResult<()> {
    self.exec(
      "INSERT INTO question_cards (card_id, topic_id, prerequisite_id, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        encode_uuid(c.card_id),
        c.topic_id.map(encode_uuid),
        c.prerequisite_id.map(encode_uuid),
        encode_dt(c.created_at),
      ],
    )?;
    Ok(())
  }

  fn repoint_exam_questions_topic(&self, from: Uuid, to: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "UPDATE exam_questions SET topic_id = ?2 WHERE topic_id = ?1",
      params![encode_uuid(from), encode_uuid(to)],
    )?)
  }

  fn repoint_exam_questions_subtopic(&self, from: Uuid, to: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "UPDATE exam_questions SET subtopic_id = ?2 WHERE subtopic_id = ?1",
      params![encode_uuid(from), encode_uuid(to)],
    )?)
  }

  fn repoint_question_cards_topic(&self, from: Uuid, to: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "UPDATE question_cards SET topic_id = ?2 WHERE topic_id = ?1",
      params![encode_uuid(from), encode_uuid(to)],
    )?)
  }

  fn repoint_question_cards_prerequisite(&self, from: Uuid, to: Uuid) -> CoreResult<u64> {
    Ok(self.exec(
      "UPDATE question_cards SET prerequisite_id = ?2 WHERE prerequisite_id = ?1",
      params![encode_uuid(from), encode_uuid(to)],
    )?)
  }
}
