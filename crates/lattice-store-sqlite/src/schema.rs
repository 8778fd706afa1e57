//! SQL schema for the Lattice SQLite store.
//!
//! Executed once at connection startup. The CHECK constraints mirror the
//! domain invariants, so a buggy write fails inside its transaction instead
//! of being committed.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS prerequisites (
    prerequisite_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    canonical_key   TEXT,
    status          TEXT NOT NULL DEFAULT 'active',
    review_reason   TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (status IN ('active', 'needs_review', 'deprecated')),
    CHECK ((status = 'needs_review') = (review_reason IS NOT NULL))
);

-- Topics are tombstoned, never deleted.
CREATE TABLE IF NOT EXISTS topics (
    topic_id     TEXT PRIMARY KEY,
    lesson_id    TEXT NOT NULL,
    name         TEXT NOT NULL,
    display_name TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'active',
    merged_into  TEXT REFERENCES topics(topic_id),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    CHECK (status IN ('active', 'merged')),
    CHECK ((status = 'merged') = (merged_into IS NOT NULL)),
    CHECK (merged_into IS NULL OR merged_into != topic_id)
);

CREATE TABLE IF NOT EXISTS subtopics (
    subtopic_id TEXT PRIMARY KEY,
    topic_id    TEXT NOT NULL REFERENCES topics(topic_id),
    name        TEXT NOT NULL,
    UNIQUE (topic_id, name)
);

-- At most one edge per (prerequisite, topic); strength is derived.
CREATE TABLE IF NOT EXISTS prerequisite_topic_edges (
    edge_id         TEXT PRIMARY KEY,
    prerequisite_id TEXT NOT NULL REFERENCES prerequisites(prerequisite_id),
    topic_id        TEXT NOT NULL REFERENCES topics(topic_id),
    subtopic_id     TEXT REFERENCES subtopics(subtopic_id),
    frequency       INTEGER NOT NULL,
    strength        TEXT NOT NULL,
    source          TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (prerequisite_id, topic_id),
    CHECK  (frequency >= 0),
    CHECK  (strength = CASE
              WHEN frequency >= 10 THEN 'strong'
              WHEN frequency >= 4  THEN 'medium'
              ELSE 'weak'
            END)
);

CREATE TABLE IF NOT EXISTS concepts (
    concept_id       TEXT PRIMARY KEY,
    preferred_label  TEXT NOT NULL,
    normalized_label TEXT NOT NULL,
    concept_type     TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'active',
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS concept_aliases (
    concept_id TEXT NOT NULL REFERENCES concepts(concept_id),
    alias      TEXT NOT NULL,
    normalized TEXT NOT NULL,
    PRIMARY KEY (concept_id, normalized)
);

CREATE TABLE IF NOT EXISTS prerequisite_concepts (
    prerequisite_id TEXT NOT NULL REFERENCES prerequisites(prerequisite_id),
    concept_id      TEXT NOT NULL REFERENCES concepts(concept_id),
    linked_at       TEXT NOT NULL,
    PRIMARY KEY (prerequisite_id, concept_id)
);

CREATE TABLE IF NOT EXISTS exam_questions (
    question_id TEXT PRIMARY KEY,
    lesson_id   TEXT NOT NULL,
    topic_id    TEXT REFERENCES topics(topic_id),
    subtopic_id TEXT REFERENCES subtopics(subtopic_id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS question_cards (
    card_id         TEXT PRIMARY KEY,
    topic_id        TEXT REFERENCES topics(topic_id),
    prerequisite_id TEXT REFERENCES prerequisites(prerequisite_id),
    created_at      TEXT NOT NULL
);

-- Append-only.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    action      TEXT NOT NULL,
    actor_id    TEXT,
    details     TEXT NOT NULL DEFAULT '{}',
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS topics_lesson_idx         ON topics(lesson_id);
CREATE INDEX IF NOT EXISTS edges_topic_idx           ON prerequisite_topic_edges(topic_id);
CREATE INDEX IF NOT EXISTS edges_subtopic_idx        ON prerequisite_topic_edges(subtopic_id);
CREATE INDEX IF NOT EXISTS prerequisite_concepts_idx ON prerequisite_concepts(concept_id);
CREATE INDEX IF NOT EXISTS questions_topic_idx       ON exam_questions(topic_id);
CREATE INDEX IF NOT EXISTS questions_subtopic_idx    ON exam_questions(subtopic_id);
CREATE INDEX IF NOT EXISTS cards_topic_idx           ON question_cards(topic_id);
CREATE INDEX IF NOT EXISTS cards_prerequisite_idx    ON question_cards(prerequisite_id);
CREATE INDEX IF NOT EXISTS audit_entity_idx          ON audit_log(entity_type, entity_id);

PRAGMA user_version = 1;
";
