//! [`SqliteStore`]: the SQLite implementation of [`GraphStore`] and
//! [`AuditSink`].

use std::path::Path;

use lattice_core::{
  audit::{AuditRecord, AuditSink},
  store::{GraphRead, GraphStore, GraphTx},
};
use rusqlite::{TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawAuditRecord, encode_dt, encode_uuid},
  graph::SqliteGraph,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lattice graph store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection; tests use it to install triggers.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Audit records, oldest first, optionally for one entity only.
  pub async fn list_audit(&self, entity_id: Option<Uuid>) -> Result<Vec<AuditRecord>> {
    let entity = entity_id.map(encode_uuid);

    let raws: Vec<RawAuditRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT audit_id, entity_type, entity_id, action, actor_id, details, recorded_at
           FROM audit_log
           WHERE ?1 IS NULL OR entity_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(params![entity], RawAuditRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditRecord::into_record).collect()
  }
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  async fn read<T, F>(&self, f: F) -> lattice_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphRead) -> lattice_core::Result<T> + Send + 'static,
  {
    let result = self
      .conn
      .call(move |conn| {
        // Deferred, and never committed: dropping it rolls back.
        let tx = conn.transaction()?;
        Ok(f(&SqliteGraph::new(&tx)))
      })
      .await
      .map_err(Error::from)?;
    result
  }

  async fn with_transaction<T, F>(&self, f: F) -> lattice_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn GraphTx) -> lattice_core::Result<T> + Send + 'static,
  {
    let result = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so two writers never
        // interleave between their reads and their writes.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&SqliteGraph::new(&tx));
        if result.is_ok() {
          tx.commit()?;
        }
        Ok(result)
      })
      .await
      .map_err(Error::from)?;
    result
  }
}

// ─── AuditSink impl ──────────────────────────────────────────────────────────

impl AuditSink for SqliteStore {
  type Error = Error;

  async fn append(&self, record: AuditRecord) -> Result<()> {
    let audit_id    = encode_uuid(record.audit_id);
    let entity_id   = encode_uuid(record.entity_id);
    let action      = record.action.to_string();
    let details     = serde_json::to_string(&record.details)?;
    let recorded_at = encode_dt(record.recorded_at);
    let entity_type = record.entity_type;
    let actor_id    = record.actor_id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log
             (audit_id, entity_type, entity_id, action, actor_id, details, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![audit_id, entity_type, entity_id, action, actor_id, details, recorded_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
