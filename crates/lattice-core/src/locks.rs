//! Per-node advisory locks held for the duration of a mutating operation.
//!
//! Two operations that share a node never run at the same time: the second
//! one is rejected with [`Error::Locked`] rather than queued.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::{Error, Result};

/// Set of node ids currently claimed by an in-flight operation.
///
/// Cloning is cheap; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct MergeLocks {
  held: Arc<Mutex<HashSet<Uuid>>>,
}

impl MergeLocks {
  pub fn new() -> Self {
    Self::default()
  }

  fn held(&self) -> MutexGuard<'_, HashSet<Uuid>> {
    self.held.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Claim every id in `ids`, or none of them.
  pub fn acquire(&self, ids: &[Uuid]) -> Result<LockGuard> {
    let mut held = self.held();

    let mut busy: Vec<Uuid> = ids.iter().copied().filter(|id| held.contains(id)).collect();
    if !busy.is_empty() {
      busy.sort();
      busy.dedup();
      return Err(Error::Locked { ids: busy });
    }

    let ids: HashSet<Uuid> = ids.iter().copied().collect();
    held.extend(ids.iter().copied());
    Ok(LockGuard { locks: self.clone(), ids })
  }

  pub fn is_locked(&self, id: Uuid) -> bool {
    self.held().contains(&id)
  }
}

/// Releases its ids when dropped, whether the operation succeeded or not.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
  locks: MergeLocks,
  ids:   HashSet<Uuid>,
}

impl Drop for LockGuard {
  fn drop(&mut self) {
    let mut held = self.locks.held();
    for id in &self.ids {
      held.remove(id);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[test]
  fn overlapping_acquire_is_rejected_with_busy_ids() {
    let locks = MergeLocks::new();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let _first = locks.acquire(&[a, b]).unwrap();
    let err = locks.acquire(&[b, c]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(err, Error::Locked { ref ids } if ids == &vec![b]));
    // A rejected acquire claims nothing.
    assert!(!locks.is_locked(c));
  }

  #[test]
  fn disjoint_sets_do_not_contend() {
    let locks = MergeLocks::new();
    let _first = locks.acquire(&[Uuid::new_v4()]).unwrap();
    assert!(locks.acquire(&[Uuid::new_v4()]).is_ok());
  }

  #[test]
  fn dropping_the_guard_releases_every_id() {
    let locks = MergeLocks::new();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    {
      let _guard = locks.acquire(&[a, b, a]).unwrap();
      assert!(locks.is_locked(a) && locks.is_locked(b));
    }
    assert!(!locks.is_locked(a));
    assert!(!locks.is_locked(b));
    assert!(locks.acquire(&[a, b]).is_ok());
  }

  #[test]
  fn clones_share_one_lock_set() {
    let locks = MergeLocks::new();
    let other = locks.clone();
    let id = Uuid::new_v4();
    let _guard = locks.acquire(&[id]).unwrap();
    assert!(other.acquire(&[id]).is_err());
  }
}
