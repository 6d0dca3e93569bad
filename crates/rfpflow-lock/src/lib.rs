//! In-process stage locking for rfpflow
//!
//! At most one run of a given stage may be in flight per RFP. Triggers for a
//! `(RfpId, StageId)` pair that is already running are rejected, not queued.
//! Different stages of the same RFP, and the same stage on different RFPs,
//! proceed independently.
//!
//! The lock is an RAII guard: dropping a [`StageGuard`] releases the slot, so
//! a run that errors, times out or panics never leaves the pair stuck.

use rfpflow_utils::types::{RfpId, StageId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Lock errors for stage execution
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Stage '{stage}' is already running for RFP {rfp_id} (started {started_ago} ago)")]
    StageConflict {
        rfp_id: RfpId,
        stage: StageId,
        started_ago: String,
    },
}

type Key = (RfpId, StageId);

/// Information about one in-flight stage run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInfo {
    pub rfp_id: RfpId,
    pub stage: StageId,
    /// Monotonic token distinguishing successive runs of the same pair
    pub token: u64,
    pub acquired_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    held: HashMap<Key, LockInfo>,
    next_token: u64,
}

/// Registry of in-flight stage runs, shared by every request handler.
#[derive(Debug, Clone, Default)]
pub struct StageLocks {
    inner: Arc<Mutex<Inner>>,
}

impl StageLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        // The map is only mutated under the mutex with no user code running,
        // so a poisoned lock still holds a consistent map.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Try to claim the `(rfp_id, stage)` slot.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::StageConflict`] when the pair is already running.
    pub fn try_acquire(&self, rfp_id: RfpId, stage: StageId) -> Result<StageGuard, LockError> {
        let mut inner = self.lock_inner();
        if let Some(existing) = inner.held.get(&(rfp_id, stage)) {
            return Err(LockError::StageConflict {
                rfp_id,
                stage,
                started_ago: format_elapsed(existing.acquired_at.elapsed()),
            });
        }

        inner.next_token += 1;
        let info = LockInfo {
            rfp_id,
            stage,
            token: inner.next_token,
            acquired_at: Instant::now(),
        };
        inner.held.insert((rfp_id, stage), info);

        Ok(StageGuard {
            locks: self.clone(),
            info,
        })
    }

    /// Whether a run of `stage` is currently in flight for `rfp_id`.
    #[must_use]
    pub fn is_held(&self, rfp_id: RfpId, stage: StageId) -> bool {
        self.lock_inner().held.contains_key(&(rfp_id, stage))
    }

    /// Snapshot of all in-flight runs, ordered by RFP then stage.
    #[must_use]
    pub fn held(&self) -> Vec<LockInfo> {
        let mut out: Vec<LockInfo> = self.lock_inner().held.values().copied().collect();
        out.sort_by_key(|info| (info.rfp_id, info.stage));
        out
    }

    fn release(&self, info: &LockInfo) {
        let mut inner = self.lock_inner();
        // Only remove our own entry
        if inner
            .held
            .get(&(info.rfp_id, info.stage))
            .is_some_and(|current| current.token == info.token)
        {
            inner.held.remove(&(info.rfp_id, info.stage));
        }
    }
}

/// Claim on one `(RfpId, StageId)` slot; released on drop.
#[derive(Debug)]
pub struct StageGuard {
    locks: StageLocks,
    info: LockInfo,
}

impl StageGuard {
    #[must_use]
    pub fn info(&self) -> &LockInfo {
        &self.info
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        self.locks.release(&self.info);
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_acquisition_and_release() {
        let locks = StageLocks::new();
        let guard = locks.try_acquire(RfpId(1), StageId::Analysis).unwrap();
        assert!(locks.is_held(RfpId(1), StageId::Analysis));
        assert_eq!(guard.info().stage, StageId::Analysis);

        drop(guard);
        assert!(!locks.is_held(RfpId(1), StageId::Analysis));
    }

    #[test]
    fn test_concurrent_trigger_is_rejected() {
        let locks = StageLocks::new();
        let _guard = locks.try_acquire(RfpId(1), StageId::Bom).unwrap();

        let err = locks.try_acquire(RfpId(1), StageId::Bom).unwrap_err();
        assert!(matches!(
            err,
            LockError::StageConflict {
                rfp_id: RfpId(1),
                stage: StageId::Bom,
                ..
            }
        ));
    }

    #[test]
    fn test_independent_pairs_do_not_conflict() {
        let locks = StageLocks::new();
        let _a = locks.try_acquire(RfpId(1), StageId::Bom).unwrap();
        let _b = locks.try_acquire(RfpId(1), StageId::Proposal).unwrap();
        let _c = locks.try_acquire(RfpId(2), StageId::Bom).unwrap();
        assert_eq!(locks.held().len(), 3);
    }

    #[test]
    fn test_guard_released_on_panic() {
        let locks = StageLocks::new();
        let cloned = locks.clone();
        let result = std::thread::spawn(move || {
            let _guard = cloned.try_acquire(RfpId(9), StageId::Scope).unwrap();
            panic!("stage blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!locks.is_held(RfpId(9), StageId::Scope));
        assert!(locks.try_acquire(RfpId(9), StageId::Scope).is_ok());
    }

    #[test]
    fn test_reacquire_after_release_gets_new_token() {
        let locks = StageLocks::new();
        let first = locks.try_acquire(RfpId(3), StageId::Analysis).unwrap();
        let first_token = first.info().token;
        drop(first);
        let second = locks.try_acquire(RfpId(3), StageId::Analysis).unwrap();
        assert!(second.info().token > first_token);
    }

    #[test]
    fn test_elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(30)), "30s");
        assert_eq!(format_elapsed(Duration::from_secs(120)), "2m");
        assert_eq!(format_elapsed(Duration::from_secs(7200)), "2h");
    }
}
