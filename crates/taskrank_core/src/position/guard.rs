//! Per-project mutual exclusion for position-mutating operations.
//!
//! # Responsibility
//! - Give each project scope its own lock so mutations on one scope run
//!   strictly one at a time while other scopes proceed in parallel.
//! - Bound how long a caller waits for a busy scope.
//!
//! # Invariants
//! - A scope lock is held only for the duration of one closure call.
//! - A timed-out caller has executed nothing.
//! - The lock table holds entries only for scopes in use or contended.
//!
//! Cross-process writers are serialized by SQLite `BEGIN IMMEDIATE`
//! transactions; this guard covers threads inside one process.

use crate::model::project::ProjectId;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lock wait used when no explicit timeout is configured.
pub const DEFAULT_SCOPE_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Scope-keyed lock table shared by every service in the process.
#[derive(Debug)]
pub struct ScopeGuard {
    locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
    timeout: Duration,
}

/// Returned when a scope stayed locked for longer than the guard timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeLockTimeout {
    pub project_id: ProjectId,
    pub waited: Duration,
}

impl Display for ScopeLockTimeout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "timed out after {}ms waiting for project scope {}",
            self.waited.as_millis(),
            self.project_id
        )
    }
}

impl Error for ScopeLockTimeout {}

impl Default for ScopeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SCOPE_LOCK_TIMEOUT)
    }
}

impl ScopeGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `op` while holding the lock for `project_id`.
    ///
    /// # Errors
    /// Returns `ScopeLockTimeout` without calling `op` when the scope could
    /// not be acquired within the configured timeout.
    pub fn with_scope<T>(
        &self,
        project_id: ProjectId,
        op: impl FnOnce() -> T,
    ) -> Result<T, ScopeLockTimeout> {
        let lock = self.scope_lock(project_id);
        let started_at = Instant::now();
        let Some(held) = lock.try_lock_for(self.timeout) else {
            let waited = started_at.elapsed();
            warn!(
                "event=scope_lock module=position status=timeout project_id={} waited_ms={}",
                project_id,
                waited.as_millis()
            );
            self.release(project_id, lock);
            return Err(ScopeLockTimeout { project_id, waited });
        };
        debug!(
            "event=scope_lock module=position status=acquired project_id={} waited_ms={}",
            project_id,
            started_at.elapsed().as_millis()
        );
        let output = op();
        drop(held);
        self.release(project_id, lock);
        Ok(output)
    }

    /// Number of scopes with a lock entry.
    pub fn tracked_scopes(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drops the table entry once no other caller holds or waits on it.
    fn release(&self, project_id: ProjectId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Table copy plus `lock`; any waiter holds a third handle.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&project_id);
        }
    }

    fn scope_lock(&self, project_id: ProjectId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(project_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
