//! Reentrant per-circuit write locks.

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: u32,
    label: Option<String>,
}

/// A reentrant write lock guarding one circuit's structure.
///
/// The lock is reentrant within a thread so a wire-repair transaction
/// can nest inside the structural transaction that triggered it.
/// Deadlock freedom across circuits comes from acquisition order, not
/// from this type: transactions lock circuits in ascending creation
/// serial, so two transactions can never wait on each other in a cycle.
#[derive(Debug, Default)]
pub struct CircuitLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

/// RAII guard returned by [`CircuitLock::acquire`]. Releasing the
/// outermost guard wakes waiting transactions.
#[must_use = "the lock is released when the guard drops"]
pub struct LockGuard<'a> {
    lock: &'a CircuitLock,
}

impl CircuitLock {
    /// Creates an unheld lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the current thread holds the write lock. Reentrant:
    /// a thread that already holds the lock acquires it again without
    /// blocking, and the label of the outermost acquisition is kept.
    pub fn acquire(&self, label: &str) -> LockGuard<'_> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let me = thread::current().id();
        loop {
            match st.owner {
                None => {
                    st.owner = Some(me);
                    st.depth = 1;
                    st.label = Some(label.to_owned());
                    break;
                }
                Some(owner) if owner == me => {
                    st.depth += 1;
                    break;
                }
                Some(_) => {
                    st = self
                        .cond
                        .wait(st)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        LockGuard { lock: self }
    }

    /// `true` when the calling thread holds the lock.
    pub fn held_by_current_thread(&self) -> bool {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.owner == Some(thread::current().id())
    }

    /// The label of the transaction currently holding the lock.
    pub fn holder_label(&self) -> Option<String> {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.label.clone()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut st = self
            .lock
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        st.depth -= 1;
        if st.depth == 0 {
            st.owner = None;
            st.label = None;
            self.lock.cond.notify_all();
        }
    }
}
