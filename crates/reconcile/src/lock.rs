//! Per-identity run locks

use crate::types::ResourceIdentity;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Keyed mutual exclusion: at most one holder per identity.
#[derive(Debug, Default)]
pub struct RunLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl RunLocks {
    /// No locks held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `identity` is free, then hold it until the guard drops.
    pub fn acquire(&self, identity: &ResourceIdentity) -> RunGuard<'_> {
        let key = identity.key();
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&key) {
            log::debug!("Waiting for running pass of {}", key);
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.clone());
        RunGuard { locks: self, key }
    }

    /// Hold `identity` if it is free.
    pub fn try_acquire(&self, identity: &ResourceIdentity) -> Option<RunGuard<'_>> {
        let key = identity.key();
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key.clone()) {
            return None;
        }
        Some(RunGuard { locks: self, key })
    }

    /// Whether `identity` is currently held.
    pub fn is_held(&self, identity: &ResourceIdentity) -> bool {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.contains(&identity.key())
    }
}

/// Releases its identity on drop, including during unwinding.
#[derive(Debug)]
pub struct RunGuard<'a> {
    locks: &'a RunLocks,
    key: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.key);
        drop(held);
        self.locks.released.notify_all();
    }
}
