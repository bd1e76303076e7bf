// Copyright (C) Microsoft Corporation. All rights reserved.

//! Re-entrant lock slots handed to OpenSSL through the locking callback.

use std::ffi::c_int;
use std::fmt;

use parking_lot::lock_api::RawReentrantMutex;
use parking_lot::RawMutex;
use parking_lot::RawThreadId;

type SlotMutex = RawReentrantMutex<RawMutex, RawThreadId>;

/// Mode bit requesting the slot be locked (`CRYPTO_LOCK`). Any other mode
/// releases it.
pub const CRYPTO_LOCK: c_int = 1;
/// Mode bit requesting the slot be released (`CRYPTO_UNLOCK`).
pub const CRYPTO_UNLOCK: c_int = 2;

/// Fixed-size array of re-entrant mutexes, one per lock slot the library
/// asked for.
///
/// Locks are taken and released through separate calls without a guard, so
/// the table works with raw mutexes. A slot may be locked several times by
/// the same thread and must be released the same number of times.
pub struct LockTable {
    slots: Vec<SlotMutex>,
}

impl LockTable {
    /// Allocates `count` unlocked slots.
    ///
    /// Failing to allocate the table aborts the process: running the library
    /// without its locks would corrupt its internal state.
    pub fn new(count: usize) -> Self {
        let mut slots = Vec::new();
        if slots.try_reserve_exact(count).is_err() {
            tracing::error!(count, "can't allocate memory for OpenSSL lock table");
            std::process::abort();
        }
        slots.extend((0..count).map(|_| SlotMutex::INIT));

        Self { slots }
    }

    /// Number of lock slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Locks `slot`, blocking until it is available.
    ///
    /// Out-of-range slots are logged and ignored.
    pub fn lock(&self, slot: usize) {
        match self.slots.get(slot) {
            Some(mutex) => mutex.lock(),
            None => tracing::error!(slot, len = self.len(), "lock request for unknown slot"),
        }
    }

    /// Releases one level of `slot` held by the calling thread.
    ///
    /// Releasing a slot the calling thread does not hold is logged and
    /// ignored.
    pub fn unlock(&self, slot: usize) {
        let Some(mutex) = self.slots.get(slot) else {
            tracing::error!(slot, len = self.len(), "unlock request for unknown slot");
            return;
        };

        if !mutex.is_owned_by_current_thread() {
            tracing::error!(slot, "unlock request for slot not held by this thread");
            debug_assert!(false, "unlock of slot {slot} not held by this thread");
            return;
        }

        // SAFETY: the calling thread owns the mutex, checked above.
        unsafe { mutex.unlock() };
    }

    /// Returns true if `slot` is currently held by any thread.
    pub fn is_locked(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|mutex| mutex.is_locked())
    }

    /// Applies a locking-callback request: locks `slot` when `mode` carries
    /// [`CRYPTO_LOCK`], releases it otherwise.
    pub fn dispatch(&self, mode: c_int, slot: c_int) {
        let Ok(slot) = usize::try_from(slot) else {
            tracing::error!(slot, "negative lock slot");
            return;
        };

        if mode & CRYPTO_LOCK != 0 {
            self.lock(slot);
        } else {
            self.unlock(slot);
        }
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable")
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for LockTable {
    fn drop(&mut self) {
        let held = self.slots.iter().filter(|mutex| mutex.is_locked()).count();
        if held != 0 {
            tracing::warn!(held, "destroying lock table with slots still held");
        }
    }
}
