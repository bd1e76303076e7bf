// Copyright (C) Microsoft Corporation. All rights reserved.

use parking_lot::Mutex;

use crate::ThreadIdentity;

/// Identities of the threads that acquired the library during the current
/// init cycle.
///
/// OpenSSL implicitly allocates per-thread error state; the recorded
/// identities are used to release it at shutdown. Duplicates are kept: a
/// thread that acquires twice is recorded twice.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    tids: Mutex<Vec<ThreadIdentity>>,
}

impl ThreadRegistry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            tids: parking_lot::const_mutex(Vec::new()),
        }
    }

    /// Records `tid`.
    pub fn record(&self, tid: ThreadIdentity) {
        self.tids.lock().push(tid);
    }

    /// Number of recorded entries, duplicates included.
    pub fn len(&self) -> usize {
        self.tids.lock().len()
    }

    /// Returns true if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.tids.lock().is_empty()
    }

    /// Returns true if `tid` has been recorded.
    pub fn contains(&self, tid: ThreadIdentity) -> bool {
        self.tids.lock().contains(&tid)
    }

    /// Copy of the recorded entries.
    pub fn snapshot(&self) -> Vec<ThreadIdentity> {
        self.tids.lock().clone()
    }

    /// Calls `f` for every recorded entry while holding the registry lock,
    /// then clears the registry.
    pub fn drain_with(&self, mut f: impl FnMut(ThreadIdentity)) {
        let mut tids = self.tids.lock();
        for tid in tids.drain(..) {
            f(tid);
        }
    }
}
