// Copyright (C) Microsoft Corporation. All rights reserved.

//! Reference-counted init/shutdown of the underlying crypto library.
//!
//! Independent subsystems share one library instance: each calls
//! [`CryptoLifecycle::acquire`] at startup and [`CryptoLifecycle::release`]
//! at shutdown. The first acquire performs the global setup and the release
//! that drops the count back to zero tears it down, so the library is
//! initialized exactly once per cycle whatever the interleaving.
//!
//! # Strategies
//!
//! The strategy is chosen once, when the lifecycle is constructed:
//!
//! - [`LockingStrategy::Shim`]: the library is not internally thread-safe.
//!   Setup allocates a [`LockTable`] with one re-entrant mutex per slot the
//!   library asks for and installs the locking and thread-id callbacks. Every
//!   acquire records the calling thread in a [`ThreadRegistry`] so that the
//!   per-thread error state of those threads can be released at shutdown.
//! - [`LockingStrategy::Passthrough`]: the library manages itself; acquire
//!   and release do nothing.
//!
//! # Caller contract
//!
//! Acquire and release must be paired. A release without a matching acquire
//! is a caller bug: debug builds assert, release builds log and ignore it.
//!
//! Thread state is only recorded for threads that call acquire during the
//! current cycle. A thread that acquired during an earlier cycle and keeps
//! using the library without acquiring again is not cleaned up.

mod config;
mod lock_table;
mod registry;

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use config::*;
pub use lock_table::*;
use parking_lot::Mutex;
pub use registry::*;

use crate::CryptoBackend;
use crate::ThreadIdentity;

/// Global-state strategy selected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockingStrategy {
    /// Install lock table, callbacks and per-thread cleanup.
    Shim,
    /// Leave the library alone.
    Passthrough,
}

impl LockingStrategy {
    fn select(config: &LifecycleConfig, backend: &impl CryptoBackend) -> Self {
        match config.locking {
            LockingMode::Auto if backend.is_thread_safe() => Self::Passthrough,
            LockingMode::Auto | LockingMode::Shim => Self::Shim,
            LockingMode::Passthrough => Self::Passthrough,
        }
    }
}

/// Process-wide lifecycle of one crypto library.
///
/// Tests construct their own instances over a mock backend; production code
/// uses [`global`](crate::global).
pub struct CryptoLifecycle<B: CryptoBackend> {
    backend: B,
    strategy: LockingStrategy,
    refs: AtomicU32,
    /// Lock table of the live cycle. The mutex also serializes the 0->1 and
    /// 1->0 transitions against concurrent acquire/release calls.
    locks: Mutex<Option<Arc<LockTable>>>,
    threads: ThreadRegistry,
}

impl<B: CryptoBackend> CryptoLifecycle<B> {
    /// Creates a lifecycle with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, LifecycleConfig::default())
    }

    /// Creates a lifecycle with `config`.
    ///
    /// The strategy is selected here and never changes.
    pub fn with_config(backend: B, config: LifecycleConfig) -> Self {
        let strategy = LockingStrategy::select(&config, &backend);
        tracing::debug!(?strategy, mode = %config.locking, "selected locking strategy");

        Self {
            backend,
            strategy,
            refs: AtomicU32::new(0),
            locks: parking_lot::const_mutex(None),
            threads: ThreadRegistry::new(),
        }
    }

    /// Takes a reference on the library, initializing it if this is the
    /// first one.
    ///
    /// Returns once the library is fully initialized, even if another thread
    /// performed the initialization.
    pub fn acquire(&self) {
        if self.strategy == LockingStrategy::Passthrough {
            return;
        }

        {
            let mut locks = self.locks.lock();
            if self.refs.fetch_add(1, Ordering::AcqRel) == 0 {
                *locks = Some(self.init_library());
            }
        }

        let tid = ThreadIdentity::current();
        tracing::trace!(%tid, "recording thread");
        self.threads.record(tid);
    }

    /// Drops a reference on the library, shutting it down if this was the
    /// last one.
    pub fn release(&self) {
        if self.strategy == LockingStrategy::Passthrough {
            return;
        }

        let mut locks = self.locks.lock();
        if self.refs.load(Ordering::Acquire) == 0 {
            tracing::error!("release called without a matching acquire");
            debug_assert!(false, "release called without a matching acquire");
            return;
        }

        if self.refs.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        if let Some(table) = locks.take() {
            self.shutdown_library(table);
        }
    }

    /// Takes a reference that is dropped with the returned guard.
    pub fn acquire_guard(&self) -> LifecycleGuard<'_, B> {
        self.acquire();
        LifecycleGuard { lifecycle: self }
    }

    /// Strategy selected at construction.
    pub fn strategy(&self) -> LockingStrategy {
        self.strategy
    }

    /// Number of outstanding references.
    pub fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    /// Returns true while at least one reference is held.
    pub fn is_live(&self) -> bool {
        self.ref_count() > 0
    }

    /// Number of slots in the live lock table, or zero when not live.
    pub fn lock_count(&self) -> usize {
        self.locks.lock().as_ref().map_or(0, |table| table.len())
    }

    /// The live lock table, if any.
    pub fn lock_table(&self) -> Option<Arc<LockTable>> {
        self.locks.lock().clone()
    }

    /// Threads recorded during the current cycle, duplicates included.
    pub fn registered_threads(&self) -> Vec<ThreadIdentity> {
        self.threads.snapshot()
    }

    /// The backend this lifecycle drives.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[tracing::instrument(skip_all)]
    fn init_library(&self) -> Arc<LockTable> {
        self.backend.load_tables();

        let count = self.backend.num_locks();
        tracing::debug!(count, "allocating lock table");
        let table = Arc::new(LockTable::new(count));

        self.backend.install_callbacks(table.clone());
        self.backend.load_config();

        tracing::info!(locks = count, "crypto library initialized");
        table
    }

    #[tracing::instrument(skip_all)]
    fn shutdown_library(&self, table: Arc<LockTable>) {
        let mut drained = 0usize;
        self.threads.drain_with(|tid| {
            self.backend.remove_thread_state(tid);
            drained += 1;
        });
        tracing::debug!(drained, "released per-thread state");

        self.backend.remove_callbacks();
        self.backend.cleanup();

        if Arc::strong_count(&table) > 1 {
            tracing::warn!("lock table still referenced after callbacks were removed");
        }
        drop(table);

        tracing::info!("crypto library shut down");
    }
}

impl<B: CryptoBackend + Default> Default for CryptoLifecycle<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: CryptoBackend> std::fmt::Debug for CryptoLifecycle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoLifecycle")
            .field("strategy", &self.strategy)
            .field("refs", &self.ref_count())
            .finish_non_exhaustive()
    }
}

/// Reference on a [`CryptoLifecycle`], released on drop.
#[must_use = "the reference is released as soon as the guard is dropped"]
pub struct LifecycleGuard<'a, B: CryptoBackend> {
    lifecycle: &'a CryptoLifecycle<B>,
}

impl<B: CryptoBackend> Drop for LifecycleGuard<'_, B> {
    fn drop(&mut self) {
        self.lifecycle.release();
    }
}

#[cfg(test)]
mod tests;
