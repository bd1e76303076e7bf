// Copyright (C) Microsoft Corporation. All rights reserved.

//! Contract between the lifecycle and the underlying crypto library.
//!
//! The lifecycle never calls into the library directly: every global
//! initialization, callback registration and cleanup step goes through a
//! [`CryptoBackend`]. [`OsslBackend`] is the implementation for the linked
//! OpenSSL.
//!
//! # Call order
//!
//! On the first acquire the lifecycle calls, in order:
//! [`load_tables`](CryptoBackend::load_tables),
//! [`num_locks`](CryptoBackend::num_locks),
//! [`install_callbacks`](CryptoBackend::install_callbacks),
//! [`load_config`](CryptoBackend::load_config).
//!
//! On the last release:
//! [`remove_thread_state`](CryptoBackend::remove_thread_state) once per
//! recorded thread, [`remove_callbacks`](CryptoBackend::remove_callbacks),
//! [`cleanup`](CryptoBackend::cleanup).
//!
//! None of these steps report failure; a backend that cannot honour one must
//! abort.

mod ossl;
#[cfg(ossl_legacy_locking)]
mod ossl_legacy;

use std::sync::Arc;

pub use ossl::*;

use crate::LockTable;
use crate::ThreadIdentity;

/// Global entry points of an underlying crypto library.
pub trait CryptoBackend: Send + Sync + 'static {
    /// Returns true if the library manages its own locking, in which case the
    /// lifecycle performs no global setup at all.
    fn is_thread_safe(&self) -> bool;

    /// Loads algorithm and error-string tables.
    fn load_tables(&self);

    /// Number of lock slots the library needs.
    fn num_locks(&self) -> usize;

    /// Registers the locking callback, routed to `locks`, and the thread-id
    /// callback.
    fn install_callbacks(&self, locks: Arc<LockTable>);

    /// Loads the library configuration. Runs once the callbacks are in place.
    fn load_config(&self);

    /// Unregisters both callbacks and drops the backend's reference to the
    /// lock table.
    fn remove_callbacks(&self);

    /// Releases the per-thread error state the library allocated for `tid`.
    fn remove_thread_state(&self, tid: ThreadIdentity);

    /// Runs the library's full shutdown sequence.
    fn cleanup(&self);
}
