// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL lifecycle management and message digests.
//!
//! This crate owns the process-wide lifecycle of the linked OpenSSL library
//! and exposes a small message-digest context built on top of it:
//!
//! - **Lifecycle**: reference-counted [`acquire`](CryptoLifecycle::acquire) /
//!   [`release`](CryptoLifecycle::release) of the library. On OpenSSL builds
//!   that are not internally thread-safe, the first acquire installs a table of
//!   re-entrant locks and the locking/thread-id callbacks, and the last release
//!   tears everything down again.
//! - **Digest**: [`DigestContext`] with restart, incremental update and
//!   finalization into a caller-provided buffer (MD5, SHA-1, SHA-2).
//!
//! # Usage
//!
//! Subsystems that depend on OpenSSL call [`init`] at startup and [`shutdown`]
//! when they are done (or hold a [`LifecycleGuard`] from [`guard`]). Any number
//! of digest contexts may be used while at least one reference is held.

mod backend;
mod digest;
mod lifecycle;
mod thread_id;

use std::sync::OnceLock;

pub use backend::*;
pub use digest::*;
pub use lifecycle::*;
use thiserror::Error;
pub use thread_id::*;

/// Error type for digest operations.
///
/// Lifecycle operations do not return errors: they either succeed or abort
/// the process.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// Hash context creation or initialization failed.
    #[error("Hash initialization failed")]
    HashInitError,
    /// Hash update operation failed.
    #[error("Hash update failed")]
    HashUpdateError,
    /// Hash finalization failed.
    #[error("Hash finalization failed")]
    HashFinishError,
    /// Output buffer is too small to hold the hash result.
    #[error("Hash buffer too small")]
    HashBufferTooSmall,
    /// The backend wrote a digest of unexpected length.
    #[error("Hash length mismatch: expected {expected}, got {actual}")]
    HashLengthMismatch {
        /// Digest length of the configured algorithm.
        expected: usize,
        /// Length reported by the backend.
        actual: usize,
    },
    /// The context was finalized and has not been restarted.
    #[error("Digest context already finalized")]
    DigestFinalized,
}

static GLOBAL: OnceLock<CryptoLifecycle<OsslBackend>> = OnceLock::new();

/// Returns the process-wide OpenSSL lifecycle.
///
/// The instance is constructed on first use with
/// [`LifecycleConfig::from_env`].
pub fn global() -> &'static CryptoLifecycle<OsslBackend> {
    GLOBAL.get_or_init(|| {
        CryptoLifecycle::with_config(OsslBackend::new(), LifecycleConfig::from_env())
    })
}

/// Takes a reference on the process-wide OpenSSL lifecycle.
pub fn init() {
    global().acquire();
}

/// Drops a reference taken by [`init`].
pub fn shutdown() {
    global().release();
}

/// Takes a reference on the process-wide lifecycle that is dropped with the
/// returned guard.
pub fn guard() -> LifecycleGuard<'static, OsslBackend> {
    global().acquire_guard()
}
