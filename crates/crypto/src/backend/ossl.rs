// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL backend.
//!
//! OpenSSL 1.1.0 and later manage their own locking and free their global
//! state at exit, so on those versions only [`load_tables`] does any work.
//! Builds against older releases (detected by the build script) compile in
//! the legacy entry points from `ossl_legacy`.
//!
//! [`load_tables`]: CryptoBackend::load_tables

use std::sync::Arc;

#[cfg(ossl_legacy_locking)]
use super::ossl_legacy;
use super::*;

/// First OpenSSL release that is internally thread-safe.
const OPENSSL_THREAD_SAFE_VERSION: i64 = 0x1010_0000;

/// [`CryptoBackend`] for the linked OpenSSL library.
///
/// The locking callbacks and global tables it drives are process-wide, so
/// only the lifecycle behind [`global`](crate::global) may own one. It
/// cannot be constructed outside this crate:
///
/// ```compile_fail
/// let lifecycle = ossl_crypto::CryptoLifecycle::new(ossl_crypto::OsslBackend);
/// ```
///
/// ```compile_fail
/// let lifecycle = ossl_crypto::CryptoLifecycle::<ossl_crypto::OsslBackend>::default();
/// ```
#[derive(Debug)]
pub struct OsslBackend {
    _private: (),
}

impl OsslBackend {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Version number of the OpenSSL library loaded at runtime.
    pub fn version_number(&self) -> i64 {
        openssl::version::number()
    }

    /// Human-readable version string of the loaded OpenSSL library.
    pub fn version(&self) -> &'static str {
        openssl::version::version()
    }
}

#[cfg(not(ossl_legacy_locking))]
impl CryptoBackend for OsslBackend {
    fn is_thread_safe(&self) -> bool {
        // The legacy entry points are not compiled in, so the library must
        // manage its own locking.
        debug_assert!(self.version_number() >= OPENSSL_THREAD_SAFE_VERSION);
        true
    }

    fn load_tables(&self) {
        openssl::init();
    }

    fn num_locks(&self) -> usize {
        0
    }

    fn install_callbacks(&self, locks: Arc<LockTable>) {
        tracing::debug!(
            slots = locks.len(),
            "OpenSSL manages its own locking; callbacks not installed"
        );
    }

    fn load_config(&self) {}

    fn remove_callbacks(&self) {}

    fn remove_thread_state(&self, _tid: ThreadIdentity) {}

    fn cleanup(&self) {}
}

#[cfg(ossl_legacy_locking)]
impl CryptoBackend for OsslBackend {
    fn is_thread_safe(&self) -> bool {
        self.version_number() >= OPENSSL_THREAD_SAFE_VERSION
    }

    fn load_tables(&self) {
        ossl_legacy::load_tables();
    }

    fn num_locks(&self) -> usize {
        ossl_legacy::num_locks()
    }

    fn install_callbacks(&self, locks: Arc<LockTable>) {
        ossl_legacy::install_callbacks(locks);
    }

    fn load_config(&self) {
        ossl_legacy::load_config();
    }

    fn remove_callbacks(&self) {
        ossl_legacy::remove_callbacks();
    }

    fn remove_thread_state(&self, tid: ThreadIdentity) {
        ossl_legacy::remove_thread_state(tid);
    }

    fn cleanup(&self) {
        ossl_legacy::cleanup();
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_runtime_capability_matches_build() {
        let backend = OsslBackend::new();
        tracing::info!(version = backend.version(), "linked OpenSSL");
        if backend.version_number() >= OPENSSL_THREAD_SAFE_VERSION {
            assert!(backend.is_thread_safe());
        }
    }

    #[test]
    fn test_modern_backend_needs_no_locks() {
        let backend = OsslBackend::new();
        if backend.is_thread_safe() {
            assert_eq!(backend.num_locks(), 0);
        }
    }
}
