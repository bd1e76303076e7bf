// Copyright (C) Microsoft Corporation. All rights reserved.

//! Global entry points of OpenSSL releases older than 1.1.0.
//!
//! These symbols were removed (or turned into macros) in 1.1.0, so they are
//! declared here rather than taken from `openssl-sys`, and this module is
//! only compiled when the build script detects a legacy library.

#![allow(non_camel_case_types)]

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_ulong;
use std::ffi::c_void;
use std::panic::catch_unwind;
use std::panic::UnwindSafe;
use std::process::abort;
use std::ptr::null;
use std::ptr::null_mut;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::LockTable;
use crate::ThreadIdentity;

// Only ever read by OpenSSL.
#[allow(dead_code)]
#[repr(C)]
struct CRYPTO_THREADID {
    ptr: *mut c_void,
    val: c_ulong,
}

type LockingCallback = unsafe extern "C" fn(c_int, c_int, *const c_char, c_int);
type ThreadIdCallback = unsafe extern "C" fn() -> c_ulong;

extern "C" {
    fn CRYPTO_num_locks() -> c_int;
    fn CRYPTO_set_locking_callback(func: Option<LockingCallback>);
    fn CRYPTO_set_id_callback(func: Option<ThreadIdCallback>);
    fn OPENSSL_add_all_algorithms_noconf();
    fn ERR_load_crypto_strings();
    fn OPENSSL_config(config_name: *const c_char);
    fn ERR_remove_thread_state(tid: *const CRYPTO_THREADID);
    fn ENGINE_cleanup();
    fn CONF_modules_free();
    fn CONF_modules_unload(all: c_int);
    fn ERR_free_strings();
    fn EVP_cleanup();
    fn CRYPTO_cleanup_all_ex_data();
}

/// Lock table the installed locking callback routes to.
static INSTALLED_LOCKS: RwLock<Option<Arc<LockTable>>> = parking_lot::const_rwlock(None);

/// Aborts instead of unwinding into C.
fn on_unwind_abort<F: FnOnce() -> R + UnwindSafe, R>(func: F) -> R {
    match catch_unwind(func) {
        Ok(v) => v,
        Err(_) => abort(),
    }
}

unsafe extern "C" fn ossl_locking_cb(mode: c_int, n: c_int, _file: *const c_char, _line: c_int) {
    on_unwind_abort(|| {
        // Clone out of the read guard so a thread blocked on a slot does not
        // hold the guard.
        let locks = INSTALLED_LOCKS.read().clone();
        match locks {
            Some(locks) => locks.dispatch(mode, n),
            None => tracing::error!(mode, n, "locking callback invoked without a lock table"),
        }
    })
}

unsafe extern "C" fn ossl_thread_id_cb() -> c_ulong {
    // The current identity is built from an `unsigned long` and always fits.
    ThreadIdentity::current().as_ulong().unwrap_or_default()
}

pub(super) fn load_tables() {
    // SAFETY: no arguments; safe to call repeatedly.
    unsafe {
        OPENSSL_add_all_algorithms_noconf();
        ERR_load_crypto_strings();
    }
}

pub(super) fn num_locks() -> usize {
    // SAFETY: no arguments.
    let count = unsafe { CRYPTO_num_locks() };
    usize::try_from(count).unwrap_or(0)
}

pub(super) fn install_callbacks(locks: Arc<LockTable>) {
    // Publish the table before the library can call back into it.
    *INSTALLED_LOCKS.write() = Some(locks);

    // SAFETY: both callbacks are `extern "C"`, never unwind and stay valid
    // for the lifetime of the program.
    unsafe {
        CRYPTO_set_locking_callback(Some(ossl_locking_cb));
        CRYPTO_set_id_callback(Some(ossl_thread_id_cb));
    }
}

pub(super) fn load_config() {
    // SAFETY: a null name selects the default configuration section.
    unsafe { OPENSSL_config(null()) };
}

pub(super) fn remove_callbacks() {
    // SAFETY: passing `None` unregisters the callbacks.
    unsafe {
        CRYPTO_set_locking_callback(None);
        CRYPTO_set_id_callback(None);
    }

    INSTALLED_LOCKS.write().take();
}

pub(super) fn remove_thread_state(tid: ThreadIdentity) {
    let Some(val) = tid.as_ulong() else {
        tracing::error!(%tid, "thread identity does not fit an OpenSSL thread id");
        return;
    };

    // Numeric thread ids are stored with a null pointer part, matching what
    // `CRYPTO_THREADID_current` records while the id callback is installed.
    let tid = CRYPTO_THREADID {
        ptr: null_mut(),
        val,
    };

    // SAFETY: `tid` is a valid, initialized CRYPTO_THREADID for the call.
    unsafe { ERR_remove_thread_state(&tid) };
}

pub(super) fn cleanup() {
    // SAFETY: no arguments; the callbacks have already been removed.
    unsafe {
        ENGINE_cleanup();
        CONF_modules_free();
        CONF_modules_unload(1);
        ERR_free_strings();
        EVP_cleanup();
        CRYPTO_cleanup_all_ex_data();
    }
}
