// Copyright (C) Microsoft Corporation. All rights reserved.

//! Stable numeric identity of the calling thread.

use std::ffi::c_ulong;
use std::fmt;

/// Numeric identity of a thread, as reported to OpenSSL by the thread-id
/// callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadIdentity(u64);

impl ThreadIdentity {
    /// Returns the identity of the calling thread.
    ///
    /// The value is stable for the lifetime of the thread.
    pub fn current() -> Self {
        Self(current_raw())
    }

    /// Wraps a raw identity value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// The identity as the `unsigned long` OpenSSL stores, or `None` if it
    /// does not fit. Identities from [`current`](Self::current) always fit.
    pub fn as_ulong(self) -> Option<c_ulong> {
        c_ulong::try_from(self.0).ok()
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(unix)]
fn current_raw() -> u64 {
    use std::mem::size_of;

    use nix::sys::pthread::pthread_self;
    use nix::sys::pthread::Pthread;

    // `pthread_t` may be an integer, a pointer or a struct; copy its bytes
    // into the `unsigned long` OpenSSL uses rather than cast, then widen.
    const _: () = assert!(size_of::<Pthread>() <= size_of::<c_ulong>());

    let handle = pthread_self();
    let mut raw: c_ulong = 0;
    // SAFETY: both locations are valid, properly aligned and do not overlap,
    // and the compile-time check above guarantees the destination is large
    // enough for the copied bytes.
    unsafe {
        std::ptr::copy_nonoverlapping(
            &handle as *const Pthread as *const u8,
            &mut raw as *mut c_ulong as *mut u8,
            size_of::<Pthread>(),
        );
    }
    u64::from(raw)
}

#[cfg(not(unix))]
fn current_raw() -> u64 {
    use std::sync::atomic::AtomicU64;
    use std::sync::atomic::Ordering;

    static NEXT: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static ID: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }

    ID.with(|id| *id)
}
