// Copyright (C) Microsoft Corporation. All rights reserved.

use std::cell::Cell;
use std::cell::RefCell;
use std::io::Write;
use std::ptr::NonNull;

use test_with_tracing::test;

use super::*;

thread_local! {
    static CREATED: Cell<usize> = const { Cell::new(0) };
    static DROPPED: Cell<usize> = const { Cell::new(0) };
    static FAIL_INIT: Cell<bool> = const { Cell::new(false) };
    static SHORT_FINAL: Cell<bool> = const { Cell::new(false) };
    static UPDATES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Handle that records calls on the current thread and writes a
/// recognizable pattern instead of a digest.
struct RecordingHandle {
    fed: usize,
}

impl DigestHandle for RecordingHandle {
    fn create() -> Result<Self, CryptoError> {
        CREATED.with(|c| c.set(c.get() + 1));
        Ok(Self { fed: 0 })
    }

    fn init(&mut self, _algo: DigestAlgo) -> Result<(), CryptoError> {
        if FAIL_INIT.with(Cell::get) {
            return Err(CryptoError::HashInitError);
        }
        self.fed = 0;
        Ok(())
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        assert!(!data.is_empty(), "empty update reached the handle");
        UPDATES.with(|u| u.borrow_mut().push(data.len()));
        self.fed += data.len();
        Ok(())
    }

    fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CryptoError> {
        output.fill(self.fed as u8);
        if SHORT_FINAL.with(Cell::get) {
            return Ok(output.len() - 1);
        }
        Ok(output.len())
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        DROPPED.with(|c| c.set(c.get() + 1));
    }
}

fn reset_recording() {
    CREATED.with(|c| c.set(0));
    DROPPED.with(|c| c.set(0));
    FAIL_INIT.with(|c| c.set(false));
    SHORT_FINAL.with(|c| c.set(false));
    UPDATES.with(|u| u.borrow_mut().clear());
}

#[test]
fn test_empty_update_skips_handle() {
    reset_recording();
    let mut ctx = DigestContext::<RecordingHandle>::new(DigestAlgo::Sha256).expect("new");

    ctx.update(&[]).expect("empty update");
    // A zero-length slice over a dangling pointer must never be read.
    // SAFETY: a dangling, well-aligned pointer is valid for a zero-length slice.
    let dangling = unsafe { std::slice::from_raw_parts(NonNull::<u8>::dangling().as_ptr(), 0) };
    ctx.update(dangling).expect("dangling empty update");
    ctx.update(b"xy").expect("update");

    assert_eq!(UPDATES.with(|u| u.borrow().clone()), [2]);
}

#[test]
fn test_dangling_empty_update_with_openssl() {
    let mut ctx = DigestContext::md5().expect("md5");
    // SAFETY: a dangling, well-aligned pointer is valid for a zero-length slice.
    let dangling = unsafe { std::slice::from_raw_parts(NonNull::<u8>::dangling().as_ptr(), 0) };
    ctx.update(dangling).expect("empty update");
    assert_eq!(ctx.finish_vec(), Ok(hex("d41d8cd98f00b204e9800998ecf8427e")));
}

#[test]
fn test_handle_released_once() {
    reset_recording();
    {
        let mut ctx = DigestContext::<RecordingHandle>::new(DigestAlgo::Md5).expect("new");
        ctx.update(b"abc").expect("update");
        ctx.finish_vec().expect("finish");
        ctx.restart().expect("restart");
    }
    assert_eq!(CREATED.with(Cell::get), 1);
    assert_eq!(DROPPED.with(Cell::get), 1);
}

#[test]
fn test_handle_released_on_construction_failure() {
    reset_recording();
    FAIL_INIT.with(|c| c.set(true));

    let result = DigestContext::<RecordingHandle>::new(DigestAlgo::Sha1);
    assert_eq!(result.err(), Some(CryptoError::HashInitError));
    assert_eq!(CREATED.with(Cell::get), 1);
    assert_eq!(DROPPED.with(Cell::get), 1);
}

#[test]
fn test_failed_restart_leaves_context_finalized() {
    reset_recording();
    let mut ctx = DigestContext::<RecordingHandle>::new(DigestAlgo::Sha256).expect("new");
    ctx.update(b"abc").expect("update");

    FAIL_INIT.with(|c| c.set(true));
    assert_eq!(ctx.restart(), Err(CryptoError::HashInitError));
    assert!(ctx.is_finalized());
    assert_eq!(ctx.update(b"more"), Err(CryptoError::DigestFinalized));
    assert_eq!(ctx.finish_vec(), Err(CryptoError::DigestFinalized));

    FAIL_INIT.with(|c| c.set(false));
    ctx.restart().expect("restart");
    assert!(!ctx.is_finalized());
    ctx.update(b"xy").expect("update");
    assert_eq!(ctx.finish_vec(), Ok(vec![2u8; 32]));
}

#[test]
fn test_update_after_finish_is_rejected() {
    let mut ctx = DigestContext::sha1().expect("sha1");
    ctx.update(b"abc").expect("update");
    ctx.finish_vec().expect("finish");

    assert!(ctx.is_finalized());
    assert_eq!(ctx.update(b"more"), Err(CryptoError::DigestFinalized));
    assert_eq!(ctx.update(&[]), Err(CryptoError::DigestFinalized));
    assert_eq!(ctx.finish_vec(), Err(CryptoError::DigestFinalized));
}

#[test]
fn test_restart_after_finish_reproduces_digest() {
    let mut ctx = DigestContext::sha512().expect("sha512");

    ctx.update(b"hello ").expect("update");
    ctx.update(b"world").expect("update");
    let first = ctx.finish_vec().expect("finish");

    ctx.restart().expect("restart");
    assert!(!ctx.is_finalized());
    ctx.update(b"hello ").expect("update");
    ctx.update(b"world").expect("update");
    let second = ctx.finish_vec().expect("finish");

    assert_eq!(first, second);
}

#[test]
fn test_restart_discards_partial_state() {
    let mut ctx = DigestContext::sha256().expect("sha256");
    ctx.update(b"garbage").expect("update");
    ctx.restart().expect("restart");
    ctx.update(b"abc").expect("update");

    assert_eq!(
        ctx.finish_vec(),
        Ok(hex(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        ))
    );
}

#[test]
fn test_incremental_update_equivalence() {
    let data: Vec<u8> = (0..4099u32).map(|i| (i * 31 % 251) as u8).collect();

    for algo in [
        DigestAlgo::Md5,
        DigestAlgo::Sha1,
        DigestAlgo::Sha256,
        DigestAlgo::Sha384,
        DigestAlgo::Sha512,
    ] {
        let whole = digest(algo, &data).expect("one shot");

        for chunk_size in [1, 7, 64, 127, 1000] {
            let mut ctx = DigestContext::<OsslDigestHandle>::new(algo).expect("new");
            for chunk in data.chunks(chunk_size) {
                ctx.update(chunk).expect("update");
            }
            assert_eq!(ctx.finish_vec().expect("finish"), whole, "{algo} / {chunk_size}");
        }
    }
}

#[test]
fn test_finish_buffer_too_small() {
    let mut ctx = DigestContext::sha256().expect("sha256");
    ctx.update(b"abc").expect("update");

    let mut short = [0u8; 31];
    assert_eq!(ctx.finish(&mut short), Err(CryptoError::HashBufferTooSmall));

    // The context is untouched and can still be finalized.
    assert!(!ctx.is_finalized());
    let mut out = [0u8; 40];
    assert_eq!(ctx.finish(&mut out), Ok(32));
    assert_eq!(
        out[..32].to_vec(),
        hex("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
    assert_eq!(out[32..], [0u8; 8]);
}

#[test]
fn test_finish_length_mismatch_detected() {
    reset_recording();
    SHORT_FINAL.with(|c| c.set(true));

    let mut ctx = DigestContext::<RecordingHandle>::new(DigestAlgo::Sha384).expect("new");
    ctx.update(b"abc").expect("update");

    let mut out = [0u8; 48];
    assert_eq!(
        ctx.finish(&mut out),
        Err(CryptoError::HashLengthMismatch {
            expected: 48,
            actual: 47,
        })
    );
    assert!(ctx.is_finalized());
}

#[test]
fn test_io_write() {
    let mut ctx = DigestContext::md5().expect("md5");
    write!(ctx, "message {}", "digest").expect("write");
    ctx.flush().expect("flush");

    assert_eq!(ctx.finish_vec(), Ok(hex("f96b697d7cb7938d525a2f31aaf161d0")));

    let err = ctx.write(b"x").expect_err("write after finish");
    assert_eq!(err.kind(), std::io::ErrorKind::Other);
}

#[test]
fn test_algo_properties() {
    let ctx = DigestContext::sha384().expect("sha384");
    assert_eq!(ctx.algo(), DigestAlgo::Sha384);
    assert_eq!(ctx.size(), 48);
    assert_eq!(DigestAlgo::Md5.to_string(), "MD5");
    assert_eq!(DigestAlgo::Sha512.name(), "SHA512");
}
