// Copyright (C) Microsoft Corporation. All rights reserved.

//! Message digests.
//!
//! [`DigestContext`] is a reusable hash computation over one algorithm:
//!
//! 1. Construct it with [`DigestContext::new`], which also restarts it
//! 2. Feed data with [`update`](DigestContext::update), any number of times
//! 3. Write the digest with [`finish`](DigestContext::finish)
//! 4. Call [`restart`](DigestContext::restart) before computing another digest
//!
//! The context owns its backend handle and releases it on drop. It performs
//! no locking; concurrent use of one context must be serialized by the
//! caller. The process-wide library should be held (see
//! [`init`](crate::init)) while contexts are in use.
//!
//! # Supported Algorithms
//!
//! - **MD5**: 128-bit, for checksums only
//! - **SHA-1**: 160-bit, for compatibility only
//! - **SHA-256**, **SHA-384**, **SHA-512**: SHA-2 family

mod digest_ossl;

use std::fmt;
use std::io;

pub use digest_ossl::*;

use crate::CryptoError;

/// Digest algorithm selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DigestAlgo {
    /// MD5, 16-byte output.
    Md5,
    /// SHA-1, 20-byte output.
    Sha1,
    /// SHA-256, 32-byte output.
    Sha256,
    /// SHA-384, 48-byte output.
    Sha384,
    /// SHA-512, 64-byte output.
    Sha512,
}

impl DigestAlgo {
    /// Digest output length in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Conventional algorithm name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hash handle owned by a [`DigestContext`].
///
/// Dropping the handle destroys it.
pub trait DigestHandle: Sized {
    /// Allocates an uninitialized handle.
    fn create() -> Result<Self, CryptoError>;

    /// (Re)initializes the computation for `algo`, discarding any state.
    fn init(&mut self, algo: DigestAlgo) -> Result<(), CryptoError>;

    /// Feeds `data`. Never called with an empty slice.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Writes the digest to the start of `output` and returns the number of
    /// bytes written. `output` is at least the algorithm's digest size.
    fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CryptoError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DigestState {
    Ready,
    Finalized,
}

/// Stateful digest computation over a [`DigestHandle`].
pub struct DigestContext<H: DigestHandle = OsslDigestHandle> {
    handle: H,
    algo: DigestAlgo,
    state: DigestState,
}

impl DigestContext {
    /// MD5 context.
    pub fn md5() -> Result<Self, CryptoError> {
        Self::new(DigestAlgo::Md5)
    }

    /// SHA-1 context.
    pub fn sha1() -> Result<Self, CryptoError> {
        Self::new(DigestAlgo::Sha1)
    }

    /// SHA-256 context.
    pub fn sha256() -> Result<Self, CryptoError> {
        Self::new(DigestAlgo::Sha256)
    }

    /// SHA-384 context.
    pub fn sha384() -> Result<Self, CryptoError> {
        Self::new(DigestAlgo::Sha384)
    }

    /// SHA-512 context.
    pub fn sha512() -> Result<Self, CryptoError> {
        Self::new(DigestAlgo::Sha512)
    }
}

impl<H: DigestHandle> DigestContext<H> {
    /// Creates a context for `algo`, ready for updates.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::HashInitError` if the handle cannot be created
    /// or initialized. The handle is released in either case.
    pub fn new(algo: DigestAlgo) -> Result<Self, CryptoError> {
        let handle = H::create()?;
        let mut ctx = Self {
            handle,
            algo,
            state: DigestState::Finalized,
        };
        ctx.restart()?;
        Ok(ctx)
    }

    /// Discards any partial state and starts a new computation.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::HashInitError` if the handle cannot be
    /// reinitialized. The context is then left finalized: `update` and
    /// `finish` return `CryptoError::DigestFinalized` until a later
    /// `restart` succeeds.
    pub fn restart(&mut self) -> Result<(), CryptoError> {
        // Stays finalized if init fails, so the context cannot be fed.
        self.state = DigestState::Finalized;
        self.handle.init(self.algo)?;
        self.state = DigestState::Ready;
        Ok(())
    }

    /// Feeds `data` into the running computation.
    ///
    /// An empty slice is a no-op and never reaches the handle.
    ///
    /// # Errors
    ///
    /// - `CryptoError::DigestFinalized` if called after
    ///   [`finish`](Self::finish) without a [`restart`](Self::restart)
    /// - `CryptoError::HashUpdateError` if the backend rejects the data
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        if self.state == DigestState::Finalized {
            Err(CryptoError::DigestFinalized)?;
        }

        if data.is_empty() {
            return Ok(());
        }

        self.handle.update(data)
    }

    /// Writes the digest into the start of `output` and returns its length.
    ///
    /// The context must be [restarted](Self::restart) before it is used
    /// again.
    ///
    /// # Errors
    ///
    /// - `CryptoError::HashBufferTooSmall` if `output` is shorter than
    ///   [`size`](Self::size); the context is left untouched
    /// - `CryptoError::DigestFinalized` if already finalized
    /// - `CryptoError::HashFinishError` if the backend fails
    /// - `CryptoError::HashLengthMismatch` if the backend wrote an
    ///   unexpected number of bytes
    pub fn finish(&mut self, output: &mut [u8]) -> Result<usize, CryptoError> {
        let expected = self.algo.size();
        if output.len() < expected {
            Err(CryptoError::HashBufferTooSmall)?;
        }

        if self.state == DigestState::Finalized {
            Err(CryptoError::DigestFinalized)?;
        }

        self.state = DigestState::Finalized;
        let actual = self.handle.finalize(&mut output[..expected])?;
        if actual != expected {
            tracing::error!(algo = %self.algo, expected, actual, "digest length mismatch");
            Err(CryptoError::HashLengthMismatch { expected, actual })?;
        }

        Ok(actual)
    }

    /// Finalizes into a freshly allocated buffer.
    pub fn finish_vec(&mut self) -> Result<Vec<u8>, CryptoError> {
        let mut digest = vec![0u8; self.size()];
        self.finish(&mut digest)?;
        Ok(digest)
    }

    /// Configured algorithm.
    pub fn algo(&self) -> DigestAlgo {
        self.algo
    }

    /// Digest length of the configured algorithm.
    pub fn size(&self) -> usize {
        self.algo.size()
    }

    /// Returns true once [`finish`](Self::finish) has run and no restart
    /// followed.
    pub fn is_finalized(&self) -> bool {
        self.state == DigestState::Finalized
    }
}

impl<H: DigestHandle> fmt::Debug for DigestContext<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext")
            .field("algo", &self.algo)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<H: DigestHandle> io::Write for DigestContext<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Computes the digest of `data` in one call.
pub fn digest(algo: DigestAlgo, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut ctx = DigestContext::<OsslDigestHandle>::new(algo)?;
    ctx.update(data)?;
    ctx.finish_vec()
}

#[cfg(test)]
mod tests;
