// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL digest handle.
//!
//! Wraps an `EVP_MD_CTX` through `openssl::md_ctx::MdCtx`; the context is
//! freed when the handle is dropped.

use openssl::md::Md;
use openssl::md::MdRef;
use openssl::md_ctx::MdCtx;

use super::*;

impl DigestAlgo {
    /// OpenSSL message digest for this algorithm.
    pub(crate) fn md(self) -> &'static MdRef {
        match self {
            Self::Md5 => Md::md5(),
            Self::Sha1 => Md::sha1(),
            Self::Sha256 => Md::sha256(),
            Self::Sha384 => Md::sha384(),
            Self::Sha512 => Md::sha512(),
        }
    }
}

/// [`DigestHandle`] backed by an OpenSSL `EVP_MD_CTX`.
pub struct OsslDigestHandle {
    ctx: MdCtx,
}

impl DigestHandle for OsslDigestHandle {
    fn create() -> Result<Self, CryptoError> {
        let ctx = MdCtx::new().map_err(|e| {
            tracing::error!(?e, "could not allocate EVP_MD_CTX");
            CryptoError::HashInitError
        })?;
        Ok(Self { ctx })
    }

    fn init(&mut self, algo: DigestAlgo) -> Result<(), CryptoError> {
        let md = algo.md();
        debug_assert_eq!(md.size(), algo.size());
        self.ctx.digest_init(md).map_err(|e| {
            tracing::error!(?e, %algo, "failed to init digest");
            CryptoError::HashInitError
        })
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.ctx.digest_update(data).map_err(|e| {
            tracing::error!(?e, "failed to update digest");
            CryptoError::HashUpdateError
        })
    }

    fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CryptoError> {
        self.ctx.digest_final(output).map_err(|e| {
            tracing::error!(?e, "failed to finalize digest");
            CryptoError::HashFinishError
        })
    }
}
