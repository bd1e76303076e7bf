// Copyright (C) Microsoft Corporation. All rights reserved.

use std::env;

/// First OpenSSL release that manages its own locking.
const OPENSSL_THREAD_SAFE_VERSION: u64 = 0x1010_0000;

fn openssl_version_number() -> Option<u64> {
    // Exported by openssl-sys through its `links = "openssl"` metadata.
    let var = env::var("DEP_OPENSSL_VERSION_NUMBER").ok()?;
    match u64::from_str_radix(var.trim(), 16) {
        Ok(version) => Some(version),
        Err(_) => {
            println!("cargo:warning=unparsable OpenSSL version number {var}");
            None
        }
    }
}

fn main() {
    println!("cargo:rustc-check-cfg=cfg(ossl_legacy_locking)");
    println!("cargo:rerun-if-env-changed=DEP_OPENSSL_VERSION_NUMBER");

    match openssl_version_number() {
        Some(version) if version < OPENSSL_THREAD_SAFE_VERSION => {
            println!("openssl version {version:#x} requires locking callbacks");
            println!("cargo:rustc-cfg=ossl_legacy_locking");
        }
        Some(version) => {
            println!("openssl version {version:#x} is internally thread-safe");
        }
        None => {
            println!("openssl version unknown, assuming internally thread-safe");
        }
    }
}
