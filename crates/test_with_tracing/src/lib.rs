// Copyright (C) Microsoft Corporation. All rights reserved.

//! Test attribute with tracing output.
//!
//! `#[test_with_tracing::test]` behaves like `#[test]` but installs a
//! subscriber writing to the test harness (captured per test, shown on
//! failure) and runs the test body inside a span named after the test.
//!
//! `RUST_LOG` accepts a target filter such as `ossl_crypto=trace`. Without
//! it, crates in this workspace log at `DEBUG` and everything else at `WARN`.

// This is only used by test code; `expect` is allowed here (but not `unwrap`).
#![allow(clippy::expect_used)]

#[cfg(test)]
extern crate self as test_with_tracing;

pub use test_with_tracing_macro::test;
#[doc(hidden)]
pub use tracing;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Targets logged at `DEBUG` when `RUST_LOG` is not set.
const DEFAULT_DEBUG_TARGETS: &[&str] = &["ossl_crypto", "test_with_tracing"];

fn default_targets() -> Targets {
    DEFAULT_DEBUG_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::WARN), |targets, target| {
            targets.with_target(*target, LevelFilter::DEBUG)
        })
}

#[doc(hidden)]
/// Installs the test subscriber. Called by the generated test wrapper; safe
/// to call from every test.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = match std::env::var("RUST_LOG") {
            Ok(var) => var
                .parse()
                .expect("Failed to parse RUST_LOG environment variable"),
            Err(_) => default_targets(),
        };
        tracing_subscriber::fmt()
            .with_ansi(false)
            .log_internal_errors(true)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_thread_ids(true)
            .with_thread_names(true)
            .finish()
            .with(targets)
            .init();
    });
}
