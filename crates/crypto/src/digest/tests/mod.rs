// Copyright (C) Microsoft Corporation. All rights reserved.

mod context_tests;

use super::*;

/// Known-answer vector.
pub struct DigestTestVector {
    pub algo: DigestAlgo,
    pub msg: &'static [u8],
    pub md: &'static str,
}

pub(crate) fn hex(s: &str) -> Vec<u8> {
    assert_eq!(s.len() % 2, 0, "odd-length hex string");
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("invalid hex"))
        .collect()
}

pub(crate) fn check_one_shot(vector: &DigestTestVector) {
    let actual = digest(vector.algo, vector.msg).expect("digest");
    assert_eq!(actual, hex(vector.md), "{} of {:?}", vector.algo, vector.msg);
}

pub(crate) fn check_streaming(vector: &DigestTestVector) {
    let mut ctx = DigestContext::<OsslDigestHandle>::new(vector.algo).expect("new");
    for chunk in vector.msg.chunks(3) {
        ctx.update(chunk).expect("update");
    }
    let mut out = vec![0u8; vector.algo.size()];
    let len = ctx.finish(&mut out).expect("finish");
    assert_eq!(len, vector.algo.size());
    assert_eq!(out, hex(vector.md), "{} of {:?}", vector.algo, vector.msg);
}
