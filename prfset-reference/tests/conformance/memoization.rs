//! Conformance: build-once keysets
//!
//! Invariants under test:
//! - Building the same template twice returns the same keyset bytes
//! - A full run builds each distinct template list exactly once

use std::sync::Arc;

use prfset_core::cases::supported_cases;
use prfset_core::constants::FIXED_OUTPUT_LENGTH;

use crate::*;

#[test]
fn repeated_builds_share_bytes() {
    let builder = builder();
    let first = builder.build(HMAC_SHA256).unwrap();
    let second = builder.build(HMAC_SHA256).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.serialized.ptr_eq(&second.serialized));
    assert_eq!(builder.cache().len(), 1);
}

#[test]
fn full_run_builds_each_keyset_once() {
    let suite = suite(honest_runtime(), Default::default());
    let report = suite.run().unwrap();
    assert!(report.passed(), "{report}");
    // Three single-template keysets plus the multi-key keyset.
    assert_eq!(suite.builder().cache().len(), 4);
}

#[test]
fn cases_of_one_template_see_identical_keysets() {
    let suite = suite(honest_runtime(), Default::default());
    let case = supported_cases(&registry(), FIXED_OUTPUT_LENGTH)
        .find(|case| case.template == HKDF_SHA256)
        .unwrap();
    let before = suite.builder().build(HKDF_SHA256).unwrap();
    assert!(suite.run_agreement(&case).passed());
    let after = suite.builder().build(HKDF_SHA256).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}
