//! Conformance: agreement at the fixed length
//!
//! Invariants under test:
//! - Every supported language MUST succeed at length 16 on the canonical
//!   input
//! - All outputs MUST be byte-identical and exactly 16 bytes long

use prfset_core::cases::supported_cases;
use prfset_core::constants::{CANONICAL_INPUT, FIXED_OUTPUT_LENGTH};
use prfset_core::suite::CasePass;
use prfset_reference::compute_prf;

use crate::*;

#[test]
fn every_supported_template_agrees() {
    let oracle = oracle(honest_runtime());
    let builder = builder();
    for case in supported_cases(&registry(), FIXED_OUTPUT_LENGTH) {
        let built = builder.build(&case.template).unwrap();
        let output = oracle
            .check_agreement(
                &case.template,
                &built.serialized,
                &case.supported,
                CANONICAL_INPUT,
                case.output_length,
            )
            .unwrap_or_else(|failure| panic!("{failure}"));
        assert_eq!(output.len(), FIXED_OUTPUT_LENGTH, "{}", case.template);
    }
}

// ── HMAC-SHA256 at the fixed length ─────────────────────────────

#[test]
fn hmac_sha256_agrees_across_all_languages() {
    let suite = suite(honest_runtime(), Default::default());
    let case = supported_cases(&registry(), FIXED_OUTPUT_LENGTH)
        .find(|case| case.template == HMAC_SHA256)
        .unwrap();
    assert_eq!(case.supported, langs(&["cc", "go", "java", "python"]));

    let report = suite.run_agreement(&case);
    let output = match report.result {
        Ok(CasePass::Agreed(output)) => output,
        other => panic!("expected agreement, got {other:?}"),
    };
    assert_eq!(output.len(), 16);

    // Agreement is on the real PRF value of the shared key.
    let built = suite.builder().build(HMAC_SHA256).unwrap();
    let key = built.keyset.primary().unwrap();
    let expected = compute_prf(
        &key.template.construction,
        &key.key_value,
        b"This is some input data.",
        16,
    )
    .unwrap();
    assert_eq!(output, expected);
}

#[test]
fn agreement_uses_one_keyset_for_every_language() {
    let runtime = honest_runtime();
    let oracle = oracle(runtime.clone());
    let built = builder().build(HMAC_SHA512).unwrap();
    let collected = oracle
        .collect(
            &supported(HMAC_SHA512),
            &built.serialized,
            CANONICAL_INPUT,
            FIXED_OUTPUT_LENGTH,
        )
        .unwrap();
    assert_eq!(collected.outputs.len(), 4);
    assert!(collected.agreed_output().is_some());
    for language in runtime.languages() {
        assert_eq!(runtime.server(language).unwrap().calls(), 1);
    }
}
