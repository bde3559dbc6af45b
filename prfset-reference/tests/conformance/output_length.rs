//! Conformance: output-length sweep
//!
//! Invariants under test:
//! - For every (template, length) either all supported languages succeed
//!   with identical output, or all fail
//! - Successful outputs have exactly the requested length
//! - Where the limit lies is a property of the construction, not of the
//!   harness

use prfset_core::cases::output_length_cases;
use prfset_core::constants::{CANONICAL_INPUT, OUTPUT_LENGTHS};
use prfset_core::oracle::SweepOutcome;
use prfset_core::suite::CasePass;
use prfset_reference::max_output_length;

use crate::*;

#[test]
fn sweep_covers_every_template_and_length() {
    let cases: Vec<_> = output_length_cases(&registry(), &OUTPUT_LENGTHS).collect();
    assert_eq!(cases.len(), 3 * OUTPUT_LENGTHS.len());
}

#[test]
fn honest_sweep_is_consistent_everywhere() {
    let oracle = oracle(honest_runtime());
    let builder = builder();
    let registry = registry();
    for case in output_length_cases(&registry, &OUTPUT_LENGTHS) {
        let built = builder.build(&case.template).unwrap();
        let outcome = oracle
            .check_output_length(
                &case.template,
                &built.serialized,
                &case.supported,
                CANONICAL_INPUT,
                case.output_length,
            )
            .unwrap_or_else(|failure| panic!("{failure}"));

        let construction = &registry.get(&case.template).unwrap().template.construction;
        let max = max_output_length(construction).unwrap();
        match outcome {
            SweepOutcome::Agreed(output) => {
                assert!(case.output_length <= max);
                assert_eq!(output.len(), case.output_length);
            }
            SweepOutcome::UniformlyRejected => assert!(case.output_length > max),
        }
    }
}

#[test]
fn agreed_outputs_are_prefix_consistent_for_hkdf() {
    let oracle = oracle(honest_runtime());
    let built = builder().build(HKDF_SHA256).unwrap();
    let languages = supported(HKDF_SHA256);
    let long = match oracle
        .check_output_length(HKDF_SHA256, &built.serialized, &languages, CANONICAL_INPUT, 100)
        .unwrap()
    {
        SweepOutcome::Agreed(output) => output,
        other => panic!("expected agreement, got {other:?}"),
    };
    let short = match oracle
        .check_output_length(HKDF_SHA256, &built.serialized, &languages, CANONICAL_INPUT, 17)
        .unwrap()
    {
        SweepOutcome::Agreed(output) => output,
        other => panic!("expected agreement, got {other:?}"),
    };
    assert_eq!(long[..17], short[..]);
}

// ── Length 1024 ─────────────────────────────────────────────────

#[test]
fn length_1024_depends_on_construction_maximum() {
    let suite = suite(honest_runtime(), Default::default());
    let registry = registry();
    let at_1024 = |template: &str| {
        let case = output_length_cases(&registry, &[1024])
            .find(|case| case.template == template)
            .unwrap();
        suite.run_output_length(&case).result
    };

    // HMAC-SHA256 caps at 32 bytes: every language rejects.
    assert_eq!(at_1024(HMAC_SHA256), Ok(CasePass::UniformFailure));

    // HKDF-SHA256 reaches 8160 bytes: every language agrees.
    match at_1024(HKDF_SHA256) {
        Ok(CasePass::Agreed(output)) => assert_eq!(output.len(), 1024),
        other => panic!("expected agreement, got {other:?}"),
    }
}

#[test]
fn uniform_rejection_is_primitive_everywhere() {
    let oracle = oracle(honest_runtime());
    let built = builder().build(HMAC_SHA256).unwrap();
    let collected = oracle
        .collect(&supported(HMAC_SHA256), &built.serialized, CANONICAL_INPUT, 33)
        .unwrap();
    assert!(collected.outputs.is_empty());
    assert_eq!(collected.errors.len(), 4);
    assert!(collected.errors.values().all(|err| err.is_primitive()));
    assert!(collected.is_consistent());
}
