//! Conformance: rejection by unsupported languages
//!
//! Invariants under test:
//! - A language outside a template's supported set MUST fail to compute it
//! - That failure MUST be a primitive error; success is a hard failure
//! - Rejection MUST hold at every probed output length, not only the fixed
//!   one
//! - Templates supported everywhere produce no rejection case

use prfset_core::cases::rejection_cases;
use prfset_core::config::HarnessConfig;
use prfset_core::constants::{FIXED_OUTPUT_LENGTH, OUTPUT_LENGTHS, REJECTION_PROBE_INPUT};
use prfset_core::oracle::CaseFailure;
use prfset_core::suite::CaseKind;
use prfset_reference::Fault;

use crate::*;

#[test]
fn only_partially_supported_templates_are_probed() {
    let registry = registry();
    let cases: Vec<_> = rejection_cases(&registry, &OUTPUT_LENGTHS).collect();
    assert_eq!(cases.len(), OUTPUT_LENGTHS.len());
    assert!(cases.iter().all(|case| case.template == HKDF_SHA256));
    assert!(cases.iter().all(|case| case.unsupported == langs(&["python"])));
}

#[test]
fn unsupported_language_rejects_with_primitive_error() {
    let built = builder().build(HKDF_SHA256).unwrap();
    let oracle = oracle(honest_runtime());
    let collected = oracle
        .collect(
            &langs(&["python"]),
            &built.serialized,
            REJECTION_PROBE_INPUT,
            FIXED_OUTPUT_LENGTH,
        )
        .unwrap();
    assert!(collected.outputs.is_empty());
    assert!(collected.errors[&Language::from("python")].is_primitive());
}

#[test]
fn rejection_rule_passes_for_honest_servers() {
    let built = builder().build(HKDF_SHA256).unwrap();
    oracle(honest_runtime())
        .check_rejection(
            HKDF_SHA256,
            &built.serialized,
            &langs(&["python"]),
            REJECTION_PROBE_INPUT,
            FIXED_OUTPUT_LENGTH,
        )
        .unwrap();
}

#[test]
fn suite_reports_rejection_case() {
    let suite = suite(honest_runtime(), Default::default());
    let case = rejection_cases(&registry(), &[FIXED_OUTPUT_LENGTH]).next().unwrap();
    let report = suite.run_rejection(&case);
    assert!(report.passed(), "{report}");
    assert_eq!(report.output_length, FIXED_OUTPUT_LENGTH);
    assert_eq!(report.languages, langs(&["python"]));
}

#[test]
fn unknown_template_is_configuration_failure() {
    let suite = suite(honest_runtime(), Default::default());
    let case = prfset_core::cases::RejectionCase {
        template: "AES_SIV".into(),
        output_length: FIXED_OUTPUT_LENGTH,
        unsupported: langs(&["python"]),
    };
    let report = suite.run_rejection(&case);
    match report.result {
        Err(CaseFailure::Configuration(err)) => {
            assert!(matches!(err, prfset_core::HarnessError::Configuration(_)))
        }
        other => panic!("expected configuration failure, got {other:?}"),
    }
}

// ── Every output length ─────────────────────────────────────────

#[test]
fn honest_rejection_passes_at_every_length() {
    let report = suite(honest_runtime(), HarnessConfig::default()).run().unwrap();
    let rejections: Vec<_> = report
        .cases
        .iter()
        .filter(|case| case.kind == CaseKind::Rejection)
        .collect();
    assert_eq!(rejections.len(), OUTPUT_LENGTHS.len());
    assert!(rejections.iter().all(|case| case.passed()));
}

#[test]
fn acceptance_away_from_fixed_length_is_caught() {
    let runtime = runtime_with(&[("python", Fault::AcceptUnsupportedExcept(FIXED_OUTPUT_LENGTH))]);
    let report = suite(runtime, HarnessConfig::default()).run().unwrap();
    assert!(!report.passed());

    let rejections: Vec<_> = report
        .cases
        .iter()
        .filter(|case| case.kind == CaseKind::Rejection)
        .collect();
    assert_eq!(rejections[0].output_length, FIXED_OUTPUT_LENGTH);
    assert!(rejections[0].passed(), "{}", rejections[0]);
    for case in &rejections[1..] {
        match &case.result {
            Err(CaseFailure::UnexpectedAcceptance {
                template,
                language,
                output,
            }) => {
                assert_eq!(template, HKDF_SHA256);
                assert_eq!(language.as_str(), "python");
                assert_eq!(output.len(), case.output_length);
            }
            other => panic!("expected unexpected acceptance, got {other:?}"),
        }
    }
    // Only the rejection cases see the fault.
    assert!(report
        .failures()
        .all(|case| case.kind == CaseKind::Rejection));
}
