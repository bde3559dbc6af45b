//! Conformance: whole-suite runs
//!
//! Invariants under test:
//! - Honest servers pass every case, in sequential and parallel fan-out
//! - Cases are reported in a fixed order: rejection, agreement, sweep,
//!   multi-key
//! - One failing case never hides the others
//! - The runtime is started before and stopped after a run

use prfset_core::config::HarnessConfig;
use prfset_core::constants::OUTPUT_LENGTHS;
use prfset_core::suite::CaseKind;
use prfset_reference::Fault;

use crate::*;

const EXPECTED_CASES: usize = OUTPUT_LENGTHS.len() + 3 + 3 * OUTPUT_LENGTHS.len() + 3;

#[test]
fn honest_run_passes_every_case() {
    let report = suite(honest_runtime(), HarnessConfig::default()).run().unwrap();
    assert!(report.passed(), "{report}");
    let summary = report.summary();
    assert_eq!(summary.total, EXPECTED_CASES);
    assert_eq!(summary.passed, EXPECTED_CASES);
    assert_eq!(summary.failed, 0);
}

#[test]
fn parallel_fanout_gives_the_same_verdicts() {
    let config = HarnessConfig {
        parallel_fanout: true,
        ..HarnessConfig::default()
    };
    let parallel = suite(honest_runtime(), config).run().unwrap();
    let sequential = suite(honest_runtime(), HarnessConfig::default()).run().unwrap();
    assert!(parallel.passed(), "{parallel}");
    assert_eq!(parallel.summary(), sequential.summary());
    let kinds = |report: &prfset_core::SuiteReport| {
        report
            .cases
            .iter()
            .map(|case| (case.kind, case.template.clone(), case.output_length))
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(&parallel), kinds(&sequential));
}

#[test]
fn parallel_fanout_detects_divergence() {
    let config = HarnessConfig {
        parallel_fanout: true,
        ..HarnessConfig::default()
    };
    let report = suite(runtime_with(&[("java", Fault::FlipFirstByte)]), config)
        .run()
        .unwrap();
    assert!(!report.passed());
    assert!(report.failures().all(|case| !case.result.as_ref().unwrap_err().is_harness_defect()));
}

#[test]
fn cases_run_in_rule_order() {
    let report = suite(honest_runtime(), HarnessConfig::default()).run().unwrap();
    let kinds: Vec<CaseKind> = report.cases.iter().map(|case| case.kind).collect();
    let first_of = |kind| kinds.iter().position(|k| *k == kind).unwrap();
    let last_of = |kind| kinds.iter().rposition(|k| *k == kind).unwrap();
    assert_eq!(first_of(CaseKind::Rejection), 0);
    assert!(last_of(CaseKind::Rejection) < first_of(CaseKind::Agreement));
    assert!(last_of(CaseKind::Agreement) < first_of(CaseKind::OutputLength));
    assert!(last_of(CaseKind::OutputLength) < first_of(CaseKind::MultiKey));
}

#[test]
fn one_faulty_language_does_not_abort_the_run() {
    let report = suite(
        runtime_with(&[("python", Fault::FlipFirstByte)]),
        HarnessConfig::default(),
    )
    .run()
    .unwrap();
    assert_eq!(report.cases.len(), EXPECTED_CASES);
    // Python only answers HMAC keys; every failure is one of those.
    for case in report.failures() {
        assert!(case.template.starts_with("HMAC_"), "{case}");
        assert!(case.languages.contains(&Language::from("python")));
    }
    assert!(report.failures().count() > 0);
    let rejection = &report.cases[0];
    assert_eq!(rejection.kind, CaseKind::Rejection);
    assert!(rejection.passed());
}

#[test]
fn run_stops_the_runtime() {
    let runtime = honest_runtime();
    suite(runtime.clone(), HarnessConfig::default()).run().unwrap();
    assert!(runtime
        .languages()
        .all(|language| !runtime.server(language).unwrap().is_running()));
}

#[test]
fn narrowed_config_from_json() {
    let config = HarnessConfig::from_json(r#"{"output_lengths": [16, 33]}"#).unwrap();
    let report = suite(honest_runtime(), config).run().unwrap();
    assert!(report.passed(), "{report}");
    assert_eq!(report.summary().total, 2 + 3 + 3 * 2 + 3);
}

#[test]
fn report_display_ends_with_summary() {
    let report = suite(honest_runtime(), HarnessConfig::default()).run().unwrap();
    let text = report.to_string();
    assert!(text.starts_with("[unsupported] HKDF_SHA256 len=16 langs=python: PASS"));
    assert!(text.ends_with(&format!(
        "{EXPECTED_CASES} cases, {EXPECTED_CASES} passed, 0 failed (0 harness defects)"
    )));
}
