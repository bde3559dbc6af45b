//! Conformance suite: drives every rule over the whole registry.
//!
//! The suite owns the keyset builder, so every case of a run shares the
//! same memoized key material. A failing case never aborts the run; each
//! case produces exactly one [`CaseReport`].

use std::fmt;
use std::sync::Arc;

use crate::cases::{
    multi_key_languages, output_length_cases, rejection_cases, supported_cases, RejectionCase,
    TestCase,
};
use crate::config::HarnessConfig;
use crate::errors::HarnessError;
use crate::keyset::KeysetBuilder;
use crate::oracle::{CaseFailure, ConsistencyOracle, SweepOutcome};
use crate::proxy::{ImplementationProxy, LanguageRuntime};
use crate::template::{Language, TemplateRegistry};

/// Which rule a case exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseKind {
    Rejection,
    Agreement,
    OutputLength,
    MultiKey,
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaseKind::Rejection => "unsupported",
            CaseKind::Agreement => "supported",
            CaseKind::OutputLength => "output_length",
            CaseKind::MultiKey => "multiple_prfs",
        })
    }
}

/// How a passing case passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasePass {
    /// Every unsupported language rejected the template.
    UniformRejection,
    /// Every language produced these bytes.
    Agreed(Vec<u8>),
    /// Every supported language rejected the output length.
    UniformFailure,
    /// `all()` and `primary()` are consistent.
    PrimaryConsistent,
}

/// Verdict of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub kind: CaseKind,
    pub template: String,
    pub languages: Vec<Language>,
    pub output_length: usize,
    pub result: Result<CasePass, CaseFailure>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let languages: Vec<&str> = self.languages.iter().map(Language::as_str).collect();
        write!(
            f,
            "[{}] {} len={} langs={}: ",
            self.kind,
            self.template,
            self.output_length,
            languages.join(",")
        )?;
        match &self.result {
            Ok(_) => f.write_str("PASS"),
            Err(failure) => write!(f, "FAIL {failure}"),
        }
    }
}

/// Counts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub harness_defects: usize,
}

/// Every case of a run, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    /// Set when stopping the backends after the run failed.
    pub stop_error: Option<HarnessError>,
}

impl SuiteReport {
    /// `true` if every case passed and the backends stopped cleanly.
    pub fn passed(&self) -> bool {
        self.stop_error.is_none() && self.cases.iter().all(CaseReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> + '_ {
        self.cases.iter().filter(|case| !case.passed())
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.cases.len(),
            ..Summary::default()
        };
        for case in &self.cases {
            match &case.result {
                Ok(_) => summary.passed += 1,
                Err(failure) => {
                    summary.failed += 1;
                    if failure.is_harness_defect() {
                        summary.harness_defects += 1;
                    }
                }
            }
        }
        summary
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            writeln!(f, "{case}")?;
        }
        if let Some(err) = &self.stop_error {
            writeln!(f, "stop failed: {err}")?;
        }
        let summary = self.summary();
        write!(
            f,
            "{} cases, {} passed, {} failed ({} harness defects)",
            summary.total, summary.passed, summary.failed, summary.harness_defects
        )
    }
}

/// Orchestrates builder, enumerator and oracle over one registry.
#[derive(Debug)]
pub struct ConformanceSuite {
    registry: Arc<TemplateRegistry>,
    builder: KeysetBuilder,
    oracle: ConsistencyOracle,
    proxy: ImplementationProxy,
    config: HarnessConfig,
}

impl ConformanceSuite {
    /// # Errors
    /// `HarnessError::Configuration` if `config` is invalid.
    pub fn new(
        registry: Arc<TemplateRegistry>,
        runtime: Arc<dyn LanguageRuntime>,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        config.validate()?;
        let proxy = ImplementationProxy::new(runtime);
        Ok(ConformanceSuite {
            builder: KeysetBuilder::new(Arc::clone(&registry)),
            oracle: ConsistencyOracle::new(proxy.clone(), config.parallel_fanout),
            proxy,
            registry,
            config,
        })
    }

    pub fn builder(&self) -> &KeysetBuilder {
        &self.builder
    }

    pub fn oracle(&self) -> &ConsistencyOracle {
        &self.oracle
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Start every backend, run every case, stop every backend.
    ///
    /// Backends are stopped whether or not the start succeeded. A failed
    /// stop after a finished run is recorded in the report.
    ///
    /// # Errors
    /// Only a failure to start the runtime. Case failures are in the report.
    pub fn run(&self) -> Result<SuiteReport, HarnessError> {
        let runtime = self.proxy.runtime();
        if let Err(err) = runtime.start_all() {
            if let Err(stop_err) = runtime.stop_all() {
                tracing::warn!(error = %stop_err, "stop after failed start also failed");
            }
            return Err(err);
        }
        let mut report = self.run_cases();
        if let Err(err) = runtime.stop_all() {
            tracing::warn!(error = %err, "stopping backends failed");
            report.stop_error = Some(err);
        }
        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            harness_defects = summary.harness_defects,
            "conformance run finished"
        );
        Ok(report)
    }

    /// Every case against already-started backends.
    pub fn run_cases(&self) -> SuiteReport {
        let mut cases = Vec::new();
        let rejection_lengths = self.config.rejection_lengths();
        for case in rejection_cases(&self.registry, &rejection_lengths) {
            cases.push(self.run_rejection(&case));
        }
        for case in supported_cases(&self.registry, self.config.fixed_output_length) {
            cases.push(self.run_agreement(&case));
        }
        for case in output_length_cases(&self.registry, &self.config.output_lengths) {
            cases.push(self.run_output_length(&case));
        }
        for language in multi_key_languages(&self.registry, &self.config.multi_key_templates) {
            cases.push(self.run_multi_key(&language));
        }
        SuiteReport {
            cases,
            stop_error: None,
        }
    }

    /// Rule 1 for one (template, output length).
    pub fn run_rejection(&self, case: &RejectionCase) -> CaseReport {
        let output_length = case.output_length;
        let result = self
            .builder
            .build(&case.template)
            .map_err(CaseFailure::Configuration)
            .and_then(|built| {
                self.oracle.check_rejection(
                    &case.template,
                    &built.serialized,
                    &case.unsupported,
                    self.config.rejection_probe_input(),
                    output_length,
                )
            })
            .map(|()| CasePass::UniformRejection);
        self.report(
            CaseKind::Rejection,
            &case.template,
            case.unsupported.clone(),
            output_length,
            result,
        )
    }

    /// Rule 2 for one template.
    pub fn run_agreement(&self, case: &TestCase) -> CaseReport {
        let result = self
            .builder
            .build(&case.template)
            .map_err(CaseFailure::Configuration)
            .and_then(|built| {
                self.oracle.check_agreement(
                    &case.template,
                    &built.serialized,
                    &case.supported,
                    self.config.canonical_input(),
                    case.output_length,
                )
            })
            .map(CasePass::Agreed);
        self.report(
            CaseKind::Agreement,
            &case.template,
            case.supported.clone(),
            case.output_length,
            result,
        )
    }

    /// Rule 3 for one (template, output length).
    pub fn run_output_length(&self, case: &TestCase) -> CaseReport {
        let result = self
            .builder
            .build(&case.template)
            .map_err(CaseFailure::Configuration)
            .and_then(|built| {
                self.oracle.check_output_length(
                    &case.template,
                    &built.serialized,
                    &case.supported,
                    self.config.canonical_input(),
                    case.output_length,
                )
            })
            .map(|outcome| match outcome {
                SweepOutcome::Agreed(output) => CasePass::Agreed(output),
                SweepOutcome::UniformlyRejected => CasePass::UniformFailure,
            });
        self.report(
            CaseKind::OutputLength,
            &case.template,
            case.supported.clone(),
            case.output_length,
            result,
        )
    }

    /// Rule 4 on one language.
    pub fn run_multi_key(&self, language: &Language) -> CaseReport {
        let names: Vec<&str> = self
            .config
            .multi_key_templates
            .iter()
            .map(String::as_str)
            .collect();
        let template = names.join("+");
        let output_length = self.config.multi_key_output_length;
        let result = self
            .builder
            .build_multi(&names)
            .map_err(CaseFailure::Configuration)
            .and_then(|built| {
                self.oracle.check_multi_key(
                    &template,
                    language,
                    &built.serialized,
                    built.keyset.keys.len(),
                    self.config.canonical_input(),
                    output_length,
                )
            })
            .map(|()| CasePass::PrimaryConsistent);
        self.report(
            CaseKind::MultiKey,
            &template,
            vec![language.clone()],
            output_length,
            result,
        )
    }

    fn report(
        &self,
        kind: CaseKind,
        template: &str,
        languages: Vec<Language>,
        output_length: usize,
        result: Result<CasePass, CaseFailure>,
    ) -> CaseReport {
        match &result {
            Ok(_) => tracing::info!(%kind, template, output_length, "case passed"),
            Err(failure) => {
                tracing::warn!(%kind, template, output_length, %failure, "case failed")
            }
        }
        CaseReport {
            kind,
            template: template.to_string(),
            languages,
            output_length,
            result,
        }
    }
}
