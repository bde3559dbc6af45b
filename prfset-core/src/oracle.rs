//! Consistency oracle: decides whether implementations agree.
//!
//! ## Rules
//! 1. Rejection: a language outside a template's supported set MUST fail
//!    with a primitive error. Success is a hard failure.
//! 2. Agreement: every supported language MUST succeed with identical
//!    output of the requested length.
//! 3. Output-length sweep: either every supported language succeeds with
//!    identical output, or every one fails. Mixed outcomes and disagreeing
//!    outputs are hard failures. Uniform failure is how implementations
//!    agree that a length is out of range for a construction.
//! 4. Multi-key: `all()` has one entry per key and the entry at
//!    `primary_id()` computes exactly what `primary()` computes.
//!
//! Per-language errors are collected, never allowed to abort the case. A
//! transport error is a harness defect and is reported as such, never
//! folded into a primitive rejection.

use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::to_hex;
use crate::errors::HarnessError;
use crate::keyset::SerializedKeyset;
use crate::proxy::{ImplementationProxy, PrfSetHandle};
use crate::template::Language;

/// Result of one language's computation.
pub type Outcome = Result<Vec<u8>, HarnessError>;

/// Per-language outcomes of one case, partitioned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    pub outputs: BTreeMap<Language, Vec<u8>>,
    pub errors: BTreeMap<Language, HarnessError>,
}

impl Collected {
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (Language, Outcome)>,
    {
        let mut collected = Collected::default();
        for (language, outcome) in outcomes {
            match outcome {
                Ok(output) => {
                    collected.outputs.insert(language, output);
                }
                Err(err) => {
                    collected.errors.insert(language, err);
                }
            }
        }
        collected
    }

    /// All succeeded with one value, or all failed.
    pub fn is_consistent(&self) -> bool {
        if self.outputs.is_empty() {
            return true;
        }
        self.errors.is_empty() && self.agreed_output().is_some()
    }

    /// The common output if every successful language returned the same
    /// bytes.
    pub fn agreed_output(&self) -> Option<&[u8]> {
        let mut values = self.outputs.values();
        let first = values.next()?;
        values
            .all(|value| value == first)
            .then_some(first.as_slice())
    }

    /// First transport error, if any language hit one.
    pub fn transport_error(&self) -> Option<(&Language, &HarnessError)> {
        self.errors.iter().find(|(_, err)| err.is_transport())
    }
}

impl fmt::Display for Collected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("outputs = {")?;
        for (i, (language, output)) in self.outputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{language}: {}", to_hex(output))?;
        }
        f.write_str("}, errors = {")?;
        for (i, (language, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{language}: {err}")?;
        }
        f.write_str("}")
    }
}

/// Why a case failed. Carries everything needed to read the divergence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseFailure {
    /// The case could not be set up (unknown template or language).
    #[error("{0}")]
    Configuration(HarnessError),

    /// A call never reached an answer. Harness defect, not a divergence.
    #[error("template {template}: {language} transport failure: {error}")]
    Transport {
        template: String,
        language: Language,
        error: HarnessError,
    },

    /// A language computed with a key type it is not certified for.
    #[error(
        "template {template}: {language} accepted an unsupported key type (output {})",
        to_hex(.output)
    )]
    UnexpectedAcceptance {
        template: String,
        language: Language,
        output: Vec<u8>,
    },

    /// A backend failed with something other than a primitive error.
    #[error("template {template}: {language} failed with a non-primitive error: {error}")]
    Unclassified {
        template: String,
        language: Language,
        error: HarnessError,
    },

    /// Supported languages disagree, or some failed while others succeeded.
    #[error("The PRF for template {template} and output_length={output_length} is inconsistent: {collected}.")]
    Divergence {
        template: String,
        output_length: usize,
        collected: Collected,
    },

    /// Every supported language rejected a request that must succeed.
    #[error("template {template}: all supported languages rejected output_length={output_length}: {collected}")]
    SupportedRejected {
        template: String,
        output_length: usize,
        collected: Collected,
    },

    /// Output length differs from the requested length.
    #[error("template {template}: {language} returned {actual} bytes, expected {expected}")]
    WrongLength {
        template: String,
        language: Language,
        expected: usize,
        actual: usize,
    },

    /// The primary accessor and the indexed lookup disagree.
    #[error("template {template}: {language} multi-key inconsistency: {detail}")]
    MultiKey {
        template: String,
        language: Language,
        detail: String,
    },
}

impl CaseFailure {
    /// `true` for harness defects rather than implementation divergence.
    pub fn is_harness_defect(&self) -> bool {
        matches!(
            self,
            CaseFailure::Configuration(_) | CaseFailure::Transport { .. }
        )
    }
}

/// How an output-length sweep case was found consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Every language returned these bytes.
    Agreed(Vec<u8>),
    /// Every language rejected the length.
    UniformlyRejected,
}

/// Applies the adjudication rules through an [`ImplementationProxy`].
#[derive(Debug, Clone)]
pub struct ConsistencyOracle {
    proxy: ImplementationProxy,
    parallel: bool,
}

impl ConsistencyOracle {
    /// `parallel` dispatches the per-language calls of one case on scoped
    /// threads; otherwise they run in language order.
    pub fn new(proxy: ImplementationProxy, parallel: bool) -> Self {
        ConsistencyOracle { proxy, parallel }
    }

    /// Run `primary().compute(input, output_length)` on every language and
    /// wait for all of them.
    ///
    /// # Errors
    /// `CaseFailure::Configuration` if a language cannot be resolved. No
    /// call is dispatched in that case.
    pub fn collect(
        &self,
        languages: &[Language],
        keyset: &SerializedKeyset,
        input: &[u8],
        output_length: usize,
    ) -> Result<Collected, CaseFailure> {
        let handles = self.resolve(languages, keyset)?;
        let outcomes = self.fan_out(&handles, |handle| {
            handle.primary().compute(input, output_length)
        });
        Ok(Collected::from_outcomes(
            languages.iter().cloned().zip(outcomes),
        ))
    }

    /// Rule 1: every language in `unsupported` must reject the template.
    pub fn check_rejection(
        &self,
        template: &str,
        keyset: &SerializedKeyset,
        unsupported: &[Language],
        input: &[u8],
        output_length: usize,
    ) -> Result<(), CaseFailure> {
        let collected = self.collect(unsupported, keyset, input, output_length)?;
        transport_check(template, &collected)?;
        if let Some((language, output)) = collected.outputs.iter().next() {
            return Err(CaseFailure::UnexpectedAcceptance {
                template: template.to_string(),
                language: language.clone(),
                output: output.clone(),
            });
        }
        if let Some((language, err)) = collected.errors.iter().find(|(_, e)| !e.is_primitive()) {
            return Err(CaseFailure::Unclassified {
                template: template.to_string(),
                language: language.clone(),
                error: err.clone(),
            });
        }
        Ok(())
    }

    /// Rule 2: every supported language succeeds with the same output of
    /// exactly `output_length` bytes. Returns that output.
    pub fn check_agreement(
        &self,
        template: &str,
        keyset: &SerializedKeyset,
        supported: &[Language],
        input: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, CaseFailure> {
        let collected = self.collect(supported, keyset, input, output_length)?;
        transport_check(template, &collected)?;
        if collected.outputs.is_empty() {
            return Err(CaseFailure::SupportedRejected {
                template: template.to_string(),
                output_length,
                collected,
            });
        }
        let agreed = match (collected.errors.is_empty(), collected.agreed_output()) {
            (true, Some(agreed)) => agreed.to_vec(),
            _ => {
                return Err(CaseFailure::Divergence {
                    template: template.to_string(),
                    output_length,
                    collected,
                })
            }
        };
        length_check(template, &collected, output_length)?;
        Ok(agreed)
    }

    /// Rule 3: all supported languages succeed and agree, or all fail.
    pub fn check_output_length(
        &self,
        template: &str,
        keyset: &SerializedKeyset,
        supported: &[Language],
        input: &[u8],
        output_length: usize,
    ) -> Result<SweepOutcome, CaseFailure> {
        let collected = self.collect(supported, keyset, input, output_length)?;
        transport_check(template, &collected)?;
        if !collected.is_consistent() {
            return Err(CaseFailure::Divergence {
                template: template.to_string(),
                output_length,
                collected,
            });
        }
        match collected.agreed_output() {
            Some(agreed) => {
                let agreed = agreed.to_vec();
                length_check(template, &collected, output_length)?;
                Ok(SweepOutcome::Agreed(agreed))
            }
            None => Ok(SweepOutcome::UniformlyRejected),
        }
    }

    /// Rule 4: on one language, `all()` has `expected_keys` entries and
    /// `all()[primary_id()]` equals `primary()` for the same input.
    pub fn check_multi_key(
        &self,
        template: &str,
        language: &Language,
        keyset: &SerializedKeyset,
        expected_keys: usize,
        input: &[u8],
        output_length: usize,
    ) -> Result<(), CaseFailure> {
        let handle = self
            .proxy
            .for_language(language, keyset)
            .map_err(CaseFailure::Configuration)?;
        let fail = |error: HarnessError| {
            if error.is_transport() {
                CaseFailure::Transport {
                    template: template.to_string(),
                    language: language.clone(),
                    error,
                }
            } else {
                CaseFailure::MultiKey {
                    template: template.to_string(),
                    language: language.clone(),
                    detail: error.to_string(),
                }
            }
        };

        let primary_output = handle.primary().compute(input, output_length).map_err(fail)?;
        let primary_id = handle.primary_id().map_err(fail)?;
        let all = handle.all().map_err(fail)?;
        let mut all_outputs = BTreeMap::new();
        for (key_id, prf) in &all {
            all_outputs.insert(*key_id, prf.compute(input, output_length).map_err(fail)?);
        }

        let mismatch = |detail: String| CaseFailure::MultiKey {
            template: template.to_string(),
            language: language.clone(),
            detail,
        };
        if all_outputs.len() != expected_keys {
            return Err(mismatch(format!(
                "all() has {} entries, expected {expected_keys}",
                all_outputs.len()
            )));
        }
        match all_outputs.get(&primary_id) {
            None => Err(mismatch(format!(
                "primary id {primary_id} missing from all()"
            ))),
            Some(indexed) if *indexed != primary_output => Err(mismatch(format!(
                "all()[{primary_id}] = {} but primary() = {}",
                to_hex(indexed),
                to_hex(&primary_output)
            ))),
            Some(_) => Ok(()),
        }
    }

    fn resolve(
        &self,
        languages: &[Language],
        keyset: &SerializedKeyset,
    ) -> Result<Vec<PrfSetHandle>, CaseFailure> {
        languages
            .iter()
            .map(|language| self.proxy.for_language(language, keyset))
            .collect::<Result<Vec<_>, _>>()
            .map_err(CaseFailure::Configuration)
    }

    /// Dispatch `call` for every handle and join. Results keep handle order.
    fn fan_out<F>(&self, handles: &[PrfSetHandle], call: F) -> Vec<Outcome>
    where
        F: Fn(&PrfSetHandle) -> Outcome + Sync,
    {
        if !self.parallel || handles.len() < 2 {
            return handles.iter().map(&call).collect();
        }
        std::thread::scope(|scope| {
            let call = &call;
            let pending: Vec<_> = handles
                .iter()
                .map(|handle| (handle, scope.spawn(move || call(handle))))
                .collect();
            pending
                .into_iter()
                .map(|(handle, joined)| {
                    joined.join().unwrap_or_else(|_| {
                        Err(HarnessError::Transport(format!(
                            "call to {} panicked",
                            handle.language()
                        )))
                    })
                })
                .collect()
        })
    }
}

fn transport_check(template: &str, collected: &Collected) -> Result<(), CaseFailure> {
    match collected.transport_error() {
        Some((language, error)) => {
            tracing::warn!(template, language = %language, %error, "transport failure");
            Err(CaseFailure::Transport {
                template: template.to_string(),
                language: language.clone(),
                error: error.clone(),
            })
        }
        None => Ok(()),
    }
}

fn length_check(template: &str, collected: &Collected, expected: usize) -> Result<(), CaseFailure> {
    match collected
        .outputs
        .iter()
        .find(|(_, output)| output.len() != expected)
    {
        Some((language, output)) => Err(CaseFailure::WrongLength {
            template: template.to_string(),
            language: language.clone(),
            expected,
            actual: output.len(),
        }),
        None => Ok(()),
    }
}
