//! In-process PRF set server standing in for one language's implementation.
//!
//! Answers the same two RPCs a real testing server answers
//! (`PrfSetKeyIds`, `ComputePrf`) directly on the keyset bytes it is
//! handed. Faults can be injected to make it diverge in a controlled way,
//! which is how the oracle's detection paths are exercised.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use prfset_core::errors::HarnessError;
use prfset_core::keyset::{KeyStatus, Keyset, KeysetKey};
use prfset_core::proxy::{KeySelector, PrfSetChannel, PrfSetKeyIds};
use prfset_core::template::Language;

use crate::prf::compute_prf;

/// A controlled divergence from reference behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Flip the first byte of every successful output.
    FlipFirstByte,
    /// Answer every compute with zero bytes instead of rejecting a key type
    /// this server does not support.
    AcceptUnsupported,
    /// Like `AcceptUnsupported`, but reject properly at this one output
    /// length.
    AcceptUnsupportedExcept(usize),
    /// Fail every call at the transport level.
    Unreachable,
    /// Reject output lengths above this cap, even where the construction
    /// allows more.
    MaxOutputLength(usize),
    /// Return one byte more than requested.
    ExtraByte,
    /// Compute `KeySelector::Primary` with the first key of the keyset
    /// instead of the primary key.
    PrimaryIsFirstKey,
}

/// One language's PRF set implementation, in process.
#[derive(Debug)]
pub struct ReferenceServer {
    language: Language,
    key_types: Vec<&'static str>,
    faults: Vec<Fault>,
    running: AtomicBool,
    calls: AtomicUsize,
}

impl ReferenceServer {
    /// Server supporting the HMAC and HKDF PRF key types, not yet started.
    pub fn new(language: impl Into<Language>) -> Self {
        ReferenceServer {
            language: language.into(),
            key_types: vec!["HmacPrfKey", "HkdfPrfKey"],
            faults: Vec::new(),
            running: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Restrict the key types this server accepts.
    pub fn with_key_types(mut self, key_types: &[&'static str]) -> Self {
        self.key_types = key_types.to_vec();
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of RPCs answered or refused so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn has(&self, fault: &Fault) -> bool {
        self.faults.contains(fault)
    }

    fn output_cap(&self) -> Option<usize> {
        self.faults.iter().find_map(|fault| match fault {
            Fault::MaxOutputLength(cap) => Some(*cap),
            _ => None,
        })
    }

    fn accepts_unsupported(&self, output_length: usize) -> bool {
        self.faults.iter().any(|fault| match fault {
            Fault::AcceptUnsupported => true,
            Fault::AcceptUnsupportedExcept(honest_at) => *honest_at != output_length,
            _ => false,
        })
    }

    fn enter(&self) -> Result<(), HarnessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.has(&Fault::Unreachable) {
            return Err(HarnessError::Transport(format!(
                "{}: connection refused",
                self.language
            )));
        }
        if !self.is_running() {
            return Err(HarnessError::Transport(format!(
                "{}: server not running",
                self.language
            )));
        }
        Ok(())
    }

    fn load(&self, keyset: &[u8]) -> Result<Keyset, HarnessError> {
        Keyset::from_bytes(keyset)
            .map_err(|err| HarnessError::Primitive(format!("{}: {err}", self.language)))
    }

    fn select<'k>(&self, keyset: &'k Keyset, key: KeySelector) -> Result<&'k KeysetKey, HarnessError> {
        let selected = match key {
            KeySelector::Primary if self.has(&Fault::PrimaryIsFirstKey) => keyset.keys.first(),
            KeySelector::Primary => keyset.primary(),
            KeySelector::Id(id) => keyset.key(id),
        };
        let selected = selected.ok_or_else(|| {
            HarnessError::Primitive(format!("{}: unknown key id {key}", self.language))
        })?;
        if selected.status != KeyStatus::Enabled {
            return Err(HarnessError::Primitive(format!(
                "{}: key {} is not enabled",
                self.language, selected.key_id
            )));
        }
        Ok(selected)
    }
}

impl PrfSetChannel for ReferenceServer {
    fn key_ids(&self, keyset: &[u8]) -> Result<PrfSetKeyIds, HarnessError> {
        self.enter()?;
        let keyset = self.load(keyset)?;
        Ok(PrfSetKeyIds {
            primary_key_id: keyset.primary_key_id,
            key_ids: keyset.key_ids(),
        })
    }

    fn compute(
        &self,
        keyset: &[u8],
        key: KeySelector,
        input: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, HarnessError> {
        self.enter()?;
        let keyset = self.load(keyset)?;
        let selected = self.select(&keyset, key)?;
        let key_type = selected.template.construction.key_type();

        if !self.key_types.contains(&key_type) {
            if self.accepts_unsupported(output_length) {
                return Ok(vec![0u8; output_length]);
            }
            return Err(HarnessError::Primitive(format!(
                "{}: unsupported key type {key_type}",
                self.language
            )));
        }
        if let Some(cap) = self.output_cap() {
            if output_length > cap {
                return Err(HarnessError::Primitive(format!(
                    "{}: output length {output_length} above {cap}",
                    self.language
                )));
            }
        }

        let mut output = compute_prf(
            &selected.template.construction,
            &selected.key_value,
            input,
            output_length,
        )
        .map_err(|err| HarnessError::Primitive(format!("{}: {err}", self.language)))?;
        if self.has(&Fault::FlipFirstByte) {
            if let Some(first) = output.first_mut() {
                *first ^= 0x01;
            }
        }
        if self.has(&Fault::ExtraByte) {
            output.push(0);
        }
        tracing::debug!(
            language = %self.language,
            key_id = selected.key_id,
            output_length,
            "computed"
        );
        Ok(output)
    }
}
