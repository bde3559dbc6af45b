//! Harness configuration.
//!
//! Every field has a default equal to the fixed contract in
//! [`crate::constants`], so an empty JSON object is a valid config. Callers
//! override fields to narrow a run (fewer lengths, fewer languages) or to
//! switch the fan-out mode.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CANONICAL_INPUT, FIXED_OUTPUT_LENGTH, MULTI_KEY_OUTPUT_LENGTH, MULTI_KEY_TEMPLATES,
    OUTPUT_LENGTHS, REJECTION_PROBE_INPUT,
};
use crate::errors::HarnessError;

/// Tunables of a conformance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Output lengths swept per template.
    pub output_lengths: Vec<usize>,
    /// Input of the agreement, sweep and multi-key cases (UTF-8).
    pub canonical_input: String,
    /// Input of the rejection probe (UTF-8).
    pub rejection_probe_input: String,
    /// Output length of the agreement cases, and the first length probed
    /// by the rejection cases.
    pub fixed_output_length: usize,
    /// Output length of the multi-key scenario.
    pub multi_key_output_length: usize,
    /// Templates of the multi-key keyset, last one primary.
    pub multi_key_templates: Vec<String>,
    /// Dispatch per-language calls of one case on scoped threads.
    pub parallel_fanout: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            output_lengths: OUTPUT_LENGTHS.to_vec(),
            canonical_input: String::from_utf8_lossy(CANONICAL_INPUT).into_owned(),
            rejection_probe_input: String::from_utf8_lossy(REJECTION_PROBE_INPUT).into_owned(),
            fixed_output_length: FIXED_OUTPUT_LENGTH,
            multi_key_output_length: MULTI_KEY_OUTPUT_LENGTH,
            multi_key_templates: MULTI_KEY_TEMPLATES.iter().map(|t| t.to_string()).collect(),
            parallel_fanout: false,
        }
    }
}

impl HarnessConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    /// `HarnessError::Configuration` on malformed JSON, unknown fields, or a
    /// config that fails [`HarnessConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        let config: HarnessConfig = serde_json::from_str(json)
            .map_err(|e| HarnessError::Configuration(format!("invalid harness config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// Zero-length outputs are allowed in the sweep: implementations must
    /// uniformly reject them, which is itself a property worth checking.
    /// The fixed lengths must be positive since those cases require success.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.output_lengths.is_empty() {
            return Err(HarnessError::Configuration(
                "output_lengths must not be empty".into(),
            ));
        }
        if self.fixed_output_length == 0 || self.multi_key_output_length == 0 {
            return Err(HarnessError::Configuration(
                "fixed output lengths must be positive".into(),
            ));
        }
        if self.multi_key_templates.len() < 2 {
            return Err(HarnessError::Configuration(
                "multi-key scenario needs at least two templates".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        if let Some(repeated) = self
            .multi_key_templates
            .iter()
            .find(|name| !seen.insert(name.as_str()))
        {
            return Err(HarnessError::Configuration(format!(
                "multi-key template '{repeated}' listed more than once"
            )));
        }
        Ok(())
    }

    /// Lengths the rejection cases probe: the fixed length, then every
    /// swept length not already listed.
    pub fn rejection_lengths(&self) -> Vec<usize> {
        let mut lengths = vec![self.fixed_output_length];
        for &length in &self.output_lengths {
            if !lengths.contains(&length) {
                lengths.push(length);
            }
        }
        lengths
    }

    pub fn canonical_input(&self) -> &[u8] {
        self.canonical_input.as_bytes()
    }

    pub fn rejection_probe_input(&self) -> &[u8] {
        self.rejection_probe_input.as_bytes()
    }
}
