//! PRF set conformance harness.
//!
//! Verifies that independently maintained implementations of the PRF set
//! primitive, each running as its own service, produce byte-identical
//! outputs for identical inputs, or uniformly agree to fail. The harness
//! never computes a PRF itself; it builds canonical keysets, fans the same
//! request out to every implementation, and adjudicates the answers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`constants`] | Fixed inputs, output-length catalog |
//! | [`errors`] | `HarnessError` taxonomy |
//! | [`encoding`] | base64 / hex |
//! | [`template`] | Key templates, languages, registry |
//! | [`keyset`] | Keyset wire form, build-once keyset cache |
//! | [`proxy`] | `PrfSetChannel` / `LanguageRuntime` seams, handles |
//! | [`cases`] | Test case enumeration |
//! | [`oracle`] | Consistency rules and verdicts |
//! | [`suite`] | Run orchestration and reports |
//! | [`config`] | `HarnessConfig` |
//!
//! # Data Flow
//!
//! ```text
//! cases ──► keyset (template → keyset bytes)
//!       └─► proxy  (language → handle) ──► oracle ──► CaseReport
//! ```

/// Fixed inputs shared by every implementation under test.
pub mod constants;

/// Error types for harness operations.
pub mod errors;

/// Encoding utilities: base64 and hex.
pub mod encoding;

/// Key templates, implementation languages, template registry.
pub mod template;

/// Keysets and the keyset builder.
pub mod keyset;

/// Implementation proxy over the RPC seam.
pub mod proxy;

/// Test case enumeration.
pub mod cases;

/// Consistency oracle.
pub mod oracle;

/// Conformance suite orchestration.
pub mod suite;

/// Harness configuration.
pub mod config;

pub use config::HarnessConfig;
pub use errors::HarnessError;
pub use keyset::{Keyset, KeysetBuilder, SerializedKeyset};
pub use oracle::{CaseFailure, Collected, ConsistencyOracle};
pub use proxy::{
    BoundPrf, ImplementationProxy, KeySelector, LanguageRuntime, PrfSetChannel, PrfSetHandle,
    PrfSetKeyIds,
};
pub use suite::{CaseKind, CaseReport, ConformanceSuite, SuiteReport};
pub use template::{HashType, KeyTemplate, Language, PrfConstruction, TemplateRegistry};
