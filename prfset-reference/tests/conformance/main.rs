//! Conformance harness: PRF set cross-implementation properties.
//!
//! Runs the oracle against in-process reference servers. Honest servers
//! must pass every rule; servers with injected faults must be caught by the
//! rule they break.
//!
//! Property coverage:
//! - Rejection by unsupported languages (rejection)
//! - Agreement at the fixed length (agreement)
//! - Output-length sweep consistency (output_length)
//! - Build-once keysets (memoization)
//! - Primary / indexed lookup consistency (multi_key)
//! - Fault detection and failure reporting (divergence)
//! - Whole-suite runs, sequential and parallel (suite_run)
//!
//! Fixture: four languages. `python` ships only HMAC PRF keys, so
//! `HKDF_SHA256` is registered for `cc`, `go`, `java` only.

mod agreement;
mod memoization;
mod output_length;
mod rejection;
mod suite_run;

use std::sync::Arc;

use prfset_core::config::HarnessConfig;
use prfset_core::keyset::KeysetBuilder;
use prfset_core::oracle::ConsistencyOracle;
use prfset_core::proxy::ImplementationProxy;
use prfset_core::suite::ConformanceSuite;
use prfset_core::template::{HashType, KeyTemplate, Language, PrfConstruction, TemplateRegistry};
use prfset_reference::{Fault, InProcessRuntime, ReferenceServer};

pub const HMAC_SHA256: &str = "HMAC_SHA256_PRF";
pub const HMAC_SHA512: &str = "HMAC_SHA512_PRF";
pub const HKDF_SHA256: &str = "HKDF_SHA256";

// ── Fixture ─────────────────────────────────────────────────────

pub fn registry() -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::new(["cc", "go", "java", "python"]);
    registry
        .register(
            KeyTemplate::new(
                HMAC_SHA256,
                PrfConstruction::HmacPrf {
                    hash: HashType::Sha256,
                    key_size: 32,
                },
            ),
            ["cc", "go", "java", "python"],
        )
        .unwrap();
    registry
        .register(
            KeyTemplate::new(
                HMAC_SHA512,
                PrfConstruction::HmacPrf {
                    hash: HashType::Sha512,
                    key_size: 64,
                },
            ),
            ["cc", "go", "java", "python"],
        )
        .unwrap();
    registry
        .register(
            KeyTemplate::new(
                HKDF_SHA256,
                PrfConstruction::HkdfPrf {
                    hash: HashType::Sha256,
                    key_size: 32,
                    salt: Vec::new(),
                },
            ),
            ["cc", "go", "java"],
        )
        .unwrap();
    Arc::new(registry)
}

fn server(language: &str, faults: &[(&str, Fault)]) -> ReferenceServer {
    let mut server = ReferenceServer::new(language);
    if language == "python" {
        server = server.with_key_types(&["HmacPrfKey"]);
    }
    for (target, fault) in faults {
        if *target == language {
            server = server.with_fault(fault.clone());
        }
    }
    server
}

/// Started runtime over the fixture languages, with `faults` applied to the
/// named languages.
pub fn runtime_with(faults: &[(&str, Fault)]) -> Arc<InProcessRuntime> {
    let runtime = ["cc", "go", "java", "python"]
        .into_iter()
        .map(|language| server(language, faults))
        .fold(InProcessRuntime::new(), InProcessRuntime::with_server);
    for language in runtime.languages() {
        runtime.server(language).unwrap().start();
    }
    Arc::new(runtime)
}

pub fn honest_runtime() -> Arc<InProcessRuntime> {
    runtime_with(&[])
}

pub fn oracle(runtime: Arc<InProcessRuntime>) -> ConsistencyOracle {
    ConsistencyOracle::new(ImplementationProxy::new(runtime), false)
}

pub fn builder() -> KeysetBuilder {
    KeysetBuilder::new(registry())
}

pub fn suite(runtime: Arc<InProcessRuntime>, config: HarnessConfig) -> ConformanceSuite {
    ConformanceSuite::new(registry(), runtime, config).unwrap()
}

pub fn langs(names: &[&str]) -> Vec<Language> {
    names.iter().copied().map(Language::from).collect()
}

pub fn supported(template: &str) -> Vec<Language> {
    registry().get(template).unwrap().supported.clone()
}
