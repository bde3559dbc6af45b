//! Harness constants: fixed inputs shared by every implementation under test.
//!
//! These values are part of the cross-implementation contract: every
//! backend receives exactly these bytes and lengths. Changing one of them
//! invalidates comparisons against reports from earlier runs.

/// Output lengths swept for every template.
///
/// Straddles common hash output sizes (20, 32, 48, 64) and block
/// boundaries (16/17, 32/33, 64/65) where HMAC/HKDF expansion changes.
pub const OUTPUT_LENGTHS: [usize; 16] = [
    1, 2, 5, 10, 16, 17, 20, 32, 33, 48, 64, 65, 100, 256, 512, 1024,
];

/// Canonical input for agreement and sweep cases.
pub const CANONICAL_INPUT: &[u8] = b"This is some input data.";

/// Input used when probing a language that must reject a template.
pub const REJECTION_PROBE_INPUT: &[u8] = b"input_data";

/// Output length for the supported-agreement and rejection cases.
pub const FIXED_OUTPUT_LENGTH: usize = 16;

/// Output length for the multi-key keyset scenario.
pub const MULTI_KEY_OUTPUT_LENGTH: usize = 15;

/// Templates of the multi-key keyset, in insertion order. The last one is
/// primary.
pub const MULTI_KEY_TEMPLATES: [&str; 2] = ["HMAC_SHA256_PRF", "HKDF_SHA256"];

/// Implementation languages known to the default registry.
pub const DEFAULT_LANGUAGES: [&str; 4] = ["cc", "go", "java", "python"];

/// Type URL prefix shared by all PRF key types.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/google.crypto.tink.";
