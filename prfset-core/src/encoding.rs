//! Encoding utilities: base64 and hex.
//!
//! Base64 (standard alphabet, padded) carries key material inside the
//! keyset wire form. Hex is only used for diagnostics: reports render
//! every PRF output as lowercase hex so divergent bytes can be diffed.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::HarnessError;

/// Standard base64 with padding, as used for key material.
pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Inverse of [`to_base64`].
///
/// # Errors
/// Returns `HarnessError::Encoding` on invalid base64 input.
pub fn from_base64(encoded: &str) -> Result<Vec<u8>, HarnessError> {
    Ok(STANDARD.decode(encoded)?)
}

/// Lowercase hex, two digits per byte. Used to render PRF outputs in
/// reports.
pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Inverse of [`to_hex`]; accepts either case.
///
/// # Errors
/// Returns `HarnessError::Encoding` on invalid hex input.
pub fn from_hex(encoded: &str) -> Result<Vec<u8>, HarnessError> {
    if encoded.len() % 2 != 0 {
        return Err(HarnessError::Encoding("odd-length hex string".into()));
    }
    (0..encoded.len())
        .step_by(2)
        .map(|i| {
            encoded
                .get(i..i + 2)
                .ok_or_else(|| HarnessError::Encoding("invalid hex: non-ascii input".into()))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| HarnessError::Encoding(format!("invalid hex: {e}")))
                })
        })
        .collect()
}

/// Serde adapter storing `Vec<u8>` fields as base64 strings.
pub(crate) mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        super::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
