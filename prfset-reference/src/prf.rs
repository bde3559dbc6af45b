//! Reference PRF computations: HMAC and HKDF.
//!
//! ## Constructions
//! ```text
//! HMAC PRF: HMAC-H(key, input)[..n]          n <= HashLen
//! HKDF PRF: HKDF-Expand(HKDF-Extract(salt, key), info = input, n)
//!                                            n <= 255 * HashLen
//! ```
//! AES-CMAC and SHA-1 are not implemented here; requests for them are
//! rejected as unsupported, the way a real implementation rejects a key
//! type it does not ship.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use prfset_core::errors::HarnessError;
use prfset_core::template::{HashType, PrfConstruction};

/// Minimum accepted key size for HMAC and HKDF keys, in bytes.
pub const MIN_KEY_SIZE: usize = 16;

/// Largest output this reference produces for `construction`, or `None` if
/// the construction is unsupported.
pub fn max_output_length(construction: &PrfConstruction) -> Option<usize> {
    match construction {
        PrfConstruction::HmacPrf { hash, .. } => supported_hash(*hash).map(HashType::output_size),
        PrfConstruction::HkdfPrf { hash, .. } => {
            supported_hash(*hash).map(|hash| 255 * hash.output_size())
        }
        PrfConstruction::AesCmacPrf { .. } => None,
    }
}

/// Compute `output_length` bytes of PRF output.
///
/// # Errors
/// `HarnessError::Primitive` for unsupported constructions, short keys,
/// zero output length, or output length above the construction maximum.
pub fn compute_prf(
    construction: &PrfConstruction,
    key: &[u8],
    input: &[u8],
    output_length: usize,
) -> Result<Vec<u8>, HarnessError> {
    let max = max_output_length(construction).ok_or_else(|| {
        HarnessError::Primitive(format!("unsupported construction {construction:?}"))
    })?;
    if output_length == 0 || output_length > max {
        return Err(HarnessError::Primitive(format!(
            "invalid output length {output_length} (max {max})"
        )));
    }
    if key.len() < MIN_KEY_SIZE {
        return Err(HarnessError::Primitive(format!(
            "key too short: {} bytes",
            key.len()
        )));
    }
    match construction {
        PrfConstruction::HmacPrf { hash, .. } => {
            let mut tag = match hash {
                HashType::Sha256 => {
                    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(invalid_key)?;
                    mac.update(input);
                    mac.finalize().into_bytes().to_vec()
                }
                HashType::Sha512 => {
                    let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(invalid_key)?;
                    mac.update(input);
                    mac.finalize().into_bytes().to_vec()
                }
                HashType::Sha1 => return unsupported_hash(),
            };
            tag.truncate(output_length);
            Ok(tag)
        }
        PrfConstruction::HkdfPrf { hash, salt, .. } => {
            let salt = (!salt.is_empty()).then_some(salt.as_slice());
            let mut okm = vec![0u8; output_length];
            let expanded = match hash {
                HashType::Sha256 => Hkdf::<Sha256>::new(salt, key).expand(input, &mut okm),
                HashType::Sha512 => Hkdf::<Sha512>::new(salt, key).expand(input, &mut okm),
                HashType::Sha1 => return unsupported_hash(),
            };
            expanded.map_err(|_| {
                HarnessError::Primitive(format!("invalid output length {output_length}"))
            })?;
            Ok(okm)
        }
        PrfConstruction::AesCmacPrf { .. } => Err(HarnessError::Primitive(
            "unsupported construction AesCmacPrf".into(),
        )),
    }
}

fn supported_hash(hash: HashType) -> Option<HashType> {
    match hash {
        HashType::Sha256 | HashType::Sha512 => Some(hash),
        HashType::Sha1 => None,
    }
}

fn unsupported_hash<T>() -> Result<T, HarnessError> {
    Err(HarnessError::Primitive("unsupported hash SHA1".into()))
}

fn invalid_key(err: hmac::digest::InvalidLength) -> HarnessError {
    HarnessError::Primitive(format!("invalid HMAC key: {err}"))
}
