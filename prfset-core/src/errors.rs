//! Error types for prfset-core.
//!
//! Every failure the harness can observe is classified into one of four
//! categories. The classification is what the consistency oracle acts on:
//! a `Primitive` error is a legitimate answer from an implementation, a
//! `Transport` error is a defect of the harness environment, and a
//! `Configuration` error means the test case could not even be set up.
//!
//! ## Stability
//! Display strings follow `"{Category} error: {message}"` and are part of
//! the report format. Changing them breaks report diffing between runs.

/// Unified error type for all prfset-core operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Unknown or malformed key template, unknown language, invalid config.
    /// Fatal to the single test case, never to the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The implementation under test rejected the request (unsupported key
    /// type, invalid output length, unknown key id, malformed keyset).
    #[error("Primitive error: {0}")]
    Primitive(String),

    /// RPC-level failure (connection refused, timeout, server stopped).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Keyset wire form or hex/base64 decoding failure.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl HarnessError {
    /// `true` if the implementation under test produced this error itself.
    pub fn is_primitive(&self) -> bool {
        matches!(self, HarnessError::Primitive(_))
    }

    /// `true` if the error came from the transport, not the implementation.
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport(_))
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Encoding(err.to_string())
    }
}

impl From<base64::DecodeError> for HarnessError {
    fn from(err: base64::DecodeError) -> Self {
        HarnessError::Encoding(format!("invalid base64: {err}"))
    }
}
