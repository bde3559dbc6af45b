//! In-process reference backends for the PRF set conformance harness.
//!
//! Each [`ReferenceServer`] plays one implementation language. It parses
//! the harness keyset wire form and computes HMAC / HKDF PRFs with the
//! RustCrypto crates. [`InProcessRuntime`] groups servers into a
//! [`LanguageRuntime`](prfset_core::LanguageRuntime) so a whole suite can
//! run without spawning processes.
//!
//! Servers accept [`Fault`]s, which make them diverge on purpose.

/// HMAC and HKDF PRF computations.
pub mod prf;

/// One language's PRF set server.
pub mod server;

/// Runtime over a set of servers.
pub mod runtime;

pub use prf::{compute_prf, max_output_length};
pub use runtime::InProcessRuntime;
pub use server::{Fault, ReferenceServer};
