//! Implementation proxy: "the PRF set primitive as implemented by language L".
//!
//! The transport is hidden behind [`PrfSetChannel`], one adapter per
//! transport/language. The oracle only ever sees [`PrfSetHandle`] and
//! [`BoundPrf`]; it never knows which adapter answers.
//!
//! Resolving a handle does not contact the backend. Every failure of the
//! implementation under test surfaces through the handle's functions as a
//! typed [`HarnessError`], never as an empty result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::HarnessError;
use crate::keyset::SerializedKeyset;
use crate::template::Language;

/// Which key of the keyset a compute request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySelector {
    Primary,
    Id(u32),
}

impl fmt::Display for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Primary => f.write_str("primary"),
            KeySelector::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Key ids of a keyset as reported by an implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrfSetKeyIds {
    pub primary_key_id: u32,
    pub key_ids: Vec<u32>,
}

/// RPC surface of one PRF set implementation.
///
/// Implementations answer `Err(HarnessError::Primitive)` when they reject a
/// request and `Err(HarnessError::Transport)` when the call itself failed.
/// Calls must complete or fail within the transport's own timeout.
pub trait PrfSetChannel: Send + Sync {
    /// `PrfSetKeyIds(keyset)`.
    fn key_ids(&self, keyset: &[u8]) -> Result<PrfSetKeyIds, HarnessError>;

    /// `ComputePrf(keyset, key_id, input, output_length)`.
    fn compute(
        &self,
        keyset: &[u8],
        key: KeySelector,
        input: &[u8],
        output_length: usize,
    ) -> Result<Vec<u8>, HarnessError>;
}

/// Lifecycle and lookup of the per-language backend servers.
///
/// Starting and stopping servers belongs to the runtime; the harness only
/// brackets a run with `start_all` / `stop_all`.
pub trait LanguageRuntime: Send + Sync {
    fn start_all(&self) -> Result<(), HarnessError>;

    fn stop_all(&self) -> Result<(), HarnessError>;

    /// Client for an already-started backend, if the language is known.
    fn client(&self, language: &Language) -> Option<Arc<dyn PrfSetChannel>>;
}

/// Resolves handles for a language and keyset.
#[derive(Clone)]
pub struct ImplementationProxy {
    runtime: Arc<dyn LanguageRuntime>,
}

impl ImplementationProxy {
    pub fn new(runtime: Arc<dyn LanguageRuntime>) -> Self {
        ImplementationProxy { runtime }
    }

    /// Handle for `keyset` as loaded by `language`.
    ///
    /// # Errors
    /// `HarnessError::Configuration` only if the runtime has no client for
    /// the language. Backend failures surface later, through the handle.
    pub fn for_language(
        &self,
        language: &Language,
        keyset: &SerializedKeyset,
    ) -> Result<PrfSetHandle, HarnessError> {
        let channel = self.runtime.client(language).ok_or_else(|| {
            HarnessError::Configuration(format!("no backend registered for language '{language}'"))
        })?;
        Ok(PrfSetHandle {
            language: language.clone(),
            keyset: keyset.clone(),
            channel,
        })
    }

    pub fn runtime(&self) -> &Arc<dyn LanguageRuntime> {
        &self.runtime
    }
}

impl fmt::Debug for ImplementationProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationProxy").finish_non_exhaustive()
    }
}

/// The PRF set loaded from one keyset by one language.
#[derive(Clone)]
pub struct PrfSetHandle {
    language: Language,
    keyset: SerializedKeyset,
    channel: Arc<dyn PrfSetChannel>,
}

impl PrfSetHandle {
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// The PRF bound to the primary key.
    pub fn primary(&self) -> BoundPrf {
        self.bind(KeySelector::Primary)
    }

    /// Primary key id as reported by the implementation.
    pub fn primary_id(&self) -> Result<u32, HarnessError> {
        Ok(self.key_ids()?.primary_key_id)
    }

    /// Every key id of the keyset, bound to its PRF.
    ///
    /// # Errors
    /// Whatever the implementation reports for `PrfSetKeyIds`, plus
    /// `HarnessError::Primitive` if it reports the same key id twice.
    pub fn all(&self) -> Result<BTreeMap<u32, BoundPrf>, HarnessError> {
        let ids = self.key_ids()?;
        let mut all = BTreeMap::new();
        for id in ids.key_ids {
            if all.insert(id, self.bind(KeySelector::Id(id))).is_some() {
                return Err(HarnessError::Primitive(format!(
                    "{} reported key id {id} twice",
                    self.language
                )));
            }
        }
        Ok(all)
    }

    fn key_ids(&self) -> Result<PrfSetKeyIds, HarnessError> {
        tracing::debug!(language = %self.language, "PrfSetKeyIds");
        self.channel.key_ids(self.keyset.as_bytes())
    }

    fn bind(&self, key: KeySelector) -> BoundPrf {
        BoundPrf {
            handle: self.clone(),
            key,
        }
    }
}

impl fmt::Debug for PrfSetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrfSetHandle")
            .field("language", &self.language)
            .field("keyset_len", &self.keyset.len())
            .finish_non_exhaustive()
    }
}

/// A PRF bound to one key of one handle.
#[derive(Clone)]
pub struct BoundPrf {
    handle: PrfSetHandle,
    key: KeySelector,
}

impl BoundPrf {
    pub fn key(&self) -> KeySelector {
        self.key
    }

    /// Compute `output_length` bytes of PRF output over `input`.
    ///
    /// # Errors
    /// `HarnessError::Primitive` if the implementation rejects the key type,
    /// the output length, the keyset or the key id. `HarnessError::Transport`
    /// if the call did not complete.
    pub fn compute(&self, input: &[u8], output_length: usize) -> Result<Vec<u8>, HarnessError> {
        tracing::debug!(
            language = %self.handle.language,
            key = %self.key,
            output_length,
            "ComputePrf"
        );
        self.handle.channel.compute(
            self.handle.keyset.as_bytes(),
            self.key,
            input,
            output_length,
        )
    }
}

impl fmt::Debug for BoundPrf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundPrf")
            .field("language", &self.handle.language)
            .field("key", &self.key)
            .finish()
    }
}
