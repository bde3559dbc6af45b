//! Keysets: canonical key material shared by every implementation under test.
//!
//! A keyset holds one or more keys, each tagged with a unique `u32` key id,
//! and designates exactly one of them primary. It is built once, serialized
//! once, and the same bytes are handed to every language.
//!
//! ## Wire form
//! ```text
//! {"primary_key_id": u32,
//!  "keys": [{"key_id": u32, "status": "ENABLED",
//!            "template": {"name", "type_url", "construction"},
//!            "key_value": base64}]}
//! ```
//! The bytes are opaque to the rest of the harness and must reach every
//! backend unchanged.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::HarnessError;
use crate::template::{KeyTemplate, TemplateRegistry};

/// Status of a key inside a keyset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    Enabled,
    Disabled,
}

/// One key of a keyset.
///
/// Key material is zeroized on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetKey {
    pub key_id: u32,
    pub status: KeyStatus,
    pub template: KeyTemplate,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub key_value: Vec<u8>,
}

impl fmt::Debug for KeysetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysetKey")
            .field("key_id", &self.key_id)
            .field("status", &self.status)
            .field("template", &self.template)
            .field("key_value", &format_args!("<{} bytes>", self.key_value.len()))
            .finish()
    }
}

impl Drop for KeysetKey {
    fn drop(&mut self) {
        self.key_value.zeroize();
    }
}

/// A bundle of keys with one designated primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyset {
    pub primary_key_id: u32,
    pub keys: Vec<KeysetKey>,
}

impl Keyset {
    /// Serialize to the opaque wire form handed to implementations.
    pub fn to_bytes(&self) -> Result<SerializedKeyset, HarnessError> {
        Ok(SerializedKeyset(serde_json::to_vec(self)?.into()))
    }

    /// Parse and validate the wire form.
    ///
    /// # Errors
    /// `HarnessError::Encoding` if the bytes are not a keyset, the keyset is
    /// empty, key ids repeat, or the primary id names no key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Keyset, HarnessError> {
        let keyset: Keyset = serde_json::from_slice(bytes)?;
        keyset.validate()?;
        Ok(keyset)
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.keys.is_empty() {
            return Err(HarnessError::Encoding("keyset has no keys".into()));
        }
        let mut seen = HashSet::new();
        for key in &self.keys {
            if !seen.insert(key.key_id) {
                return Err(HarnessError::Encoding(format!(
                    "duplicate key id {}",
                    key.key_id
                )));
            }
        }
        if !seen.contains(&self.primary_key_id) {
            return Err(HarnessError::Encoding(format!(
                "primary key id {} not in keyset",
                self.primary_key_id
            )));
        }
        Ok(())
    }

    /// Look up a key by id.
    pub fn key(&self, key_id: u32) -> Option<&KeysetKey> {
        self.keys.iter().find(|key| key.key_id == key_id)
    }

    /// The primary key.
    pub fn primary(&self) -> Option<&KeysetKey> {
        self.key(self.primary_key_id)
    }

    /// Key ids in keyset order.
    pub fn key_ids(&self) -> Vec<u32> {
        self.keys.iter().map(|key| key.key_id).collect()
    }
}

/// Serialized keyset bytes. Cheap to clone; the bytes are shared.
///
/// The bytes embed key material, so `Debug` shows only their length.
#[derive(Clone, PartialEq, Eq)]
pub struct SerializedKeyset(Arc<[u8]>);

impl fmt::Debug for SerializedKeyset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedKeyset(<{} bytes>)", self.0.len())
    }
}

impl SerializedKeyset {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if both handles share the same allocation.
    pub fn ptr_eq(&self, other: &SerializedKeyset) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<u8>> for SerializedKeyset {
    fn from(bytes: Vec<u8>) -> Self {
        SerializedKeyset(bytes.into())
    }
}

impl AsRef<[u8]> for SerializedKeyset {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Incremental keyset construction: add keys, pick a primary.
#[derive(Debug, Default)]
pub struct KeysetManager {
    primary_key_id: Option<u32>,
    keys: Vec<KeysetKey>,
}

impl KeysetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh key for `template` and return its id.
    ///
    /// Key ids are random, non-zero, and unique within this keyset.
    pub fn add_new_key(&mut self, template: &KeyTemplate) -> u32 {
        let key_id = loop {
            let candidate = OsRng.next_u32();
            if candidate != 0 && self.keys.iter().all(|key| key.key_id != candidate) {
                break candidate;
            }
        };
        let mut key_value = vec![0u8; template.construction.key_size()];
        OsRng.fill_bytes(&mut key_value);
        self.keys.push(KeysetKey {
            key_id,
            status: KeyStatus::Enabled,
            template: template.clone(),
            key_value,
        });
        key_id
    }

    /// Designate an existing key as primary.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if no key has this id.
    pub fn set_primary_key(&mut self, key_id: u32) -> Result<(), HarnessError> {
        if self.keys.iter().all(|key| key.key_id != key_id) {
            return Err(HarnessError::Configuration(format!(
                "cannot set primary: key id {key_id} not in keyset"
            )));
        }
        self.primary_key_id = Some(key_id);
        Ok(())
    }

    /// Finish the keyset.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if no primary was set.
    pub fn keyset(self) -> Result<Keyset, HarnessError> {
        let primary_key_id = self
            .primary_key_id
            .ok_or_else(|| HarnessError::Configuration("keyset has no primary key".into()))?;
        Ok(Keyset {
            primary_key_id,
            keys: self.keys,
        })
    }
}

/// A built keyset and its wire form. Immutable; shared by every case.
#[derive(Debug)]
pub struct BuiltKeyset {
    pub keyset: Keyset,
    pub serialized: SerializedKeyset,
}

type CacheKey = Vec<String>;
type CacheCell = Arc<OnceLock<Result<Arc<BuiltKeyset>, HarnessError>>>;

/// Build-once cache of keysets, keyed by the exact template-name tuple.
///
/// The map lock is only held to fetch or insert a per-key cell. The build
/// itself runs inside that cell's `OnceLock`, so each distinct key is built
/// exactly once and concurrent callers for the same key wait for it. The
/// outcome is cached either way; a failed build is never retried.
#[derive(Debug, Default)]
pub struct KeysetCache {
    cells: Mutex<HashMap<CacheKey, CacheCell>>,
}

impl KeysetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: CacheKey) -> Result<CacheCell, HarnessError> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|_| HarnessError::Configuration("keyset cache poisoned".into()))?;
        Ok(match cells.entry(key) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => Arc::clone(entry.insert(Arc::new(OnceLock::new()))),
        })
    }

    /// Number of distinct keys that have a cell (built or being built).
    pub fn len(&self) -> usize {
        self.cells.lock().map(|cells| cells.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds and memoizes keysets for registered templates.
#[derive(Debug)]
pub struct KeysetBuilder {
    registry: Arc<TemplateRegistry>,
    cache: KeysetCache,
}

impl KeysetBuilder {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        KeysetBuilder {
            registry,
            cache: KeysetCache::new(),
        }
    }

    /// Keyset with a single primary key of `template`.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if the template is not registered.
    pub fn build(&self, template: &str) -> Result<Arc<BuiltKeyset>, HarnessError> {
        self.build_multi(&[template])
    }

    /// Keyset with one key per template, the last one primary.
    ///
    /// Memoized by the exact ordered template list: `["A", "B"]` and
    /// `["B", "A"]` are different keysets.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if the list is empty or any template is
    /// not registered. Nothing is cached in that case.
    pub fn build_multi(&self, templates: &[&str]) -> Result<Arc<BuiltKeyset>, HarnessError> {
        if templates.is_empty() {
            return Err(HarnessError::Configuration(
                "keyset needs at least one template".into(),
            ));
        }
        let resolved = templates
            .iter()
            .map(|name| self.registry.get(name).map(|entry| &entry.template))
            .collect::<Result<Vec<_>, _>>()?;

        let key: CacheKey = templates.iter().map(|name| name.to_string()).collect();
        let cell = self.cache.cell(key)?;
        cell.get_or_init(|| {
            tracing::debug!(templates = ?templates, "generating keyset");
            generate(&resolved).map(Arc::new)
        })
        .clone()
    }

    /// The cache backing this builder.
    pub fn cache(&self) -> &KeysetCache {
        &self.cache
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }
}

fn generate(templates: &[&KeyTemplate]) -> Result<BuiltKeyset, HarnessError> {
    let mut manager = KeysetManager::new();
    let mut last = 0;
    for template in templates {
        last = manager.add_new_key(template);
    }
    manager.set_primary_key(last)?;
    let keyset = manager.keyset()?;
    let serialized = keyset.to_bytes()?;
    Ok(BuiltKeyset { keyset, serialized })
}
