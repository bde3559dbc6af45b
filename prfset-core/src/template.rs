//! Key templates, implementation languages, and the template registry.
//!
//! The registry is the collaborator that knows which PRF key types exist
//! and which languages are expected to support each of them. The harness
//! never decides support itself; it only reads the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LANGUAGES, TYPE_URL_PREFIX};
use crate::errors::HarnessError;

/// Identifier of one implementation under test (`"cc"`, `"go"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Language(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(name: &str) -> Self {
        Language::new(name)
    }
}

/// Hash function parameter of HMAC and HKDF constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashType {
    Sha1,
    Sha256,
    Sha512,
}

impl HashType {
    /// Digest size in bytes.
    pub fn output_size(self) -> usize {
        match self {
            HashType::Sha1 => 20,
            HashType::Sha256 => 32,
            HashType::Sha512 => 64,
        }
    }
}

/// Construction parameters of a PRF key type.
///
/// The harness carries these opaquely to the implementations; it never
/// evaluates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrfConstruction {
    HmacPrf {
        hash: HashType,
        key_size: usize,
    },
    HkdfPrf {
        hash: HashType,
        key_size: usize,
        #[serde(with = "crate::encoding::base64_bytes", default)]
        salt: Vec<u8>,
    },
    AesCmacPrf {
        key_size: usize,
    },
}

impl PrfConstruction {
    /// Size of the raw key material in bytes.
    pub fn key_size(&self) -> usize {
        match self {
            PrfConstruction::HmacPrf { key_size, .. }
            | PrfConstruction::HkdfPrf { key_size, .. }
            | PrfConstruction::AesCmacPrf { key_size } => *key_size,
        }
    }

    /// Key type name, the last segment of the type URL.
    pub fn key_type(&self) -> &'static str {
        match self {
            PrfConstruction::HmacPrf { .. } => "HmacPrfKey",
            PrfConstruction::HkdfPrf { .. } => "HkdfPrfKey",
            PrfConstruction::AesCmacPrf { .. } => "AesCmacPrfKey",
        }
    }
}

/// A named PRF key template. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyTemplate {
    pub name: String,
    pub type_url: String,
    pub construction: PrfConstruction,
}

impl KeyTemplate {
    /// Build a template whose type URL is derived from the construction.
    pub fn new(name: impl Into<String>, construction: PrfConstruction) -> Self {
        KeyTemplate {
            name: name.into(),
            type_url: format!("{TYPE_URL_PREFIX}{}", construction.key_type()),
            construction,
        }
    }
}

/// A registered template together with the languages expected to support it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTemplate {
    pub template: KeyTemplate,
    pub supported: Vec<Language>,
}

impl RegisteredTemplate {
    pub fn supports(&self, language: &Language) -> bool {
        self.supported.contains(language)
    }
}

/// Registry of PRF key templates, in registration order.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    languages: Vec<Language>,
    entries: Vec<RegisteredTemplate>,
}

impl TemplateRegistry {
    /// Empty registry over the given set of known implementation languages.
    pub fn new<I, L>(languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Language>,
    {
        let mut known: Vec<Language> = Vec::new();
        for language in languages {
            let language = language.into();
            if !known.contains(&language) {
                known.push(language);
            }
        }
        TemplateRegistry {
            languages: known,
            entries: Vec::new(),
        }
    }

    /// The PRF key templates every implementation ships, supported by all
    /// default languages.
    pub fn prf_defaults() -> Self {
        let mut registry = TemplateRegistry::new(DEFAULT_LANGUAGES);
        let all: Vec<Language> = registry.languages.clone();
        let defaults = [
            KeyTemplate::new(
                "HMAC_SHA256_PRF",
                PrfConstruction::HmacPrf {
                    hash: HashType::Sha256,
                    key_size: 32,
                },
            ),
            KeyTemplate::new(
                "HMAC_SHA512_PRF",
                PrfConstruction::HmacPrf {
                    hash: HashType::Sha512,
                    key_size: 64,
                },
            ),
            KeyTemplate::new(
                "HKDF_SHA256",
                PrfConstruction::HkdfPrf {
                    hash: HashType::Sha256,
                    key_size: 32,
                    salt: Vec::new(),
                },
            ),
            KeyTemplate::new("AES_CMAC_PRF", PrfConstruction::AesCmacPrf { key_size: 32 }),
        ];
        for template in defaults {
            registry.entries.push(RegisteredTemplate {
                template,
                supported: all.clone(),
            });
        }
        registry
    }

    /// Register a template and the languages expected to support it.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if the name is already registered, the
    /// supported set is empty, or it names a language the registry does not
    /// know.
    pub fn register<I, L>(&mut self, template: KeyTemplate, supported: I) -> Result<(), HarnessError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Language>,
    {
        if self.get(&template.name).is_ok() {
            return Err(HarnessError::Configuration(format!(
                "template '{}' registered twice",
                template.name
            )));
        }
        let mut langs: Vec<Language> = Vec::new();
        for language in supported {
            let language = language.into();
            if !self.languages.contains(&language) {
                return Err(HarnessError::Configuration(format!(
                    "template '{}' names unknown language '{language}'",
                    template.name
                )));
            }
            if !langs.contains(&language) {
                langs.push(language);
            }
        }
        if langs.is_empty() {
            return Err(HarnessError::Configuration(format!(
                "template '{}' has no supported language",
                template.name
            )));
        }
        self.entries.push(RegisteredTemplate {
            template,
            supported: langs,
        });
        Ok(())
    }

    /// All known implementation languages, in registration order.
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Registered templates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTemplate> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a template by name.
    ///
    /// # Errors
    /// `HarnessError::Configuration` if the name is not registered.
    pub fn get(&self, name: &str) -> Result<&RegisteredTemplate, HarnessError> {
        self.entries
            .iter()
            .find(|entry| entry.template.name == name)
            .ok_or_else(|| HarnessError::Configuration(format!("unknown key template '{name}'")))
    }

    /// Serialized form of a registered template.
    pub fn serialize(&self, name: &str) -> Result<Vec<u8>, HarnessError> {
        let entry = self.get(name)?;
        Ok(serde_json::to_vec(&entry.template)?)
    }
}
