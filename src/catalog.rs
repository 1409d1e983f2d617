//! In-memory model of an Xcode String Catalog (`.xcstrings`).
//!
//! The catalog is loaded once per run, mutated exclusively by the pipeline, and
//! serialized back with sorted keys so repeated runs produce stable diffs.
//! Fields the tool does not interpret (`version`, `variations`,
//! `extractionState`) are carried through verbatim.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for loading and saving a string catalog.
///
/// Read/parse failures are fatal before any processing starts; write failures
/// are fatal after all in-memory work is done.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read string catalog at {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid string catalog at {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write string catalog to {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Translation state of a single string unit, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationState {
    New,
    Translated,
    NeedsReview,
    Stale,
}

/// The flat `{state, value}` pair for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringUnit {
    pub state: TranslationState,
    pub value: String,
}

/// Per-language localization of one entry.
///
/// `variations` holds plural/device overrides which the tool never interprets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_unit: Option<StringUnit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variations: Option<serde_json::Value>,
}

impl Localization {
    /// A localization is complete when its string unit is `translated` with a
    /// non-empty value. Complete localizations are skipped on normal runs.
    pub fn is_translated(&self) -> bool {
        self.string_unit
            .as_ref()
            .map(|unit| unit.state == TranslationState::Translated && !unit.value.is_empty())
            .unwrap_or(false)
    }
}

/// Whether an entry may be translated.
///
/// Explicit tri-state instead of `Option<bool>` so call sites cannot confuse
/// "not specified" with "allowed". `Deny` blocks translation even under
/// `--force`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TranslateFlag {
    #[default]
    Unset,
    Allow,
    Deny,
}

impl TranslateFlag {
    pub fn is_unset(&self) -> bool {
        matches!(self, TranslateFlag::Unset)
    }
}

impl From<Option<bool>> for TranslateFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => TranslateFlag::Unset,
            Some(true) => TranslateFlag::Allow,
            Some(false) => TranslateFlag::Deny,
        }
    }
}

impl From<TranslateFlag> for Option<bool> {
    fn from(flag: TranslateFlag) -> Self {
        match flag {
            TranslateFlag::Unset => None,
            TranslateFlag::Allow => Some(true),
            TranslateFlag::Deny => Some(false),
        }
    }
}

/// One translatable unit, keyed by its identifier in the catalog.
///
/// The key itself doubles as the fallback source text when no source-language
/// localization exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "TranslateFlag::is_unset")]
    pub should_translate: TranslateFlag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_state: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: BTreeMap<String, Localization>,
}

/// The whole localization file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringCatalog {
    pub source_language: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub strings: BTreeMap<String, CatalogEntry>,
}

impl StringCatalog {
    /// Load and validate a catalog from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write the catalog back with sorted keys and stable formatting.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        // BTreeMap keys serialize in sorted order, so output is reproducible.
        let mut contents = serde_json::to_string_pretty(self).map_err(|source| {
            CatalogError::Write {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
            }
        })?;
        contents.push('\n');

        std::fs::write(path, contents).map_err(|source| CatalogError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// All language codes present in any entry, sorted.
    pub fn languages(&self) -> BTreeSet<String> {
        self.strings
            .values()
            .flat_map(|entry| entry.localizations.keys().cloned())
            .collect()
    }
}
