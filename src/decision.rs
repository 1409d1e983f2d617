//! Pure eligibility rules: which entries need translation, and what source
//! text to send for them.

use crate::catalog::{CatalogEntry, Localization, TranslateFlag, TranslationState};

/// Whether an entry may be translated at all.
///
/// An explicit `shouldTranslate: false` is an authored opt-out and wins even
/// under `--force`.
pub fn should_translate_key(entry: &CatalogEntry) -> bool {
    match entry.should_translate {
        TranslateFlag::Deny => false,
        TranslateFlag::Unset | TranslateFlag::Allow => true,
    }
}

/// Whether one language column of an entry needs a translation pass.
pub fn needs_translation(
    language: &str,
    localization: Option<&Localization>,
    source_language: &str,
    force: bool,
) -> bool {
    // Never translate into the source language.
    if language == source_language {
        return false;
    }

    let Some(unit) = localization.and_then(|loc| loc.string_unit.as_ref()) else {
        return true;
    };

    if force {
        return true;
    }

    unit.state == TranslationState::New || unit.value.is_empty()
}

/// The text sent to the translation service for an entry.
///
/// Prefers the source-language localization value; falls back to the key
/// itself, which is how catalogs without explicit source entries are keyed.
/// Total: always returns a non-empty string for a non-empty key.
pub fn resolve_source_text<'a>(
    key: &'a str,
    entry: &'a CatalogEntry,
    source_language: &str,
) -> &'a str {
    entry
        .localizations
        .get(source_language)
        .and_then(|loc| loc.string_unit.as_ref())
        .map(|unit| unit.value.as_str())
        .filter(|value| !value.is_empty())
        .unwrap_or(key)
}
