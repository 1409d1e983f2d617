//! Batch translation pipeline: collects eligible work per language, dispatches
//! it to the service in fixed-size batches, and merges results back into the
//! catalog.
//!
//! Batches run strictly one at a time. A failed batch is recovered locally
//! (its items count as errors and the run continues); a failed run only
//! happens on input or output errors, which are handled by the caller.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::catalog::{StringCatalog, StringUnit, TranslationState};
use crate::decision::{needs_translation, resolve_source_text, should_translate_key};
use crate::openai::{AnalysisItem, BatchItem, TranslationClient};
use crate::review::TranslationSuggestion;
use crate::stats::RunStats;

/// Settings for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Target languages, sorted. See [`resolve_target_languages`].
    pub languages: Vec<String>,
    /// Restrict processing to these keys; empty means all keys.
    pub keys: Vec<String>,
    /// Retranslate strings that are already translated.
    pub force: bool,
    /// Compute batches and counts without calling the service or mutating.
    pub dry_run: bool,
    /// Maximum strings per service call.
    pub batch_size: usize,
}

impl RunOptions {
    fn selects_key(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k == key)
    }
}

/// The languages a run targets: the requested ones (sorted, deduplicated), or
/// every language present in the catalog except the source language.
///
/// A requested language absent from every entry is still a valid target; all
/// eligible entries simply need translation into it.
pub fn resolve_target_languages(catalog: &StringCatalog, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        catalog
            .languages()
            .into_iter()
            .filter(|language| *language != catalog.source_language)
            .collect()
    } else {
        let mut languages: Vec<String> = requested.to_vec();
        languages.sort();
        languages.dedup();
        languages.retain(|language| *language != catalog.source_language);
        languages
    }
}

/// Eligible work for one target language, in sorted key order.
fn collect_translation_work(
    catalog: &StringCatalog,
    language: &str,
    options: &RunOptions,
    stats: &mut RunStats,
) -> Vec<BatchItem> {
    let mut items = Vec::new();

    for (key, entry) in &catalog.strings {
        if !options.selects_key(key) {
            continue;
        }
        // Deny entries are counted once per run, not here.
        if !should_translate_key(entry) {
            continue;
        }
        if !needs_translation(
            language,
            entry.localizations.get(language),
            &catalog.source_language,
            options.force,
        ) {
            stats.skipped_already_translated += 1;
            continue;
        }

        items.push(BatchItem {
            id: key.clone(),
            text: resolve_source_text(key, entry, &catalog.source_language).to_string(),
            context: entry.comment.clone(),
        });
    }

    items
}

/// Write one returned translation into the catalog.
///
/// Overwrites any prior string unit for that language (the item was already
/// selected as needing translation); `variations` are left untouched.
/// Idempotent for identical responses, last-write-wins otherwise.
pub fn apply_translation(catalog: &mut StringCatalog, key: &str, language: &str, text: &str) {
    let Some(entry) = catalog.strings.get_mut(key) else {
        return;
    };

    let localization = entry.localizations.entry(language.to_string()).or_default();
    localization.string_unit = Some(StringUnit {
        state: TranslationState::Translated,
        value: text.to_string(),
    });
}

/// Translate every missing string in the catalog, one language at a time.
pub async fn translate_catalog(
    catalog: &mut StringCatalog,
    client: &TranslationClient,
    options: &RunOptions,
) -> RunStats {
    let mut stats = RunStats {
        total_keys: catalog.strings.len(),
        ..Default::default()
    };

    // Entry-level opt-outs count once per run, regardless of language count.
    stats.skipped_should_not_translate = catalog
        .strings
        .iter()
        .filter(|(key, entry)| options.selects_key(key) && !should_translate_key(entry))
        .count();

    for language in &options.languages {
        let items = collect_translation_work(catalog, language, options, &mut stats);
        if items.is_empty() {
            debug!("Nothing to translate into {}", language);
            continue;
        }

        info!("{} strings need translation into {}", items.len(), language);

        for batch in items.chunks(options.batch_size.max(1)) {
            if options.dry_run {
                info!(
                    "[dry run] would translate {} strings into {}",
                    batch.len(),
                    language
                );
                stats.translated += batch.len();
                continue;
            }

            match client.translate_batch(batch, language).await {
                Ok(translations) => {
                    for item in batch {
                        match translations.get(&item.id) {
                            Some(text) => {
                                apply_translation(catalog, &item.id, language, text);
                                stats.translated += 1;
                            }
                            None => {
                                warn!(
                                    "Service returned no translation for \"{}\" ({})",
                                    item.id, language
                                );
                                stats.errors += 1;
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        "Translation batch of {} strings failed for {}: {:#}",
                        batch.len(),
                        language,
                        error
                    );
                    stats.errors += batch.len();
                }
            }
        }
    }

    stats
}

/// Ask the service to review already-translated strings and collect the
/// suggestions worth showing: confidence >= 4 and a text that actually
/// differs. Everything else is discarded silently.
///
/// Failed analysis batches are logged and skipped; suggest mode deliberately
/// has no error counter.
pub async fn collect_suggestions(
    catalog: &StringCatalog,
    client: &TranslationClient,
    options: &RunOptions,
) -> Vec<TranslationSuggestion> {
    let mut suggestions = Vec::new();

    for language in &options.languages {
        if *language == catalog.source_language {
            continue;
        }

        let mut items = Vec::new();
        let mut current_by_id: BTreeMap<String, String> = BTreeMap::new();

        for (key, entry) in &catalog.strings {
            if !options.selects_key(key) || !should_translate_key(entry) {
                continue;
            }
            let Some(unit) = entry
                .localizations
                .get(language)
                .filter(|loc| loc.is_translated())
                .and_then(|loc| loc.string_unit.as_ref())
            else {
                continue;
            };

            items.push(AnalysisItem {
                id: key.clone(),
                original: resolve_source_text(key, entry, &catalog.source_language).to_string(),
                translation: unit.value.clone(),
                context: entry.comment.clone(),
            });
            current_by_id.insert(key.clone(), unit.value.clone());
        }

        if items.is_empty() {
            debug!("No translated strings to review in {}", language);
            continue;
        }

        info!("Reviewing {} translated strings in {}", items.len(), language);

        for batch in items.chunks(options.batch_size.max(1)) {
            match client.analyze_batch(batch, language).await {
                Ok(findings) => {
                    for finding in findings {
                        let Some(current) = current_by_id.get(&finding.id) else {
                            // Finding for an id we never sent; drop it.
                            continue;
                        };
                        if finding.confidence >= 4 && finding.suggested_text != *current {
                            suggestions.push(TranslationSuggestion {
                                key: finding.id,
                                language: language.clone(),
                                current_translation: current.clone(),
                                suggested_translation: finding.suggested_text,
                                confidence: finding.confidence,
                                reasoning: finding.reasoning,
                            });
                        }
                    }
                }
                Err(error) => {
                    warn!("Analysis batch failed for {}: {:#}", language, error);
                }
            }
        }
    }

    suggestions
}
