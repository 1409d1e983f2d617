//! Per-run translation counters.

/// Counters for one translation run. Reset by construction at the start of
/// each run, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries in the catalog (not entry-language pairs).
    pub total_keys: usize,
    /// Entries skipped because of an explicit `shouldTranslate: false`.
    pub skipped_should_not_translate: usize,
    /// Entry-language pairs skipped as already translated.
    pub skipped_already_translated: usize,
    /// Entry-language pairs translated (or, in dry runs, that would be).
    pub translated: usize,
    /// Entry-language pairs that failed: whole-batch service failures plus
    /// single ids the service omitted from an otherwise successful response.
    pub errors: usize,
}

impl RunStats {
    /// Human-readable end-of-run summary block.
    pub fn render(&self) -> String {
        [
            "Translation summary:".to_string(),
            format!("  total keys:             {}", self.total_keys),
            format!("  translated:             {}", self.translated),
            format!("  skipped (no-translate): {}", self.skipped_should_not_translate),
            format!("  skipped (up to date):   {}", self.skipped_already_translated),
            format!("  errors:                 {}", self.errors),
        ]
        .join("\n")
    }
}
