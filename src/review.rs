//! Interactive review of improvement suggestions.
//!
//! Suggestions are presented one at a time in a fixed order (languages
//! sorted, then discovery order within a language). The decision source is
//! abstracted behind [`DecisionProvider`] so the state machine can be driven
//! by a console, a script, or a test double.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::StringCatalog;
use crate::openai::TranslationClient;
use crate::pipeline::{apply_translation, collect_suggestions, RunOptions};

/// A proposed replacement for an already-translated string. Transient; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationSuggestion {
    pub key: String,
    pub language: String,
    pub current_translation: String,
    pub suggested_translation: String,
    /// 1 (doubtful) to 5 (certain). Only >= 4 survives collection.
    pub confidence: u8,
    pub reasoning: String,
}

/// The three-way outcome of presenting one suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
    Quit,
}

/// Map raw user input to a decision. Unrecognized or empty input is a
/// rejection, not an error.
pub fn parse_decision(input: &str) -> ReviewDecision {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => ReviewDecision::Accept,
        "q" | "quit" => ReviewDecision::Quit,
        _ => ReviewDecision::Reject,
    }
}

/// Source of review decisions, one per presented suggestion.
pub trait DecisionProvider {
    fn decide(
        &mut self,
        suggestion: &TranslationSuggestion,
        index: usize,
        total: usize,
    ) -> Result<ReviewDecision>;
}

/// Console-backed provider: prints the suggestion and blocks on stdin.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl DecisionProvider for ConsolePrompt {
    fn decide(
        &mut self,
        suggestion: &TranslationSuggestion,
        index: usize,
        total: usize,
    ) -> Result<ReviewDecision> {
        println!();
        println!(
            "[{}/{}] \"{}\" ({})",
            index + 1,
            total,
            suggestion.key,
            suggestion.language
        );
        println!("  current:   {}", suggestion.current_translation);
        println!("  suggested: {}", suggestion.suggested_translation);
        println!(
            "  confidence {}/5: {}",
            suggestion.confidence, suggestion.reasoning
        );
        print!("Apply this suggestion? [y/N/q] ");
        std::io::stdout().flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read decision")?;

        Ok(parse_decision(&line))
    }
}

/// Tally of one review session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

/// Run the review loop over a flat suggestion list.
///
/// Accepting applies the suggested text to the catalog immediately; quitting
/// stops before the current suggestion is counted, leaving the remainder
/// undecided. The caller persists the catalog only when `accepted > 0`.
pub fn review_suggestions(
    catalog: &mut StringCatalog,
    suggestions: &[TranslationSuggestion],
    provider: &mut dyn DecisionProvider,
) -> Result<ReviewOutcome> {
    let mut outcome = ReviewOutcome::default();
    let total = suggestions.len();

    for (index, suggestion) in suggestions.iter().enumerate() {
        match provider.decide(suggestion, index, total)? {
            ReviewDecision::Accept => {
                apply_translation(
                    catalog,
                    &suggestion.key,
                    &suggestion.language,
                    &suggestion.suggested_translation,
                );
                outcome.accepted += 1;
            }
            ReviewDecision::Reject => {
                outcome.rejected += 1;
            }
            ReviewDecision::Quit => {
                info!(
                    "Review stopped; {} suggestions left undecided",
                    total - index
                );
                break;
            }
        }
    }

    Ok(outcome)
}

/// Full suggest-mode session: collect suggestions, review them, and persist
/// the catalog to `output` only when at least one suggestion was accepted.
/// Reject-only sessions leave the file untouched.
pub async fn run_suggest_session(
    catalog: &mut StringCatalog,
    client: &TranslationClient,
    options: &RunOptions,
    output: &Path,
    provider: &mut dyn DecisionProvider,
) -> Result<ReviewOutcome> {
    let suggestions = collect_suggestions(catalog, client, options).await;
    if suggestions.is_empty() {
        info!("No improvement suggestions");
        return Ok(ReviewOutcome::default());
    }

    info!("{} suggestions to review", suggestions.len());
    let outcome = review_suggestions(catalog, &suggestions, provider)?;
    info!(
        "Review finished: {} accepted, {} rejected",
        outcome.accepted, outcome.rejected
    );

    if outcome.accepted > 0 {
        catalog.save(output)?;
        info!("Wrote {}", output.display());
    } else {
        info!("Nothing accepted; catalog left untouched");
    }

    Ok(outcome)
}
