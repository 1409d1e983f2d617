//! Batch translation of Xcode String Catalogs via the OpenAI API.
//!
//! The pipeline loads a catalog, decides which strings are missing
//! translations, sends them in batches to the chat-completions endpoint, and
//! merges the results back. A suggest mode re-analyzes existing translations
//! and runs an interactive accept/reject review.

pub mod catalog;
pub mod config;
pub mod decision;
pub mod openai;
pub mod pipeline;
pub mod review;
pub mod stats;
