use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xcstrings_translator::catalog::StringCatalog;
use xcstrings_translator::config::Config;
use xcstrings_translator::openai::TranslationClient;
use xcstrings_translator::pipeline::{resolve_target_languages, translate_catalog, RunOptions};
use xcstrings_translator::review::{run_suggest_session, ConsolePrompt};

/// Translate missing strings in an Xcode String Catalog with OpenAI.
#[derive(Debug, Parser)]
#[command(name = "xcstrings-translator", version)]
struct Cli {
    /// Path to the .xcstrings catalog
    catalog: PathBuf,

    /// Write the updated catalog here instead of in place
    #[arg(long)]
    output: Option<PathBuf>,

    /// Restrict processing to these keys (repeatable)
    #[arg(long = "keys", value_name = "KEY")]
    keys: Vec<String>,

    /// Target language codes (repeatable; defaults to every language in the
    /// catalog except the source language)
    #[arg(long = "language", value_name = "LANG")]
    languages: Vec<String>,

    /// Retranslate strings that are already translated
    #[arg(long)]
    force: bool,

    /// Report what would be translated without calling the service
    #[arg(long)]
    dry_run: bool,

    /// Review existing translations interactively instead of translating
    #[arg(long)]
    suggest: bool,

    /// Model name (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("xcstrings_translator=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.api_key.clone(), cli.model.clone())?;

    let mut catalog = StringCatalog::load(&cli.catalog)?;
    info!(
        "Loaded {} with {} keys (source language {})",
        cli.catalog.display(),
        catalog.strings.len(),
        catalog.source_language
    );

    let output = cli.output.clone().unwrap_or_else(|| cli.catalog.clone());

    let languages = resolve_target_languages(&catalog, &cli.languages);
    if languages.is_empty() {
        info!("No target languages to process");
        return Ok(());
    }
    info!("Target languages: {}", languages.join(", "));

    let options = RunOptions {
        languages,
        keys: cli.keys.clone(),
        force: cli.force,
        dry_run: cli.dry_run,
        batch_size: config.batch_size,
    };

    let client = TranslationClient::new(&config);

    if cli.suggest {
        run_suggest_session(&mut catalog, &client, &options, &output, &mut ConsolePrompt).await?;
        return Ok(());
    }

    let stats = translate_catalog(&mut catalog, &client, &options).await;

    if cli.dry_run {
        info!("Dry run; catalog not written");
    } else {
        catalog.save(&output)?;
        info!("Wrote {}", output.display());
    }

    println!("{}", stats.render());

    if stats.errors > 0 {
        anyhow::bail!("{} strings failed to translate", stats.errors);
    }
    Ok(())
}
