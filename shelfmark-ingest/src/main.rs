//! shelfmark CLI: parse an ebook/audiobook file into its canonical
//! bibliographic record, optionally cross-checked against the configured
//! authorities, printed as the ParseResult JSON document on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use shelfmark_common::config::EnrichmentConfig;
use shelfmark_common::models::ParseResult;
use shelfmark_ingest::enrich::{
    apply_enrichment, EnrichmentContext, EnrichmentInput, EnrichmentOrchestrator,
};
use shelfmark_ingest::parse::{self, ParseOptions};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "shelfmark", version, about = "Ebook/audiobook metadata ingest")]
struct Args {
    /// Ebook or audiobook file to ingest
    file: PathBuf,

    /// Run authority enrichment after parsing
    #[arg(long)]
    enrich: bool,

    /// Enrichment config file (default: ~/.config/shelfmark/shelfmark.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attempt cover-image extraction
    #[arg(long)]
    cover: bool,

    /// Declared media type (otherwise detected from name and content)
    #[arg(long)]
    media_type: Option<String>,

    /// Truncation cap for extracted text, in characters
    #[arg(long, default_value_t = parse::DEFAULT_MAX_TEXT_LENGTH)]
    max_text_length: usize,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct CliOutput {
    #[serde(flatten)]
    parse: ParseResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    enrichment: Option<Vec<EnrichmentContext>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the JSON document
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    info!(file = %args.file.display(), "Starting shelfmark ingest");

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let options = ParseOptions {
        extract_cover: args.cover,
        max_text_length: args.max_text_length,
        file_name,
        media_type: args.media_type.clone(),
    };

    let mut result = parse::parse(bytes, options).await?;
    info!(
        title = ?result.metadata.title,
        format = ?result.metadata.source_format,
        "Parse complete"
    );

    let enrichment = if args.enrich {
        let config = EnrichmentConfig::load(args.config.as_deref())?;
        let orchestrator = EnrichmentOrchestrator::new(&config);

        // Ctrl-C cancels at the next network-call boundary
        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_cancel.cancel();
            }
        });

        let input = EnrichmentInput::from_metadata(&result.metadata);
        let contexts = orchestrator.enrich(&input, &cancel).await?;
        result.metadata = apply_enrichment(&result.metadata, &contexts);
        Some(contexts)
    } else {
        None
    };

    let output = CliOutput {
        parse: result,
        enrichment,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");

    Ok(())
}
