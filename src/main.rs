use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use dmarc_extract::config::{ExtractorConfig, env};
use dmarc_extract::{DmarcExtractor, ExtractionResult};

/// Extract DMARC aggregate reports from raw report emails.
#[derive(Debug, Parser)]
#[command(name = "dmarc-extract", version)]
struct Cli {
    /// Print one JSON object per mail file instead of one path per line.
    #[arg(long)]
    json: bool,

    /// Output directory. Overrides DMARC_TARGET_DIR.
    #[arg(long, value_name = "DIR")]
    target_dir: Option<PathBuf>,

    /// Raw RFC 5322 email files.
    #[arg(value_name = "MAIL_FILE", required = true)]
    sources: Vec<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    source: &'a PathBuf,
    paths: &'a ExtractionResult,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let override_dir = args
        .target_dir
        .as_ref()
        .map(|dir| dir.to_string_lossy().into_owned());
    let config = ExtractorConfig::from_lookup(|key| {
        if key == env::TARGET_DIR && override_dir.is_some() {
            return override_dir.clone();
        }
        std::env::var(key).ok()
    })
    .context("Failed to load configuration")?;

    let extractor = DmarcExtractor::from_config(&config).with_context(|| {
        format!("Failed to set up extractor for {}", config.target_dir.display())
    })?;

    for source in &args.sources {
        let result = extractor
            .extract(source)
            .with_context(|| format!("Failed to extract {}", source.display()))?;

        if args.json {
            let report = Report {
                source,
                paths: &result,
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            for path in &result {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
