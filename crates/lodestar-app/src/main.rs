//! Lodestar - benchmark-anchored funding ideas from whitelisted evidence
//!
//! Ingests a file of evidence items, builds a prioritized context, and
//! synthesizes validated funding ideas against fixed per-metric benchmarks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lodestar_adapters::{config::Config, export, ingest};
use lodestar_core::benchmark::Metric;
use lodestar_engine::{
    run_pipeline, CancellationToken, OpenAiCompatBackend, PipelineOptions, RigorMode,
};

#[derive(Parser, Debug)]
#[command(
    name = "lodestar",
    about = "Benchmark-anchored philanthropic funding ideas from curated evidence",
    version
)]
struct Args {
    /// Goal statement to generate ideas for
    goal: String,

    /// Path to the ingested evidence file (JSON array or JSON Lines)
    #[arg(long)]
    evidence: PathBuf,

    /// Metric hint to bias evidence relevance (DALY, WALY, WELBY, LOG_INCOME, CO2)
    #[arg(long)]
    metric: Option<String>,

    /// Number of ideas to request (catalog holds at most this many)
    #[arg(long)]
    ideas: Option<usize>,

    /// Run the stricter, slower deep pass
    #[arg(long)]
    deep: bool,

    /// Model override for the generative backend
    #[arg(long)]
    model: Option<String>,

    /// Export format for the catalog
    #[arg(long, value_enum, default_value = "markdown")]
    export: ExportFormat,

    /// Write the export here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lodestar=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load();

    let metric_hint = args
        .metric
        .as_deref()
        .map(Metric::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("{e}; valid metrics: DALY, WALY, WELBY, LOG_INCOME, CO2"))?;

    let pool = ingest::load_evidence_pool(&args.evidence)
        .with_context(|| format!("loading evidence from {}", args.evidence.display()))?;
    eprintln!("  Loaded {} evidence item(s)", pool.len());

    let backend = OpenAiCompatBackend::from_env(
        args.model.clone().or_else(|| config.model.clone()),
        Duration::from_secs(config.request_timeout_secs()),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut options = PipelineOptions::new(&args.goal);
    options.metric_hint = metric_hint;
    options.num_ideas = args.ideas.unwrap_or_else(|| config.num_ideas());
    options.rigor = if args.deep {
        RigorMode::Deep
    } else {
        RigorMode::Standard
    };

    // Ctrl-C aborts between pipeline stages; a partially validated idea
    // never reaches the catalog.
    let cancel = CancellationToken::new();
    let cancel_handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("  Cancelling after the current stage...");
            cancel_handle.cancel();
        }
    });

    let outcome = run_pipeline(Arc::new(backend), &pool, options, cancel).await?;

    let diag = &outcome.diagnostics;
    eprintln!(
        "  {} validated, {} rejected ({} draft(s), {} benchmark normalization(s))",
        diag.validated, diag.rejected, diag.drafts, diag.benchmark_normalizations
    );
    for rejection in &outcome.catalog.rejections {
        eprintln!(
            "    - rejected [{}] {}: {}",
            rejection.reason.code(),
            rejection.funding_target,
            rejection.note
        );
    }

    let rendered = match args.export {
        ExportFormat::Json => export::to_json(&outcome.catalog)?,
        ExportFormat::Csv => export::to_csv(&outcome.catalog),
        ExportFormat::Markdown => export::to_markdown(&outcome.catalog),
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing export to {}", path.display()))?;
            eprintln!("  Wrote {} idea(s) to {}", outcome.catalog.len(), path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
