// Entry point and high-level run flow.
//
// A run is a single batch pass:
// - fetch NDJSON movie records (stream first, local file as fallback),
// - normalize them into typed rows and print a short load summary,
// - write the Markdown report plus its chart data files.
mod analysis;
mod config;
mod error;
mod loader;
mod normalize;
mod output;
mod reports;
mod types;
mod util;

use anyhow::Context;
use config::AppConfig;
use loader::RecordSource;
use output::MarkdownDocument;
use tracing::info;
use tracing_subscriber::EnvFilter;
use types::{NormalizedRow, Role, Tier};

/// Log to stderr, `info` and up unless `RUST_LOG` says otherwise.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Fetch and normalize the dataset, printing what survived cleaning.
fn handle_load(config: &AppConfig) -> anyhow::Result<Vec<NormalizedRow>> {
    let source = RecordSource::new(
        config.stream_url.clone(),
        config.fallback_path.clone(),
        config.timeout(),
    );
    let records = source.fetch().with_context(|| {
        format!(
            "neither the stream at {} nor the local file {} could be read",
            config.stream_url,
            config.fallback_path.display()
        )
    })?;

    let (rows, load_report) = normalize::normalize(records);
    println!(
        "Processing dataset... ({} records loaded, {} kept)",
        util::format_int(load_report.total_records),
        util::format_int(load_report.kept_rows)
    );
    println!(
        "Note: {} records dropped without a name, {} without both ratings.\n",
        util::format_int(load_report.missing_name),
        util::format_int(load_report.unrated)
    );
    Ok(rows)
}

/// Write the report document and chart files, then preview the top actors.
fn handle_generate_report(config: &AppConfig, rows: &[NormalizedRow]) -> anyhow::Result<()> {
    let mut doc = MarkdownDocument::new();
    let today = chrono::Local::now().date_naive();
    reports::write_report(rows, &mut doc, &config.chart_dir, today)
        .with_context(|| format!("failed to write chart data under {}", config.chart_dir.display()))?;
    doc.save(&config.output_path)
        .with_context(|| format!("failed to save report to {}", config.output_path.display()))?;
    info!(path = %config.output_path.display(), blocks = doc.blocks().len(), "report saved");

    println!("Top actors by rating:\n");
    let top = analysis::rank_people(rows, Role::Actor, Tier::Top, analysis::PERSONS_TOP);
    output::preview_table_rows(&reports::person_rows(&top), config.preview_rows);
    println!("(Full report exported to {})", config.output_path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = config::load_config().context("failed to load configuration")?;
    let rows = handle_load(&config)?;
    handle_generate_report(&config, &rows)
}
