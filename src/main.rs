// =============================================================================
//  ____                      _       ___           _
// | __ ) _ __ ___  __ _  ___| |__   |_ _|_ __   __| | _____  __
// |  _ \| '__/ _ \/ _` |/ __| '_ \   | || '_ \ / _` |/ _ \ \/ /
// | |_) | | |  __/ (_| | (__| | | |  | || | | | (_| |  __/>  <
// |____/|_|  \___|\__,_|\___|_| |_| |___|_| |_|\__,_|\___/_/\_\
//
// Eight breach indexers, one table.
//
// A run scrapes every live source in turn, squeezes each listing through the
// normalization pipeline, writes a JSON and CSV file per source, merges them
// into a combined dataset and regenerates the README summary. A source that
// breaks this run keeps last run's dataset.
// =============================================================================

mod cli;
mod config;
mod error;
mod extract;
mod http;
mod models;
mod pipeline;
mod sources;
mod summary;
mod writer;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{select_sources, Cli, Command};
use crate::config::Config;
use crate::error::OutputError;
use crate::http::Fetcher;
use crate::models::{BreachRecord, Source};
use crate::pipeline::{merge, normalize_collection, FieldRenames};
use crate::summary::SummaryRow;
use crate::writer::DatasetWriter;

fn print_banner(selected: &[Source]) {
    let names: Vec<&str> = selected.iter().map(|s| s.name()).collect();
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════╗
    ║   BREACH INDEX                                           ║
    ║   normalize | merge | tally                              ║
    ╚══════════════════════════════════════════════════════════╝
    sources: {}
"#,
        names.join(", ")
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    debug!(output_dir = %config.output_dir.display(), "configuration loaded");

    match cli.command() {
        Command::Scrape { only, skip } => run_scrape(&config, &select_sources(&only, &skip)).await,
        Command::Table { template, readme } => run_table(&config, template, readme),
        Command::Convert { input } => run_convert(&config, &input),
        Command::Sources => {
            for source in Source::LIVE.into_iter().chain([Source::Vigilante]) {
                let kind = if source.is_live() { "live" } else { "archived (convert)" };
                println!("{:<18} {}", source.name(), kind);
            }
            Ok(())
        }
    }
}

async fn run_scrape(config: &Config, selected: &[Source]) -> anyhow::Result<()> {
    print_banner(selected);

    let fetcher = Fetcher::new(config).context("building HTTP client")?;
    let mut writer = DatasetWriter::new(&config.output_dir)?;
    let outcome = scrape_all(&fetcher, config, &mut writer, selected).await?;

    match summary::write_readme(&config.readme_template, &config.readme_path, &outcome.rows) {
        Ok(()) => {}
        Err(OutputError::MissingTemplate(path)) => {
            warn!(template = %path, "README template not found, summary not written")
        }
        Err(e) => return Err(e.into()),
    }

    let stats = writer.stats();
    info!(
        scraped = selected.len() - outcome.failed.len(),
        failed = outcome.failed.len(),
        combined = outcome.combined,
        files_written = stats.files_written,
        dir = %writer.dir().display(),
        "run complete"
    );
    if !outcome.failed.is_empty() {
        let names: Vec<&str> = outcome.failed.iter().map(|s| s.name()).collect();
        warn!("kept previous datasets for: {}", names.join(", "));
    }
    Ok(())
}

/// What one scrape pass left behind.
struct ScrapeOutcome {
    /// Summary rows: live sources in catalog order, then archived datasets.
    rows: Vec<SummaryRow>,
    /// Records written to the combined dataset.
    combined: usize,
    /// Selected sources that failed and fell back to their previous dataset.
    failed: Vec<Source>,
}

/// Scrape the `selected` live sources and write their datasets, then write
/// the combined dataset from every live source plus the archived ones.
///
/// A failed or unselected source is not written; its previous dataset on
/// disk, if any, stands in for it.
async fn scrape_all(
    fetcher: &Fetcher,
    config: &Config,
    writer: &mut DatasetWriter,
    selected: &[Source],
) -> Result<ScrapeOutcome, OutputError> {
    let mut live: Vec<(Source, Vec<BreachRecord>)> = Vec::with_capacity(Source::LIVE.len());
    let mut failed = Vec::new();

    for source in Source::LIVE {
        if !selected.contains(&source) {
            debug!(source = %source, "not selected, keeping previous dataset");
            live.push((source, previous_or_empty(writer, source)));
            continue;
        }

        match sources::scrape(source, fetcher, config).await {
            Ok(raw) => {
                let records = normalize_collection(&raw, sources::renames(source), source.name());
                writer.write_source(source, &records)?;
                live.push((source, records));
            }
            Err(_) => {
                failed.push(source);
                live.push((source, previous_or_empty(writer, source)));
            }
        }
    }

    let archived = load_archived(writer)?;
    let rows = summary_rows(&live, &archived);

    let combined = merge(
        live.into_iter()
            .map(|(_, records)| records)
            .chain(archived.into_iter().map(|(_, records)| records)),
    );
    writer.write_combined(&combined)?;

    Ok(ScrapeOutcome {
        rows,
        combined: combined.len(),
        failed,
    })
}

fn run_table(config: &Config, template: Option<PathBuf>, readme: Option<PathBuf>) -> anyhow::Result<()> {
    let writer = DatasetWriter::new(&config.output_dir)?;
    let live: Vec<(Source, Vec<BreachRecord>)> = Source::LIVE
        .iter()
        .map(|&source| (source, previous_or_empty(&writer, source)))
        .collect();
    let archived = load_archived(&writer)?;

    let template = template.unwrap_or_else(|| config.readme_template.clone());
    let readme = readme.unwrap_or_else(|| config.readme_path.clone());
    summary::write_readme(&template, &readme, &summary_rows(&live, &archived))?;
    Ok(())
}

fn run_convert(config: &Config, input: &Path) -> anyhow::Result<()> {
    let rows = sources::vigilante::load(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let mut writer = DatasetWriter::new(&config.output_dir)?;
    let path = writer.write_raw(&Source::Vigilante.json_file(), &rows)?;
    info!(records = rows.len(), path = %path.display(), "converted static dataset");
    Ok(())
}

/// Last run's dataset for `source`, normalized. Unreadable files count as
/// empty.
fn previous_or_empty(writer: &DatasetWriter, source: Source) -> Vec<BreachRecord> {
    match writer.previous(source) {
        Ok(Some(raw)) => {
            info!(source = %source, records = raw.len(), "using previous dataset");
            normalize_collection(&raw, FieldRenames::NONE, source.name())
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(source = %source, error = %e, "previous dataset unreadable");
            Vec::new()
        }
    }
}

fn load_archived(datasets: &DatasetWriter) -> Result<Vec<(String, Vec<BreachRecord>)>, OutputError> {
    let mut archived = Vec::new();
    for (name, path) in datasets.archived()? {
        match writer::load(&path) {
            Ok(raw) => {
                let records = normalize_collection(&raw, FieldRenames::NONE, &name);
                archived.push((name, records));
            }
            Err(e) => warn!(dataset = %name, error = %e, "skipping unreadable archived dataset"),
        }
    }
    Ok(archived)
}

fn summary_rows(
    live: &[(Source, Vec<BreachRecord>)],
    archived: &[(String, Vec<BreachRecord>)],
) -> Vec<SummaryRow> {
    live.iter()
        .map(|(source, records)| SummaryRow::new(source.name(), records, true))
        .chain(
            archived
                .iter()
                .map(|(name, records)| SummaryRow::new(name.as_str(), records, false)),
        )
        .collect()
}
