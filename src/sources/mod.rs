// =============================================================================
// sources/mod.rs: ONE MODULE PER INDEXER
// =============================================================================
//
// Every live source answers the same question: what does your breach list
// look like right now? The answer is a `Vec<RawRecord>` in the source's own
// vocabulary plus a `FieldRenames` table translating that vocabulary, or an
// `ExtractError` saying why we could not tell.
//
// Sources run one after another. A failure in one never stops the others.
// =============================================================================

pub mod hashmob;
pub mod hibp;
pub mod leakcheck;
pub mod tables;
pub mod vigilante;

use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::ExtractError;
use crate::http::Fetcher;
use crate::models::{RawRecord, Source};
use crate::pipeline::FieldRenames;

/// Fetch and extract one live source.
pub async fn scrape(
    source: Source,
    fetcher: &Fetcher,
    config: &Config,
) -> Result<Vec<RawRecord>, ExtractError> {
    let started = Instant::now();
    info!(source = %source, "scraping");

    let result = match source {
        Source::HaveIBeenPwned => hibp::scrape(fetcher, config).await,
        Source::LeakCheck => leakcheck::scrape(fetcher, config).await,
        Source::Hashmob => hashmob::scrape(fetcher, config).await,
        Source::Dehashed
        | Source::LeakLookup
        | Source::BreachDirectory
        | Source::ScatteredSecrets
        | Source::LeakedDomains => tables::scrape(source, fetcher, config).await,
        Source::Vigilante => Err(ExtractError::NotLive(source)),
    };

    match &result {
        Ok(records) => info!(
            source = %source,
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scraped {} breaches from {}",
            records.len(),
            source
        ),
        Err(e) => warn!(source = %source, error = %e, "scraping {} failed", source),
    }
    result
}

/// How a source's own key names map onto the canonical ones.
///
/// HTML tables and the static CSV already produce canonical keys.
pub fn renames(source: Source) -> FieldRenames {
    match source {
        Source::HaveIBeenPwned => hibp::RENAMES,
        Source::LeakCheck => leakcheck::RENAMES,
        Source::Hashmob => hashmob::RENAMES,
        Source::Dehashed
        | Source::LeakLookup
        | Source::BreachDirectory
        | Source::ScatteredSecrets
        | Source::LeakedDomains
        | Source::Vigilante => FieldRenames::NONE,
    }
}
