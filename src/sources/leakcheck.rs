// =============================================================================
// leakcheck.rs: LEAKCHECK.IO
// =============================================================================
//
// LeakCheck lists its indexed leaks as JSON: `name`, `count` and `date`,
// either as a bare array or wrapped in `{"success": true, "result": [...]}`.
// =============================================================================

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::json_rows;
use crate::http::Fetcher;
use crate::models::{RawRecord, Source};
use crate::pipeline::FieldRenames;

pub const RENAMES: FieldRenames = FieldRenames::new(&[
    ("name", "dump_name"),
    ("count", "record_count"),
    ("date", "breach_date"),
]);

pub async fn scrape(fetcher: &Fetcher, config: &Config) -> Result<Vec<RawRecord>, ExtractError> {
    let body = fetcher.get_text(&config.leakcheck_url).await?;
    parse(&body)
}

pub fn parse(body: &str) -> Result<Vec<RawRecord>, ExtractError> {
    json_rows(Source::LeakCheck, body, &["result", "data"])
}
