// =============================================================================
// hashmob.rs: HASHMOB
// =============================================================================
//
// Hashmob's hashlist API wants an `api-key` header and answers 429 at the
// slightest provocation. The fetcher's linear backoff exists mostly for this
// endpoint. Without a configured key the source is skipped.
//
// Entries carry `name`, `total_hashes`, `hash_type` and `created_at`, under
// `data` or as a bare array.
// =============================================================================

use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::{date_only, json_rows_from};
use crate::http::Fetcher;
use crate::models::{RawRecord, Source};
use crate::pipeline::FieldRenames;

pub const RENAMES: FieldRenames = FieldRenames::new(&[
    ("name", "dump_name"),
    ("total_hashes", "record_count"),
    ("created_at", "index_date"),
    ("hash_type", "info"),
]);

pub async fn scrape(fetcher: &Fetcher, config: &Config) -> Result<Vec<RawRecord>, ExtractError> {
    let key = config
        .hashmob_api_key
        .as_deref()
        .ok_or(ExtractError::MissingCredential("Hashmob API key"))?;

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(key)
        .map_err(|_| ExtractError::MissingCredential("usable Hashmob API key"))?;
    headers.insert("api-key", value);

    let body: Value = fetcher.get_json(&config.hashmob_url, headers).await?;
    parse(body)
}

pub fn parse(body: Value) -> Result<Vec<RawRecord>, ExtractError> {
    let mut rows = json_rows_from(Source::Hashmob, body, &["data", "hashlists"])?;
    for row in &mut rows {
        if let Some(Value::String(created)) = row.get_mut("created_at") {
            if let Some(day) = date_only(created) {
                *created = day;
            }
        }
    }
    Ok(rows)
}
