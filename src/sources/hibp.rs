// =============================================================================
// hibp.rs: HAVEIBEENPWNED
// =============================================================================
//
// The well-behaved one. HIBP publishes its whole breach catalogue as a JSON
// array at /api/v3/breaches, no key required, as long as the request carries
// a User-Agent.
//
// Each entry looks like:
//
//   { "Name": "000webhost", "Title": "000webhost",
//     "BreachDate": "2015-03-01", "AddedDate": "2015-10-26T23:35:45Z",
//     "PwnCount": 14936670, "Description": "In approximately March 2015 ...",
//     "DataClasses": ["Email addresses", "IP addresses", "Names", "Passwords"] }
//
// The keys stay HIBP's; `RENAMES` maps them onto ours. `Description` comes
// with embedded links, which we strip to plain text.
// =============================================================================

use serde_json::Value;

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::{date_only, strip_html};
use crate::http::Fetcher;
use crate::models::RawRecord;
use crate::pipeline::FieldRenames;

pub const RENAMES: FieldRenames = FieldRenames::new(&[
    ("Title", "dump_name"),
    ("BreachDate", "breach_date"),
    ("AddedDate", "index_date"),
    ("PwnCount", "record_count"),
    ("Description", "description"),
    ("DataClasses", "info"),
]);

pub async fn scrape(fetcher: &Fetcher, config: &Config) -> Result<Vec<RawRecord>, ExtractError> {
    let body = fetcher.get_text(&config.hibp_url).await?;
    parse(&body)
}

pub fn parse(body: &str) -> Result<Vec<RawRecord>, ExtractError> {
    let breaches: Vec<RawRecord> = serde_json::from_str(body)?;
    Ok(breaches.into_iter().map(tidy).collect())
}

fn tidy(mut breach: RawRecord) -> RawRecord {
    if let Some(Value::String(description)) = breach.get_mut("Description") {
        *description = strip_html(description);
    }
    // Only the day matters for "date added".
    if let Some(Value::String(added)) = breach.get_mut("AddedDate") {
        if let Some(day) = date_only(added) {
            *added = day;
        }
    }
    breach
}
