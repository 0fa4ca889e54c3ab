// =============================================================================
// models.rs: THE SHAPES EVERY BREACH GETS SQUEEZED INTO
// =============================================================================
//
// Eight indexers, eight opinions about what a breach looks like. HIBP calls
// the size `PwnCount`, LeakCheck calls it `count`, Leak-Lookup prints it in a
// table cell with commas in it. By the time a record leaves the pipeline it
// has exactly one shape: the `BreachRecord` below.
//
// `RawRecord` is what an extractor hands over before anyone has tidied up.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An extractor's output before normalization: whatever keys the site had.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// The only keys a normalized record may carry, in output column order.
pub const WHITELIST: [&str; 7] = [
    "dump_name",
    "breach_date",
    "record_count",
    "info",
    "index_date",
    "description",
    "source",
];

/// Where a breach listing came from.
///
/// The `Display` form is the canonical name. It is written into every
/// record's `source` field and doubles as the dataset file stem
/// (`datasets/<name>.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// HaveIBeenPwned. The one with a real JSON API.
    HaveIBeenPwned,
    Dehashed,
    LeakLookup,
    BreachDirectory,
    LeakCheck,
    ScatteredSecrets,
    /// Hashmob wants an API key and is quick to answer 429.
    Hashmob,
    LeakedDomains,
    /// Static CSV snapshot of the defunct Vigilante.pw index. Never scraped.
    Vigilante,
}

impl Source {
    /// Indexers scraped on every run, in the order they are merged.
    pub const LIVE: [Source; 8] = [
        Source::HaveIBeenPwned,
        Source::Dehashed,
        Source::LeakLookup,
        Source::BreachDirectory,
        Source::LeakCheck,
        Source::ScatteredSecrets,
        Source::Hashmob,
        Source::LeakedDomains,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::HaveIBeenPwned => "HaveIBeenPwned",
            Source::Dehashed => "Dehashed",
            Source::LeakLookup => "Leak-Lookup",
            Source::BreachDirectory => "BreachDirectory",
            Source::LeakCheck => "LeakCheck.io",
            Source::ScatteredSecrets => "ScatteredSecrets",
            Source::Hashmob => "Hashmob",
            Source::LeakedDomains => "Leaked.Domains",
            Source::Vigilante => "Vigilante.pw",
        }
    }

    pub fn is_live(self) -> bool {
        !matches!(self, Source::Vigilante)
    }

    /// File name of this source's JSON dataset.
    pub fn json_file(self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses canonical names, case-insensitively, plus a few short aliases so
/// `--only hibp` works.
impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "hibp" => Some(Source::HaveIBeenPwned),
            "leaklookup" => Some(Source::LeakLookup),
            "leakcheck" => Some(Source::LeakCheck),
            "leakeddomains" => Some(Source::LeakedDomains),
            "vigilante" => Some(Source::Vigilante),
            _ => None,
        };
        if let Some(source) = alias {
            return Ok(source);
        }
        Source::LIVE
            .iter()
            .chain(std::iter::once(&Source::Vigilante))
            .copied()
            .find(|source| source.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown source '{s}'"))
    }
}

/// A record count as the source supplied it.
///
/// Kept in its original form so the JSON output matches what the indexer
/// said (`42` stays a number, `"1,500"` stays a string). Use
/// [`crate::pipeline::coerce_record_count`] to get a number out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordCount {
    Integer(u64),
    /// A JSON number that is not a whole non-negative count, e.g. `-5` or
    /// `12.5`. Kept as written, never counted.
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for RecordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordCount::Integer(n) => write!(f, "{n}"),
            RecordCount::Number(n) => write!(f, "{n}"),
            RecordCount::Text(s) => f.write_str(s),
        }
    }
}

/// One breach as listed by one indexer, after normalization.
///
/// Field order is the CSV column order. Absent fields are omitted from JSON
/// and written as empty cells in CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breach_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<RecordCount>,

    /// Free text: hash algorithm, compromised data classes, notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    /// When the indexer listed the dump, as opposed to when it happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub source: String,
}

impl BreachRecord {
    /// An otherwise empty record attributed to `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            dump_name: None,
            breach_date: None,
            record_count: None,
            info: None,
            index_date: None,
            description: None,
            source: source.into(),
        }
    }

    /// The record as a JSON object containing only the keys that are set.
    pub fn to_map(&self) -> RawRecord {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => RawRecord::new(),
        }
    }

    /// Cells in [`WHITELIST`] order, with absent fields as empty strings.
    pub fn csv_row(&self) -> [String; 7] {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            text(&self.dump_name),
            text(&self.breach_date),
            self.record_count
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            text(&self.info),
            text(&self.index_date),
            text(&self.description),
            self.source.clone(),
        ]
    }
}
