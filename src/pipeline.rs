// =============================================================================
// pipeline.rs: NORMALIZE, MERGE, TALLY
// =============================================================================
//
// The part of the tool that does not touch the network or the disk.
//
// 1. `FieldRenames` maps a source's own key names onto canonical ones.
// 2. `normalize` projects a raw mapping onto the whitelist and stamps the
//    canonical source name on it.
// 3. `merge` concatenates per-source collections in the order given.
// 4. `tally` counts breaches and sums record counts for the summary table.
//
// Nothing here fails. A record count that cannot be read as a number is
// treated as absent; a record is never dropped because one field was bad.
// =============================================================================

use serde_json::Value;
use tracing::debug;

use crate::models::{BreachRecord, RawRecord, RecordCount};

/// Per-source key renames applied before projection.
///
/// Projection is strict: a count called `PwnCount` is dropped unless a rule
/// renames it to `record_count` first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRenames {
    rules: &'static [(&'static str, &'static str)],
}

impl FieldRenames {
    pub const NONE: FieldRenames = FieldRenames { rules: &[] };

    pub const fn new(rules: &'static [(&'static str, &'static str)]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [(&'static str, &'static str)] {
        self.rules
    }

    /// Returns a renamed copy of `record`.
    ///
    /// A rule whose source key is missing does nothing. A rule whose target
    /// already exists overwrites it.
    pub fn apply(&self, record: &RawRecord) -> RawRecord {
        let mut out = record.clone();
        for (from, to) in self.rules() {
            if let Some(value) = out.remove(*from) {
                out.insert((*to).to_string(), value);
            }
        }
        out
    }
}

/// Project `record` onto the whitelist and set `source` to `source_name`.
///
/// Any `source` already in the record is overwritten. Keys outside the
/// whitelist are dropped. A whitelisted key holding `null` is read as "no
/// value" and left out of the result, the same as a missing key; every
/// whitelisted key with a non-null value (empty strings included) is kept.
pub fn normalize(record: &RawRecord, source_name: &str) -> BreachRecord {
    let text = |key: &str| record.get(key).and_then(value_to_text);

    BreachRecord {
        dump_name: text("dump_name"),
        breach_date: text("breach_date"),
        record_count: record.get("record_count").and_then(value_to_count),
        info: text("info"),
        index_date: text("index_date"),
        description: text("description"),
        source: source_name.to_string(),
    }
}

/// Rename, then normalize, every record of one source.
pub fn normalize_collection(
    records: &[RawRecord],
    renames: FieldRenames,
    source_name: &str,
) -> Vec<BreachRecord> {
    records
        .iter()
        .map(|record| normalize(&renames.apply(record), source_name))
        .collect()
}

/// Read a record count as a number.
///
/// Integers pass through. Text keeps only its ASCII digits, so `"1,234"`
/// becomes 1234. Text with no digits at all is `None`, never zero, and so is
/// a digit run too long for a `u64`. A JSON number counts only when it is a
/// whole, non-negative value; its digits are never stripped.
pub fn coerce_record_count(value: &RecordCount) -> Option<u64> {
    match value {
        RecordCount::Integer(n) => Some(*n),
        RecordCount::Number(n) => whole_count(n),
        RecordCount::Text(s) => {
            let digits = remove_non_digits(s);
            if digits.is_empty() {
                return None;
            }
            digits.parse().ok()
        }
    }
}

pub fn remove_non_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Concatenate normalized collections, keeping the caller's source order and
/// each source's internal order. No deduplication: two indexers listing the
/// same breach produce two records.
pub fn merge<I>(collections: I) -> Vec<BreachRecord>
where
    I: IntoIterator<Item = Vec<BreachRecord>>,
{
    collections.into_iter().flatten().collect()
}

/// Summary numbers for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub breach_count: usize,
    /// `None` when no record had a usable count. Shown as "Unavailable".
    pub total_records: Option<u64>,
    /// Records whose count was absent or unreadable.
    pub omitted: usize,
}

pub fn tally(collection: &[BreachRecord]) -> Tally {
    let mut total: Option<u64> = None;
    let mut omitted = 0;

    for record in collection {
        match record.record_count.as_ref().map(|c| (c, coerce_record_count(c))) {
            Some((_, Some(n))) => total = Some(total.unwrap_or(0).saturating_add(n)),
            Some((raw, None)) => {
                debug!(
                    source = %record.source,
                    dump = record.dump_name.as_deref().unwrap_or(""),
                    record_count = %raw,
                    "record_count is not a number, leaving it out of the total"
                );
                omitted += 1;
            }
            None => omitted += 1,
        }
    }

    Tally {
        breach_count: collection.len(),
        total_records: total,
        omitted,
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn value_to_count(value: &Value) -> Option<RecordCount> {
    match value {
        Value::Number(n) => Some(match whole_count(n) {
            Some(n) => RecordCount::Integer(n),
            None => RecordCount::Number(n.clone()),
        }),
        other => value_to_text(other).map(RecordCount::Text),
    }
}

/// `1500` and `1500.0` are 1500. Negative, fractional and out-of-range
/// numbers are not counts.
fn whole_count(n: &serde_json::Number) -> Option<u64> {
    if let Some(n) = n.as_u64() {
        return Some(n);
    }
    let f = n.as_f64()?;
    // 2^64: the first float past u64::MAX.
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < 18_446_744_073_709_551_616.0 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WHITELIST;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn count(text: &str) -> BreachRecord {
        let mut record = BreachRecord::new("T");
        record.record_count = Some(RecordCount::Text(text.to_string()));
        record
    }

    #[test]
    fn test_normalize_sets_source() {
        let record = raw(json!({"dump_name": "foo"}));
        assert_eq!(normalize(&record, "X").source, "X");
    }

    #[test]
    fn test_normalize_overrides_existing_source() {
        let record = raw(json!({"dump_name": "foo", "source": "hibp"}));
        assert_eq!(normalize(&record, "HaveIBeenPwned").source, "HaveIBeenPwned");
    }

    #[test]
    fn test_normalize_keeps_only_whitelisted_keys() {
        let record = raw(json!({
            "dump_name": "foo",
            "breach_date": "2015-03-01",
            "record_count": 10,
            "info": "bcrypt",
            "index_date": "2015-10-26",
            "description": "a forum",
            "PwnCount": 99,
            "category": "forum",
        }));
        let map = normalize(&record, "X").to_map();
        for key in map.keys() {
            assert!(WHITELIST.contains(&key.as_str()), "unexpected key {key}");
        }
        for key in WHITELIST {
            assert!(map.contains_key(key), "dropped whitelisted key {key}");
        }
    }

    #[test]
    fn test_normalize_does_not_touch_input() {
        let record = raw(json!({"dump_name": "foo", "extra": 1}));
        let before = record.clone();
        let _ = normalize(&record, "X");
        assert_eq!(record, before);
    }

    #[test]
    fn test_normalize_treats_null_as_absent_and_keeps_empty_strings() {
        let record = raw(json!({"dump_name": null, "info": ""}));
        let normalized = normalize(&record, "X");
        assert_eq!(normalized.dump_name, None);
        assert_eq!(normalized.info.as_deref(), Some(""));
    }

    #[test]
    fn test_normalize_keeps_unreadable_count_as_text() {
        let record = raw(json!({"record_count": "N/A"}));
        assert_eq!(
            normalize(&record, "X").record_count,
            Some(RecordCount::Text("N/A".into()))
        );
    }

    #[test]
    fn test_float_and_negative_counts_are_not_digit_stripped() {
        let whole = normalize(&raw(json!({"record_count": 1500.0})), "X");
        assert_eq!(whole.record_count, Some(RecordCount::Integer(1500)));

        let negative = normalize(&raw(json!({"record_count": -5})), "X");
        assert_eq!(negative.record_count, Some(RecordCount::Number((-5).into())));
        assert_eq!(coerce_record_count(negative.record_count.as_ref().unwrap()), None);

        let fractional = normalize(&raw(json!({"record_count": 12.5})), "X");
        assert_eq!(coerce_record_count(fractional.record_count.as_ref().unwrap()), None);

        let totals = tally(&[whole, negative, fractional]);
        assert_eq!(totals.total_records, Some(1500));
        assert_eq!(totals.omitted, 2);
    }

    #[test]
    fn test_number_count_keeps_its_json_form() {
        let record = normalize(&raw(json!({"record_count": -5})), "X");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"record_count":-5,"source":"X"}"#
        );
    }

    #[test]
    fn test_normalize_joins_array_values() {
        let record = raw(json!({"info": ["Email addresses", "Passwords"]}));
        assert_eq!(
            normalize(&record, "X").info.as_deref(),
            Some("Email addresses, Passwords")
        );
    }

    #[test]
    fn test_renames_apply_before_projection() {
        static RULES: FieldRenames = FieldRenames::new(&[("PwnCount", "record_count")]);
        let record = raw(json!({"Name": "Adobe", "PwnCount": 152445165}));
        let out = normalize_collection(&[record], RULES, "HaveIBeenPwned");
        assert_eq!(out[0].record_count, Some(RecordCount::Integer(152445165)));
    }

    #[test]
    fn test_rename_with_missing_key_is_noop() {
        let renames = FieldRenames::new(&[("count", "record_count")]);
        let record = raw(json!({"dump_name": "foo"}));
        assert_eq!(renames.apply(&record), record);
    }

    #[test]
    fn test_coerce_record_count() {
        assert_eq!(coerce_record_count(&RecordCount::Text("1,234".into())), Some(1234));
        assert_eq!(coerce_record_count(&RecordCount::Text("N/A".into())), None);
        assert_eq!(coerce_record_count(&RecordCount::Integer(500)), Some(500));
        assert_eq!(coerce_record_count(&RecordCount::Text("".into())), None);
        assert_eq!(
            coerce_record_count(&RecordCount::Text("99999999999999999999999".into())),
            None
        );
    }

    #[test]
    fn test_merge_preserves_order_and_length() {
        let a: Vec<BreachRecord> = ["a1", "a2"]
            .iter()
            .map(|n| normalize(&raw(json!({"dump_name": n})), "A"))
            .collect();
        let b: Vec<BreachRecord> = ["b1", "b2", "b3"]
            .iter()
            .map(|n| normalize(&raw(json!({"dump_name": n})), "B"))
            .collect();

        let merged = merge(vec![a.clone(), b.clone()]);
        assert_eq!(merged.len(), a.len() + b.len());
        assert_eq!(&merged[..2], &a[..]);
        assert_eq!(&merged[2..], &b[..]);
    }

    #[test]
    fn test_merge_does_not_deduplicate_across_sources() {
        let a = vec![normalize(&raw(json!({"dump_name": "adobe"})), "A")];
        let b = vec![normalize(&raw(json!({"dump_name": "adobe"})), "B")];
        assert_eq!(merge(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_tally_empty_is_unavailable() {
        let t = tally(&[]);
        assert_eq!(t.breach_count, 0);
        assert_eq!(t.total_records, None);
    }

    #[test]
    fn test_tally_skips_unparseable_counts() {
        let t = tally(&[count("2,000"), count("bad")]);
        assert_eq!(t.breach_count, 2);
        assert_eq!(t.total_records, Some(2000));
        assert_eq!(t.omitted, 1);
    }

    #[test]
    fn test_unparseable_count_is_an_omission_not_a_zero() {
        let t = tally(&[count("N/A"), BreachRecord::new("T")]);
        assert_eq!(t.breach_count, 2);
        assert_eq!(t.total_records, None);
        assert_eq!(t.omitted, 2);
    }

    #[test]
    fn test_tally_saturates() {
        let mut big = BreachRecord::new("T");
        big.record_count = Some(RecordCount::Integer(u64::MAX));
        let t = tally(&[big.clone(), big]);
        assert_eq!(t.total_records, Some(u64::MAX));
    }

    #[test]
    fn test_end_to_end_two_sources() {
        static Y_RENAMES: FieldRenames = FieldRenames::new(&[("count", "record_count")]);
        let x = vec![raw(json!({
            "dump_name": "foo",
            "record_count": "1,500",
            "extra_field": "drop-me",
        }))];
        let y = vec![raw(json!({"dump_name": "bar", "count": 42}))];

        let merged = merge(vec![
            normalize_collection(&x, FieldRenames::NONE, "X"),
            normalize_collection(&y, Y_RENAMES, "Y"),
        ]);

        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            json!([
                {"dump_name": "foo", "record_count": "1,500", "source": "X"},
                {"dump_name": "bar", "record_count": 42, "source": "Y"},
            ])
        );
    }
}
