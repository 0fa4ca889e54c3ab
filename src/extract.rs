// =============================================================================
// extract.rs: GETTING ROWS OUT OF TABLES MEANT FOR HUMANS
// =============================================================================
//
// Most indexers publish their list as an HTML table. The sites differ in
// which cell holds what, so each one describes its table with a
// `TableLayout` and this module does the walking.
//
// None of these layouts is a contract. When a site redesigns, the container
// selector stops matching and the source reports `MarkupChanged`. It does not
// quietly report zero breaches.
// =============================================================================

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::ExtractError;
use crate::models::{RawRecord, RecordCount, Source};
use crate::pipeline::coerce_record_count;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    /// Stored as a JSON number when it reads as one, as text otherwise.
    Count,
}

/// Where one output field lives inside a table row.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    /// Zero-based `td` index.
    pub cell: usize,
    /// Read from the first match of this selector inside the cell.
    pub inner: Option<&'static str>,
    /// Read this attribute instead of the text.
    pub attr: Option<&'static str>,
    pub kind: CellKind,
}

impl Column {
    pub const fn text(field: &'static str, cell: usize) -> Self {
        Self {
            field,
            cell,
            inner: None,
            attr: None,
            kind: CellKind::Text,
        }
    }

    pub const fn count(field: &'static str, cell: usize) -> Self {
        Self {
            field,
            cell,
            inner: None,
            attr: None,
            kind: CellKind::Count,
        }
    }

    pub const fn inner(mut self, selector: &'static str) -> Self {
        self.inner = Some(selector);
        self
    }

    pub const fn attr(mut self, name: &'static str) -> Self {
        self.attr = Some(name);
        self
    }
}

/// How one site lays out its breach table.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    /// Must match exactly the element holding the rows. No match means the
    /// markup changed.
    pub container: &'static str,
    pub rows: &'static str,
    pub columns: &'static [Column],
}

impl TableLayout {
    /// Parse every row of the table in `html` into a raw record.
    ///
    /// Rows with fewer cells than the layout needs are skipped, which takes
    /// care of header and spacer rows. A missing container is an error.
    pub fn parse(&self, site: Source, html: &str) -> Result<Vec<RawRecord>, ExtractError> {
        let document = Html::parse_document(html);
        let container_sel = selector(site, self.container)?;
        let row_sel = selector(site, self.rows)?;
        let cell_sel = selector(site, "td")?;

        let container = document
            .select(&container_sel)
            .next()
            .ok_or_else(|| ExtractError::markup(site, format!("no element matches `{}`", self.container)))?;

        let needed = self.columns.iter().map(|c| c.cell).max().map_or(0, |m| m + 1);
        let mut records = Vec::new();

        for (index, row) in container.select(&row_sel).enumerate() {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
            if cells.len() < needed {
                debug!(
                    source = %site,
                    row = index,
                    cells = cells.len(),
                    needed = needed,
                    "skipping short table row"
                );
                continue;
            }

            let mut record = RawRecord::new();
            for column in self.columns {
                if let Some(value) = read_column(site, column, cells[column.cell])? {
                    record.insert(column.field.to_string(), value);
                }
            }
            records.push(record);
        }

        Ok(records)
    }
}

fn read_column(
    site: Source,
    column: &Column,
    cell: ElementRef,
) -> Result<Option<Value>, ExtractError> {
    let element = match column.inner {
        Some(inner) => match cell.select(&selector(site, inner)?).next() {
            Some(el) => el,
            None => return Ok(None),
        },
        None => cell,
    };

    let raw = match column.attr {
        Some(attr) => match element.value().attr(attr) {
            Some(v) => clean_text(v),
            None => return Ok(None),
        },
        None => element_text(element),
    };

    Ok(Some(match column.kind {
        CellKind::Text => Value::String(raw),
        CellKind::Count => count_value(raw),
    }))
}

fn selector(site: Source, css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::markup(site, format!("invalid selector `{css}`: {e:?}")))
}

/// A count as a JSON number when it reads as one, otherwise the text as is.
pub fn count_value(raw: String) -> Value {
    match coerce_record_count(&RecordCount::Text(raw.clone())) {
        Some(n) => Value::from(n),
        None => Value::String(raw),
    }
}

/// All text below `element`, whitespace collapsed.
pub fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Collapse runs of whitespace (including newlines and nbsp) to one space
/// and trim the ends.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop the markup from an HTML fragment and keep the readable text.
pub fn strip_html(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    clean_text(&parsed.root_element().text().collect::<String>())
}

/// Rows of a JSON listing.
///
/// APIs either return a bare array or wrap it in an object under one of
/// `wrappers`. Anything else means the API changed shape.
pub fn json_rows(site: Source, body: &str, wrappers: &[&str]) -> Result<Vec<RawRecord>, ExtractError> {
    json_rows_from(site, serde_json::from_str(body)?, wrappers)
}

/// [`json_rows`] for a body that is already decoded.
pub fn json_rows_from(
    site: Source,
    value: Value,
    wrappers: &[&str],
) -> Result<Vec<RawRecord>, ExtractError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match wrappers.iter().find_map(|key| map.remove(*key)) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ExtractError::markup(
                    site,
                    format!("expected an array, or an object holding one under {wrappers:?}"),
                ))
            }
        },
        other => {
            return Err(ExtractError::markup(
                site,
                format!("expected a JSON listing, got {}", json_kind(&other)),
            ))
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => rows.push(map),
            other => debug!(source = %site, kind = json_kind(&other), "skipping non-object listing entry"),
        }
    }
    Ok(rows)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `YYYY-MM-DD` for RFC 3339 and `YYYY-MM-DD HH:MM:SS` timestamps. `None`
/// for anything else, including values that already are a bare date.
pub fn date_only(timestamp: &str) -> Option<String> {
    let day = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let trimmed = timestamp.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(day(ts.date_naive()));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ts| day(ts.date()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: TableLayout = TableLayout {
        container: "table#breaches tbody",
        rows: "tr",
        columns: &[
            Column::text("dump_name", 0),
            Column::count("record_count", 1),
            Column::text("info", 2).inner("abbr").attr("title"),
        ],
    };

    const PAGE: &str = r#"
        <html><body>
        <table id="breaches">
          <thead><tr><th>Name</th><th>Entries</th><th>Info</th></tr></thead>
          <tbody>
            <tr><td> astropid.com </td><td>5,789</td><td><abbr title="MD5">Hover</abbr></td></tr>
            <tr><td>mystery.net</td><td>N/A</td><td>none</td></tr>
            <tr><td>short row</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_reads_cells_by_layout() {
        let rows = LAYOUT.parse(Source::LeakLookup, PAGE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["dump_name"], "astropid.com");
        assert_eq!(rows[0]["record_count"], 5789);
        assert_eq!(rows[0]["info"], "MD5");
    }

    #[test]
    fn test_unreadable_count_stays_text_and_missing_inner_is_absent() {
        let rows = LAYOUT.parse(Source::LeakLookup, PAGE).unwrap();
        assert_eq!(rows[1]["record_count"], "N/A");
        assert!(!rows[1].contains_key("info"));
    }

    #[test]
    fn test_missing_container_is_markup_change() {
        let err = LAYOUT
            .parse(Source::LeakLookup, "<html><body><p>We moved!</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, ExtractError::MarkupChanged { site: Source::LeakLookup, .. }));
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let rows = LAYOUT
            .parse(Source::LeakLookup, r#"<table id="breaches"><tbody></tbody></table>"#)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html(r#"In 2015, <a href="https://x">000webhost</a> was
                breached."#),
            "In 2015, 000webhost was breached."
        );
    }

    #[test]
    fn test_json_rows_accepts_bare_and_wrapped_arrays() {
        let bare = json_rows(Source::LeakCheck, r#"[{"name": "a"}, 3]"#, &[]).unwrap();
        assert_eq!(bare.len(), 1);
        let wrapped =
            json_rows(Source::LeakCheck, r#"{"success": true, "result": [{"name": "a"}]}"#, &["result"])
                .unwrap();
        assert_eq!(wrapped[0]["name"], "a");
    }

    #[test]
    fn test_json_rows_rejects_unexpected_shape() {
        let err = json_rows(Source::Hashmob, r#"{"error": "nope"}"#, &["data"]).unwrap_err();
        assert!(matches!(err, ExtractError::MarkupChanged { site: Source::Hashmob, .. }));
    }

    #[test]
    fn test_date_only() {
        assert_eq!(date_only("2015-10-26T23:35:45Z").as_deref(), Some("2015-10-26"));
        assert_eq!(date_only("2021-05-01 12:30:00").as_deref(), Some("2021-05-01"));
        assert_eq!(date_only("2021-05-01"), None);
        assert_eq!(date_only("last week"), None);
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("\n  Breach date:\t 1 March 2015 \n"), "Breach date: 1 March 2015");
    }
}
