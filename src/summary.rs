// =============================================================================
// summary.rs: THE README TABLE
// =============================================================================
//
// One row per dataset:
//
//   | Service Name | Breach Count | Total Records | Automatic Updates |
//   | ------------ | ------------ | ------------- | :--: |
//   | HaveIBeenPwned | 785 | 13,481,210,003 | ✅ |
//   | Vigilante.pw | 6,417 | Unavailable | ❌ |
//
// Live sources come first in catalog order, then whatever else sits in the
// dataset directory. The table is dropped into `README.tpl` at the
// `README_TABLE` placeholder and written out as `README.md`.
// =============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::error::OutputError;
use crate::models::BreachRecord;
use crate::pipeline::{tally, Tally};

pub const TABLE_PLACEHOLDER: &str = "README_TABLE";
pub const UPDATED_PLACEHOLDER: &str = "README_UPDATED";

const HEADER: &str = "| Service Name | Breach Count | Total Records | Automatic Updates |\n\
                      | ------------ | ------------ | ------------- | :--: |\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    pub breach_count: usize,
    pub total_records: Option<u64>,
    pub omitted: usize,
    /// Scraped on every run, as opposed to an archived snapshot.
    pub automatic: bool,
}

impl SummaryRow {
    pub fn new(name: impl Into<String>, records: &[BreachRecord], automatic: bool) -> Self {
        let Tally {
            breach_count,
            total_records,
            omitted,
        } = tally(records);
        Self {
            name: name.into(),
            breach_count,
            total_records,
            omitted,
            automatic,
        }
    }

    fn markdown(&self) -> String {
        let total = match self.total_records {
            Some(n) => thousands(n),
            None => "Unavailable".to_string(),
        };
        let mark = if self.automatic { "✅" } else { "❌" };
        format!(
            "| {} | {} | {} | {} |",
            self.name,
            thousands(self.breach_count as u64),
            total,
            mark
        )
    }
}

pub fn render_table(rows: &[SummaryRow]) -> String {
    let mut table = String::from(HEADER);
    for row in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(table, "{}", row.markdown());
    }
    table
}

/// Substitute the table and generation date into a README template.
pub fn render_readme(template: &str, table: &str, updated: NaiveDate) -> String {
    template
        .replace(TABLE_PLACEHOLDER, table.trim_end())
        .replace(UPDATED_PLACEHOLDER, &updated.format("%Y-%m-%d").to_string())
}

/// Render `rows` into the template at `template` and write the result to
/// `readme`.
pub fn write_readme(template: &Path, readme: &Path, rows: &[SummaryRow]) -> Result<(), OutputError> {
    let text = match fs::read_to_string(template) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OutputError::MissingTemplate(template.display().to_string()))
        }
        Err(source) => {
            return Err(OutputError::Io {
                path: template.display().to_string(),
                source,
            })
        }
    };

    for row in rows.iter().filter(|r| r.omitted > 0) {
        debug!(dataset = %row.name, omitted = row.omitted, "records without a usable count");
    }

    let rendered = render_readme(&text, &render_table(rows), Utc::now().date_naive());
    fs::write(readme, rendered).map_err(|source| OutputError::Io {
        path: readme.display().to_string(),
        source,
    })?;
    info!(readme = %readme.display(), rows = rows.len(), "summary table written");
    Ok(())
}

/// `1234567` -> `"1,234,567"`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
