// =============================================================================
// tables.rs: THE INDEXERS THAT ONLY SPEAK HTML
// =============================================================================
//
// Five sites publish their list as a table and nothing else. Each gets a
// `TableLayout` saying which cell holds what. The layouts read the page as
// it looks today and will need touching whenever a site redesigns; when that
// happens the source fails with `MarkupChanged` and the previous dataset on
// disk is kept.
//
// Dehashed and ScatteredSecrets sit behind bot protection, so their pages go
// through `Fetcher::get_protected`.
// =============================================================================

use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::{Column, TableLayout};
use crate::http::Fetcher;
use crate::models::{RawRecord, Source};

// <tr>
//   <td class="align-middle">2paclegacyboard.net</td>
//   <td class="align-middle"><abbr title='-'>Hover Here</abbr><p></p></td>
//   <td class="align-middle"><span class="text-nowrap">N/A</span></td>
//   <td class="align-middle"><span class="text-nowrap">1061</span></td>
//   <td class="align-middle"><abbr title='N/A'>Hover Here</abbr></td>
// </tr>
pub const DEHASHED: TableLayout = TableLayout {
    container: "table.table.table-hover tbody",
    rows: "tr",
    columns: &[
        Column::text("dump_name", 0),
        Column::text("breach_date", 2).inner("span"),
        Column::count("record_count", 3).inner("span"),
        Column::text("info", 4).inner("abbr").attr("title"),
    ],
};

// <tr>
//   <td>astropid.com</td>
//   <td class="d-xl-table-cell">5,789</td>
//   <td class="d-xl-table-cell">2017-02-20</td>
//   <td class="table-action text-center">...dropdown...</td>
// </tr>
pub const LEAK_LOOKUP: TableLayout = TableLayout {
    container: "table#datatables-indexed-breaches tbody",
    rows: "tr",
    columns: &[
        Column::text("dump_name", 0),
        Column::count("record_count", 1),
        Column::text("index_date", 2),
    ],
};

// Name | Entries | Breach date
pub const BREACH_DIRECTORY: TableLayout = TableLayout {
    container: "table tbody",
    rows: "tr",
    columns: &[
        Column::text("dump_name", 0),
        Column::count("record_count", 1),
        Column::text("breach_date", 2),
    ],
};

// Name | Breach date | Accounts | Hash type
pub const SCATTERED_SECRETS: TableLayout = TableLayout {
    container: "table tbody",
    rows: "tr",
    columns: &[
        Column::text("dump_name", 0),
        Column::text("breach_date", 1),
        Column::count("record_count", 2),
        Column::text("info", 3),
    ],
};

// Database | Records | Date
pub const LEAKED_DOMAINS: TableLayout = TableLayout {
    container: "table tbody",
    rows: "tr",
    columns: &[
        Column::text("dump_name", 0),
        Column::count("record_count", 1),
        Column::text("breach_date", 2),
    ],
};

/// Which layout and URL a table source uses, and whether its page is
/// bot-protected.
fn target(source: Source, config: &Config) -> Option<(&'static TableLayout, &Url, bool)> {
    match source {
        Source::Dehashed => Some((&DEHASHED, &config.dehashed_url, true)),
        Source::LeakLookup => Some((&LEAK_LOOKUP, &config.leaklookup_url, false)),
        Source::BreachDirectory => Some((&BREACH_DIRECTORY, &config.breachdirectory_url, false)),
        Source::ScatteredSecrets => Some((&SCATTERED_SECRETS, &config.scatteredsecrets_url, true)),
        Source::LeakedDomains => Some((&LEAKED_DOMAINS, &config.leakeddomains_url, false)),
        _ => None,
    }
}

/// Fetch and parse the table of one HTML source.
pub async fn scrape(
    source: Source,
    fetcher: &Fetcher,
    config: &Config,
) -> Result<Vec<RawRecord>, ExtractError> {
    let (layout, url, protected) = target(source, config)
        .ok_or_else(|| ExtractError::markup(source, "not an HTML table source"))?;

    debug!(source = %source, url = %url, protected = protected, "fetching breach table");
    let html = if protected {
        fetcher.get_protected(url).await?
    } else {
        fetcher.get_text(url).await?
    };

    layout.parse(source, &html)
}
