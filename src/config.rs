// =============================================================================
// config.rs: EVERY KNOB, ONE PLACE
// =============================================================================
//
// Endpoints, keys, paths and backoff settings. Everything can be overridden
// with an environment variable prefixed BREACH_INDEX_, and a `.env` file in
// the working directory is honored.
//
// The resulting `Config` is passed down explicitly. Nothing below `main`
// reads the environment, so a source module can be tested against a local
// mock server by building a `Config` that points at it.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Where per-source and combined datasets are written, and where archived
    /// datasets are picked up for the summary. Default: datasets
    pub output_dir: PathBuf,

    /// Template containing the README_TABLE placeholder. Default: README.tpl
    pub readme_template: PathBuf,

    /// Rendered summary. Default: README.md
    pub readme_path: PathBuf,

    // =========================================================================
    // HTTP
    // =========================================================================

    /// Several indexers serve an empty page to anything that does not look
    /// like a browser.
    pub user_agent: String,

    /// Per-request timeout. Default: 30 seconds.
    pub http_timeout: Duration,

    /// On HTTP 429 the fetcher sleeps `rate_limit_backoff * attempt`.
    /// Default: 5 seconds.
    pub rate_limit_backoff: Duration,

    /// Attempts per URL before giving up on 429. Default: 5.
    pub rate_limit_max_attempts: u32,

    /// FlareSolverr-compatible endpoint for bot-protected pages, e.g.
    /// http://localhost:8191/v1. Unset means fetch those pages directly.
    pub bypass_url: Option<Url>,

    /// How long the bypass endpoint may spend on one page. Default: 60 seconds.
    pub bypass_timeout: Duration,

    // =========================================================================
    // SOURCES
    // =========================================================================
    pub hibp_url: Url,
    pub dehashed_url: Url,
    pub leaklookup_url: Url,
    pub breachdirectory_url: Url,
    pub leakcheck_url: Url,
    pub scatteredsecrets_url: Url,
    pub hashmob_url: Url,
    pub leakeddomains_url: Url,

    /// Hashmob refuses anonymous API calls. Unset means the source is skipped.
    pub hashmob_api_key: Option<String>,
}

impl Config {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let url = |key: &'static str, default: &str| parse_url(key, &get(key, default));
        let secs = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            parse_number(key, &get(key, &default.to_string())).map(Duration::from_secs)
        };

        let bypass_url = match lookup("BREACH_INDEX_BYPASS_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(parse_url("BREACH_INDEX_BYPASS_URL", &raw)?),
            None => None,
        };

        Ok(Config {
            output_dir: PathBuf::from(get("BREACH_INDEX_OUTPUT_DIR", "datasets")),
            readme_template: PathBuf::from(get("BREACH_INDEX_README_TEMPLATE", "README.tpl")),
            readme_path: PathBuf::from(get("BREACH_INDEX_README_PATH", "README.md")),

            user_agent: get("BREACH_INDEX_USER_AGENT", DESKTOP_USER_AGENT),
            http_timeout: secs("BREACH_INDEX_HTTP_TIMEOUT_SECS", 30)?,
            rate_limit_backoff: secs("BREACH_INDEX_RATE_LIMIT_BACKOFF_SECS", 5)?,
            rate_limit_max_attempts: parse_number::<u32>(
                "BREACH_INDEX_RATE_LIMIT_MAX_ATTEMPTS",
                &get("BREACH_INDEX_RATE_LIMIT_MAX_ATTEMPTS", "5"),
            )?
            .max(1),
            bypass_url,
            bypass_timeout: secs("BREACH_INDEX_BYPASS_TIMEOUT_SECS", 60)?,

            hibp_url: url(
                "BREACH_INDEX_HIBP_URL",
                "https://haveibeenpwned.com/api/v3/breaches",
            )?,
            dehashed_url: url("BREACH_INDEX_DEHASHED_URL", "https://dehashed.com/data")?,
            leaklookup_url: url(
                "BREACH_INDEX_LEAKLOOKUP_URL",
                "https://leak-lookup.com/breaches",
            )?,
            breachdirectory_url: url(
                "BREACH_INDEX_BREACHDIRECTORY_URL",
                "https://breachdirectory.org/breaches",
            )?,
            leakcheck_url: url(
                "BREACH_INDEX_LEAKCHECK_URL",
                "https://leakcheck.io/api/public/leaks",
            )?,
            scatteredsecrets_url: url(
                "BREACH_INDEX_SCATTEREDSECRETS_URL",
                "https://scatteredsecrets.com/breaches",
            )?,
            hashmob_url: url(
                "BREACH_INDEX_HASHMOB_URL",
                "https://hashmob.net/api/v2/hashlist",
            )?,
            leakeddomains_url: url(
                "BREACH_INDEX_LEAKEDDOMAINS_URL",
                "https://leaked.domains/Databases/",
            )?,
            hashmob_api_key: lookup("BREACH_INDEX_HASHMOB_API_KEY").filter(|k| !k.trim().is_empty()),
        })
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|reason| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        reason,
    })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}
