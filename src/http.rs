// =============================================================================
// http.rs: ONE CLIENT, POLITE ABOUT 429
// =============================================================================
//
// Every source goes through `Fetcher`. It owns the single reqwest client for
// the run (browser User-Agent, timeout) and the one bit of retry logic the
// tool has: when an endpoint answers 429 we sleep `backoff * attempt` and
// ask again, up to the configured number of attempts.
//
// Pages behind bot protection can be routed through a FlareSolverr-style
// endpoint. It takes `{"cmd": "request.get", "url": ...}` and hands back the
// rendered HTML in `solution.response`.
// =============================================================================

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::ExtractError;

pub struct Fetcher {
    client: reqwest::Client,
    backoff: Duration,
    max_attempts: u32,
    bypass_url: Option<Url>,
    bypass_timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BypassRequest<'a> {
    cmd: &'static str,
    url: &'a str,
    max_timeout: u64,
}

#[derive(Deserialize)]
struct BypassResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<BypassSolution>,
}

#[derive(Deserialize)]
struct BypassSolution {
    #[serde(default)]
    status: u16,
    response: String,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            backoff: config.rate_limit_backoff,
            max_attempts: config.rate_limit_max_attempts.max(1),
            bypass_url: config.bypass_url.clone(),
            bypass_timeout: config.bypass_timeout,
        })
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &Url) -> Result<String, ExtractError> {
        self.send_with_backoff(url, || self.client.get(url.as_str()))
            .await?
            .text()
            .await
            .map_err(ExtractError::from)
    }

    /// GET `url` with extra headers and decode the body as JSON.
    pub async fn get_json<T>(&self, url: &Url, headers: HeaderMap) -> Result<T, ExtractError>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = self
            .send_with_backoff(url, || {
                self.client
                    .get(url.as_str())
                    .header(reqwest::header::ACCEPT, "application/json")
                    .headers(headers.clone())
            })
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch a page that sits behind bot protection.
    ///
    /// Goes through the bypass endpoint when one is configured, otherwise
    /// behaves like [`Fetcher::get_text`].
    pub async fn get_protected(&self, url: &Url) -> Result<String, ExtractError> {
        let Some(endpoint) = &self.bypass_url else {
            debug!(url = %url, "no bypass endpoint configured, fetching directly");
            return self.get_text(url).await;
        };

        let request = BypassRequest {
            cmd: "request.get",
            url: url.as_str(),
            max_timeout: u64::try_from(self.bypass_timeout.as_millis()).unwrap_or(u64::MAX),
        };

        debug!(url = %url, bypass = %endpoint, "fetching through bypass endpoint");
        let response = self
            .send_with_backoff(endpoint, || {
                // The endpoint drives a headless browser with its own
                // deadline. Ours has to outlast it.
                self.client
                    .post(endpoint.as_str())
                    .timeout(self.bypass_timeout + Duration::from_secs(10))
                    .json(&request)
            })
            .await?;

        let parsed: BypassResponse = serde_json::from_str(&response.text().await?)?;
        if parsed.status != "ok" {
            return Err(ExtractError::Bypass(parsed.message));
        }
        let solution = parsed
            .solution
            .ok_or_else(|| ExtractError::Bypass("response carried no solution".to_string()))?;
        if solution.status >= 400 {
            return Err(ExtractError::Status {
                url: url.to_string(),
                status: solution.status,
            });
        }
        Ok(solution.response)
    }

    /// Send the request built by `build`, retrying on 429 with a linear
    /// backoff. Any other non-success status is returned as an error.
    async fn send_with_backoff<F>(
        &self,
        url: &Url,
        build: F,
    ) -> Result<reqwest::Response, ExtractError>
    where
        F: Fn() -> RequestBuilder,
    {
        for attempt in 1..=self.max_attempts {
            let response = build().send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == self.max_attempts {
                    break;
                }
                let delay = self.backoff * attempt;
                warn!(
                    url = %url,
                    attempt = attempt,
                    delay_secs = delay.as_secs_f32(),
                    "rate limited (HTTP 429), backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(ExtractError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            if attempt > 1 {
                info!(url = %url, attempts = attempt, "rate limit cleared");
            }
            return Ok(response);
        }

        Err(ExtractError::RateLimited {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A config whose every endpoint points at `server`, with no backoff
    /// delay worth waiting for.
    pub(crate) fn test_config(server: &MockServer, extra: &[(&str, &str)]) -> Config {
        let base = server.uri();
        let mut map: HashMap<String, String> = [
            ("BREACH_INDEX_RATE_LIMIT_BACKOFF_SECS", "0".to_string()),
            ("BREACH_INDEX_RATE_LIMIT_MAX_ATTEMPTS", "3".to_string()),
            ("BREACH_INDEX_HIBP_URL", format!("{base}/api/v3/breaches")),
            ("BREACH_INDEX_DEHASHED_URL", format!("{base}/data")),
            ("BREACH_INDEX_LEAKLOOKUP_URL", format!("{base}/breaches")),
            ("BREACH_INDEX_BREACHDIRECTORY_URL", format!("{base}/bd")),
            ("BREACH_INDEX_LEAKCHECK_URL", format!("{base}/leaks")),
            ("BREACH_INDEX_SCATTEREDSECRETS_URL", format!("{base}/ss")),
            ("BREACH_INDEX_HASHMOB_URL", format!("{base}/hashlist")),
            ("BREACH_INDEX_LEAKEDDOMAINS_URL", format!("{base}/Databases/")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        for (k, v) in extra {
            map.insert(k.to_string(), v.to_string());
        }
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
            .mount(&server)
            .await;

        let config = test_config(&server, &[]);
        let fetcher = Fetcher::new(&config).unwrap();
        let body = fetcher.get_text(&config.dehashed_url).await.unwrap();
        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn test_retries_after_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hashlist"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hashlist"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let config = test_config(&server, &[]);
        let fetcher = Fetcher::new(&config).unwrap();
        let items: Vec<serde_json::Value> = fetcher
            .get_json(&config.hashmob_url, HeaderMap::new())
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hashlist"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let config = test_config(&server, &[]);
        let fetcher = Fetcher::new(&config).unwrap();
        let err = fetcher.get_text(&config.hashmob_url).await.unwrap_err();
        assert!(matches!(err, ExtractError::RateLimited { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/breaches"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server, &[]);
        let fetcher = Fetcher::new(&config).unwrap();
        let err = fetcher.get_text(&config.leaklookup_url).await.unwrap_err();
        assert!(matches!(err, ExtractError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_protected_page_goes_through_bypass() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({"cmd": "request.get"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "message": "",
                "solution": {"status": 200, "response": "<html>solved</html>"}
            })))
            .mount(&server)
            .await;

        let bypass = format!("{}/v1", server.uri());
        let config = test_config(&server, &[("BREACH_INDEX_BYPASS_URL", bypass.as_str())]);
        let fetcher = Fetcher::new(&config).unwrap();
        let body = fetcher.get_protected(&config.dehashed_url).await.unwrap();
        assert_eq!(body, "<html>solved</html>");
    }

    #[tokio::test]
    async fn test_bypass_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "message": "Challenge not solved"
            })))
            .mount(&server)
            .await;

        let bypass = format!("{}/v1", server.uri());
        let config = test_config(&server, &[("BREACH_INDEX_BYPASS_URL", bypass.as_str())]);
        let fetcher = Fetcher::new(&config).unwrap();
        let err = fetcher.get_protected(&config.dehashed_url).await.unwrap_err();
        assert!(matches!(err, ExtractError::Bypass(msg) if msg == "Challenge not solved"));
    }
}
