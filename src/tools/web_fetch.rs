use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::tools::Tool;

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// First backoff delay, doubled on every retry
    pub retry_delay_ms: u64,
    /// Upper bound for a single backoff delay
    pub max_retry_delay_ms: u64,
    /// Bytes of body read before the page is truncated
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_retries: 2,
            retry_delay_ms: 500,
            max_retry_delay_ms: 10_000,
            max_body_bytes: 2 * 1024 * 1024,
            user_agent: concat!("content-crew/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    /// Backoff before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_retry_delay_ms);
        Duration::from_millis(delay)
    }
}

/// A decoded response body
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub body: String,
    /// Set when the body was cut at `max_body_bytes`
    pub truncated: bool,
}

/// Fetches a URL and returns the visible text of the page.
pub struct WebContentFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl WebContentFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ToolError::NetworkFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn parse_url(input: &str) -> Result<Url, ToolError> {
        let url = Url::parse(input.trim())
            .map_err(|e| ToolError::InvalidInput(format!("'{input}' is not a URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ToolError::InvalidInput(format!(
                "unsupported URL scheme '{other}'"
            ))),
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, (ToolError, bool)> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| (ToolError::NetworkFailure(describe_request_error(&e)), true))?;

        let status = response.status();
        if !status.is_success() {
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            return Err((
                ToolError::NetworkFailure(format!("GET {url} returned {status}")),
                retryable,
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let limit = self.config.max_body_bytes;
        let mut bytes = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| (ToolError::NetworkFailure(describe_request_error(&e)), true))?
        {
            let room = limit.saturating_sub(bytes.len());
            if chunk.len() > room {
                bytes.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = decode_body(&bytes, content_type.as_deref(), truncated).map_err(|reason| {
            (ToolError::ParseFailure(format!("body of {url} {reason}")), false)
        })?;
        Ok(FetchedPage { body, truncated })
    }

    /// GET the page, retrying transient failures a bounded number of times
    pub async fn fetch(&self, input: &str) -> Result<FetchedPage, ToolError> {
        let url = Self::parse_url(input)?;
        let mut attempt = 0;

        let page = loop {
            match self.fetch_once(&url).await {
                Ok(page) => break page,
                Err((err, true)) if attempt < self.config.max_retries => {
                    let delay = self.config.delay_for(attempt);
                    warn!(url = %url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %err, "Retrying fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err((err, _)) => return Err(err),
            }
        };

        debug!(url = %url, bytes = page.body.len(), truncated = page.truncated, "Fetched page");
        Ok(page)
    }
}

/// `charset` parameter of a Content-Type header value
fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decode `bytes` using the declared charset, or UTF-8 when none is declared.
/// A byte order mark overrides the header. Malformed input is rejected unless
/// the body was truncated, where a split trailing character is expected.
fn decode_body(bytes: &[u8], content_type: Option<&str>, truncated: bool) -> Result<String, String> {
    let declared = match content_type.and_then(charset_of) {
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| format!("declares unsupported charset '{label}'"))?,
        None => UTF_8,
    };
    let (encoding, payload) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared, bytes),
    };

    if truncated {
        return Ok(encoding.decode_without_bom_handling(payload).0.into_owned());
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(payload)
        .map(Cow::into_owned)
        .ok_or_else(|| format!("is not valid {}", encoding.name()))
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect: {err}")
    } else {
        err.to_string()
    }
}

/// Concatenate all text nodes of an HTML document in document order, skipping
/// script and style contents.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }

    text.trim().to_string()
}

#[async_trait]
impl Tool for WebContentFetcher {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Used to process content found on the internet. Takes a URL and returns the visible text of the page."
    }

    fn input_name(&self) -> &str {
        "url"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let page = self.fetch(input).await?;
        let text = extract_visible_text(&page.body);
        if text.is_empty() {
            return Ok(format!("(no visible text found at {})", input.trim()));
        }
        if page.truncated {
            return Ok(format!(
                "{text}\n\n(page truncated after {} bytes)",
                self.config.max_body_bytes
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_server::{CannedResponse, StubServer};
    use tokio_test::assert_err;

    fn fetcher() -> WebContentFetcher {
        fetcher_with(FetchConfig {
            timeout_ms: 2_000,
            max_retries: 0,
            retry_delay_ms: 1,
            ..FetchConfig::default()
        })
    }

    fn fetcher_with(config: FetchConfig) -> WebContentFetcher {
        WebContentFetcher::new(config).unwrap()
    }

    fn retrying(max_retries: u32) -> WebContentFetcher {
        fetcher_with(FetchConfig {
            timeout_ms: 2_000,
            max_retries,
            retry_delay_ms: 1,
            ..FetchConfig::default()
        })
    }

    #[test]
    fn test_extracts_text_in_document_order() {
        let html = r#"<html><head><title>Match report</title><style>p { color: red }</style></head>
            <body><h1>Real Madrid 3</h1><p>Barcelona <b>2</b></p><script>track()</script></body></html>"#;
        let text = extract_visible_text(html);
        assert!(text.starts_with("Match report"));
        assert!(text.contains("Real Madrid 3"));
        assert!(text.contains("Barcelona 2"));
        assert!(!text.contains("track()"));
        assert!(!text.contains("color: red"));
        assert!(text.find("Real Madrid").unwrap() < text.find("Barcelona").unwrap());
    }

    #[test]
    fn test_malformed_html_still_yields_text() {
        assert_eq!(extract_visible_text("<p>unclosed <div>tags"), "unclosed tags");
        assert_eq!(extract_visible_text(""), "");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_failure() {
        let err = fetcher().invoke("http://unreachable").await.unwrap_err();
        assert!(matches!(err, ToolError::NetworkFailure(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_rejects_non_http_input() {
        let err = fetcher().invoke("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = fetcher().invoke("not a url").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_advertises_url_argument() {
        let spec = fetcher().spec();
        assert_eq!(spec.name, "web_fetch");
        assert_eq!(spec.parameters["required"][0], "url");
    }

    #[tokio::test]
    async fn test_declared_charset_is_decoded() {
        let server = StubServer::start(vec![CannedResponse::new(
            200,
            b"<p>Atl\xE9tico gan\xF3</p>".to_vec(),
        )
        .with_content_type("text/html; charset=ISO-8859-1")])
        .await;

        let text = fetcher().invoke(&server.url).await.unwrap();
        assert_eq!(text, "Atlético ganó");
    }

    #[tokio::test]
    async fn test_undeclared_charset_defaults_to_utf8() {
        let server = StubServer::start(vec![CannedResponse::new(
            200,
            "<p>Vinícius</p>".as_bytes().to_vec(),
        )
        .without_content_type()])
        .await;

        assert_eq!(fetcher().invoke(&server.url).await.unwrap(), "Vinícius");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_parse_failure() {
        let server = StubServer::start(vec![CannedResponse::new(200, b"<p>\xC3\x28</p>".to_vec())]).await;
        let err = retrying(2).invoke(&server.url).await.unwrap_err();
        assert!(matches!(err, ToolError::ParseFailure(_)), "got {err:?}");
        assert_eq!(server.hits(), 1);

        let server = StubServer::start(vec![CannedResponse::new(200, "<p>hola</p>")
            .with_content_type("text/html; charset=klingon")])
        .await;
        let err = fetcher().invoke(&server.url).await.unwrap_err();
        assert!(matches!(err, ToolError::ParseFailure(msg) if msg.contains("klingon")));
    }

    #[tokio::test]
    async fn test_client_errors_fail_without_retry() {
        let server = StubServer::start(vec![CannedResponse::new(404, "gone")]).await;
        let err = retrying(3).invoke(&server.url).await.unwrap_err();
        assert!(matches!(err, ToolError::NetworkFailure(msg) if msg.contains("404")));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let server = StubServer::start(vec![
            CannedResponse::new(503, "busy"),
            CannedResponse::new(500, "oops"),
            CannedResponse::new(200, "<p>Full time</p>"),
        ])
        .await;

        assert_eq!(retrying(2).invoke(&server.url).await.unwrap(), "Full time");
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let server = StubServer::start(vec![CannedResponse::new(429, "slow down")]).await;
        let err = retrying(2).invoke(&server.url).await.unwrap_err();
        assert!(matches!(err, ToolError::NetworkFailure(msg) if msg.contains("429")));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_many_retries_do_not_overflow_backoff() {
        let server = StubServer::start(vec![CannedResponse::new(503, "down")]).await;
        let fetcher = fetcher_with(FetchConfig {
            timeout_ms: 2_000,
            max_retries: 70,
            retry_delay_ms: 0,
            ..FetchConfig::default()
        });

        let err = assert_err!(fetcher.invoke(&server.url).await);
        assert!(matches!(err, ToolError::NetworkFailure(_)));
        assert_eq!(server.hits(), 71);
    }

    #[test]
    fn test_backoff_doubles_and_saturates_at_cap() {
        let config = FetchConfig {
            retry_delay_ms: 100,
            max_retry_delay_ms: 1_000,
            ..FetchConfig::default()
        };
        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(400));
        assert_eq!(config.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(config.delay_for(200), Duration::from_millis(1_000));

        let huge = FetchConfig {
            retry_delay_ms: u64::MAX,
            ..FetchConfig::default()
        };
        assert_eq!(huge.delay_for(70), Duration::from_millis(huge.max_retry_delay_ms));
    }

    #[tokio::test]
    async fn test_oversized_body_is_truncated_with_note() {
        let body = format!("<p>{}</p>", "gol ".repeat(10_000));
        let server = StubServer::start(vec![CannedResponse::new(200, body)]).await;
        let fetcher = fetcher_with(FetchConfig {
            timeout_ms: 2_000,
            max_retries: 0,
            max_body_bytes: 64,
            ..FetchConfig::default()
        });

        let page = fetcher.fetch(&server.url).await.unwrap();
        assert!(page.truncated);
        assert!(page.body.len() <= 64);

        let text = fetcher.invoke(&server.url).await.unwrap();
        assert!(text.starts_with("gol gol"));
        assert!(text.ends_with("(page truncated after 64 bytes)"));
    }

    #[test]
    fn test_truncation_tolerates_split_character() {
        let bytes = "<p>ganó".as_bytes();
        let cut = &bytes[..bytes.len() - 1];
        assert!(decode_body(cut, None, false).is_err());
        assert!(decode_body(cut, None, true).unwrap().starts_with("<p>gan"));
    }

    #[test]
    fn test_charset_parameter_parsing() {
        assert_eq!(charset_of("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_of("text/html;Charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_of("text/html"), None);
    }
}
