//! REST Countries fetcher.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use quickquery_core::constants::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, NAME_ENDPOINT_PATH,
};
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_core::traits::RemoteFetcher;

/// Longest slice of an error body quoted back in `FetchFailed`.
const MAX_ERROR_BODY: usize = 200;

/// Fetcher configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// API root, e.g. "https://restcountries.com/"
    pub base_url: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Read timeout in seconds
    pub read_timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_seconds: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl FetchConfig {
    /// Creates config pointing at another API root.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Overrides both timeouts.
    pub fn with_timeouts(mut self, connect_seconds: u64, read_seconds: u64) -> Self {
        self.connect_timeout_seconds = connect_seconds;
        self.read_timeout_seconds = read_seconds;
        self
    }

    /// Parses and checks the base URL and timeouts.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            QuickQueryError::ConfigError(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(QuickQueryError::ConfigError(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }

        if self.connect_timeout_seconds == 0 || self.read_timeout_seconds == 0 {
            return Err(QuickQueryError::ConfigError(
                "timeouts must be greater than zero".into(),
            ));
        }

        Ok(url)
    }
}

/// Network tier backed by `reqwest`.
///
/// One attempt per call. Any retry policy lives with the caller.
pub struct HttpFetcher {
    base_url: Url,
    config: FetchConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher against the public REST Countries API.
    pub fn new() -> Result<Self> {
        Self::with_config(FetchConfig::default())
    }

    /// Creates a fetcher with the given config.
    pub fn with_config(config: FetchConfig) -> Result<Self> {
        let base_url = config.validate()?;

        let connect = Duration::from_secs(config.connect_timeout_seconds);
        let read = Duration::from_secs(config.read_timeout_seconds);

        let http_client = reqwest::Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            // Upper bound so a stalled handshake plus a stalled read still ends
            .timeout(connect + read)
            .user_agent(concat!("quickquery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuickQueryError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            config,
            http_client,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Builds `<base>/v3.1/name/{key}` with `key` as one encoded segment.
    pub fn endpoint(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QuickQueryError::ConfigError("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(NAME_ENDPOINT_PATH.split('/'))
            .push(key);
        Ok(url)
    }

    fn classify(&self, err: reqwest::Error) -> QuickQueryError {
        if err.is_timeout() {
            let seconds = if err.is_connect() {
                self.config.connect_timeout_seconds
            } else {
                self.config.read_timeout_seconds
            };
            QuickQueryError::Timeout { seconds }
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_decode() {
            QuickQueryError::TransportFailure(err.to_string())
        } else {
            QuickQueryError::FetchFailed(err.to_string())
        }
    }
}

/// Validates a success body and re-serializes it compactly.
///
/// An empty body, `null`, or `[]` carries no records.
fn normalize_payload(body: &str) -> Result<String> {
    if body.trim().is_empty() {
        return Err(QuickQueryError::EmptyResult);
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| QuickQueryError::FetchFailed(format!("malformed response body: {}", e)))?;

    match &value {
        serde_json::Value::Null => Err(QuickQueryError::EmptyResult),
        serde_json::Value::Array(items) if items.is_empty() => Err(QuickQueryError::EmptyResult),
        _ => Ok(serde_json::to_string(&value)?),
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, key: &str) -> Result<String> {
        let url = self.endpoint(key)?;
        debug!(%url, "Fetching from network");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    debug!(%status, error = %e, "Failed to read error response body");
                    String::new()
                }
            };
            let detail: String = text.trim().chars().take(MAX_ERROR_BODY).collect();
            warn!(%status, "Network request failed");
            return Err(QuickQueryError::FetchFailed(if detail.is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, detail)
            }));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let payload = normalize_payload(&body)?;

        debug!(bytes = payload.len(), "Fetched from network");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        HttpFetcher::with_config(FetchConfig::new(server.uri())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.base_url, "https://restcountries.com/");
        assert_eq!(config.connect_timeout_seconds, 30);
        assert_eq!(config.read_timeout_seconds, 30);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_config_validation() {
        assert_err!(FetchConfig::new("not a url").validate());
        assert_err!(FetchConfig::new("ftp://example.com/").validate());
        assert_err!(FetchConfig::default().with_timeouts(0, 30).validate());
    }

    #[test]
    fn test_endpoint_encoding() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(
            fetcher.endpoint("france").unwrap().as_str(),
            "https://restcountries.com/v3.1/name/france"
        );
        assert_eq!(
            fetcher.endpoint("united states").unwrap().as_str(),
            "https://restcountries.com/v3.1/name/united%20states"
        );
        assert_eq!(
            fetcher.endpoint("a/b").unwrap().as_str(),
            "https://restcountries.com/v3.1/name/a%2Fb"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let fetcher =
            HttpFetcher::with_config(FetchConfig::new("http://localhost:8080/proxy/")).unwrap();
        assert_eq!(
            fetcher.endpoint("peru").unwrap().as_str(),
            "http://localhost:8080/proxy/v3.1/name/peru"
        );
    }

    #[test]
    fn test_normalize_payload() {
        assert_eq!(
            normalize_payload("[ {\"cca2\" : \"FR\"} ]\n").unwrap(),
            r#"[{"cca2":"FR"}]"#
        );
        assert!(matches!(normalize_payload(""), Err(QuickQueryError::EmptyResult)));
        assert!(matches!(normalize_payload("  \n"), Err(QuickQueryError::EmptyResult)));
        assert!(matches!(normalize_payload("null"), Err(QuickQueryError::EmptyResult)));
        assert!(matches!(normalize_payload("[]"), Err(QuickQueryError::EmptyResult)));
        assert!(matches!(
            normalize_payload("<html>"),
            Err(QuickQueryError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3.1/name/france"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": { "common": "France" }, "cca2": "FR" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let payload = fetcher_for(&server).fetch("france").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value[0]["cca2"], "FR");
    }

    #[tokio::test]
    async fn test_fetch_encodes_spaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3.1/name/united%20kingdom"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"cca2":"GB"}]"#))
            .mount(&server)
            .await;

        assert_ok!(fetcher_for(&server).fetch("united kingdom").await);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"{"status":404,"message":"Not Found"}"#),
            )
            .mount(&server)
            .await;

        match fetcher_for(&server).fetch("atlantis").await {
            Err(QuickQueryError::FetchFailed(detail)) => {
                assert!(detail.contains("404"));
                assert!(detail.contains("Not Found"));
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_error_status_with_truncated_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises 100 body bytes, sends 5, then hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 100\r\n\r\nshort",
                )
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let fetcher = HttpFetcher::with_config(
            FetchConfig::new(format!("http://{}/", addr)).with_timeouts(2, 2),
        )
        .unwrap();

        match fetcher.fetch("france").await {
            Err(QuickQueryError::FetchFailed(detail)) => {
                assert_eq!(detail, "HTTP 503 Service Unavailable");
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch("france").await.unwrap_err();
        assert!(matches!(err, QuickQueryError::EmptyResult));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch("france").await.unwrap_err();
        assert!(matches!(err, QuickQueryError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"cca2":"FR"}]"#)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher =
            HttpFetcher::with_config(FetchConfig::new(server.uri()).with_timeouts(1, 1)).unwrap();
        let err = fetcher.fetch("france").await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Nothing listens on the discard port
        let fetcher =
            HttpFetcher::with_config(FetchConfig::new("http://127.0.0.1:9/").with_timeouts(2, 2))
                .unwrap();
        let err = fetcher.fetch("france").await.unwrap_err();
        assert!(
            matches!(err, QuickQueryError::TransportFailure(_) | QuickQueryError::Timeout { .. }),
            "got {:?}",
            err
        );
    }
}
