//! Shared HTTP client for every request the resolver and pager issue.
//!
//! One `reqwest::Client` per session carries the browser User-Agent, the
//! connect/read timeout pair, a cookie store and the optional proxy.
//! Responses are mapped to [`ResolveError`]: 404 becomes `NotFound`, other
//! failure statuses and transport errors become `Transient`, and deadline
//! hits become `Timeout`.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, Proxy, RequestBuilder};
use tracing::{debug, instrument};

use crate::user_agent;

use super::ResolveError;

/// Default connect timeout (3.05 s).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3050);

/// Default read timeout (9.05 s).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(9050);

/// Network settings applied to every outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// TCP/TLS connect deadline.
    pub connect_timeout: Duration,
    /// Deadline between reads of the response.
    pub read_timeout: Duration,
    /// Optional `host:port` proxy for both http and https traffic.
    pub proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            proxy: None,
        }
    }
}

/// Normalizes a proxy setting into a proxy URL.
///
/// Bare `host:port` values are treated as plain HTTP proxies. Blank values
/// disable the proxy.
#[must_use]
pub fn proxy_url(proxy: &str) -> Option<String> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        None
    } else if proxy.contains("://") {
        Some(proxy.to_string())
    } else {
        Some(format!("http://{proxy}"))
    }
}

/// HTTP client wrapper used by the resolver, thumbnails and gallery pager.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: Client,
}

impl PageClient {
    /// Builds a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Transient`] if the proxy is malformed or the
    /// client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, ResolveError> {
        let mut builder = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .user_agent(user_agent::default_user_agent())
            .cookie_store(true)
            .gzip(true);

        if let Some(url) = settings.proxy.as_deref().and_then(proxy_url) {
            let proxy = Proxy::all(&url).map_err(|e| {
                ResolveError::transient(url.clone(), format!("invalid proxy: {e}"))
            })?;
            debug!(proxy = %url, "using proxy for all requests");
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            ResolveError::transient("<client>", format!("HTTP client construction failed: {e}"))
        })?;
        Ok(Self { client })
    }

    /// GETs `url` and returns the body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for 404, other failure statuses, transport
    /// errors and timeouts.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, ResolveError> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        send(request, url).await
    }

    /// POSTs the item view form to `url`.
    ///
    /// The body is `op=view&id={identifier}&pre=1&{field}=1`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    #[instrument(level = "debug", skip(self))]
    pub async fn post_view_form(
        &self,
        url: &str,
        referer: Option<&str>,
        identifier: &str,
        field: &str,
    ) -> Result<Vec<u8>, ResolveError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(view_form_body(identifier, field));
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        send(request, url).await
    }
}

/// Encodes the view form body.
#[must_use]
pub fn view_form_body(identifier: &str, field: &str) -> String {
    format!(
        "op=view&id={}&pre=1&{}=1",
        urlencoding::encode(identifier),
        urlencoding::encode(field)
    )
}

async fn send(request: RequestBuilder, url: &str) -> Result<Vec<u8>, ResolveError> {
    let response = request
        .send()
        .await
        .map_err(|e| ResolveError::from_request(url, &e))?;

    let status = response.status();
    if status.as_u16() == 404 {
        debug!(url, "404 response");
        return Err(ResolveError::not_found(url));
    }
    if !status.is_success() {
        return Err(ResolveError::transient(
            url,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ResolveError::from_request(url, &e))?;
        body.extend_from_slice(&chunk);
    }
    debug!(url, bytes = body.len(), "response received");
    Ok(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_url_normalization() {
        assert_eq!(proxy_url("10.0.0.1:3128").as_deref(), Some("http://10.0.0.1:3128"));
        assert_eq!(
            proxy_url("socks5://127.0.0.1:9050").as_deref(),
            Some("socks5://127.0.0.1:9050")
        );
        assert_eq!(proxy_url("   "), None);
    }

    #[test]
    fn test_view_form_body_layout() {
        assert_eq!(
            view_form_body("abc123", "f00dcafe"),
            "op=view&id=abc123&pre=1&f00dcafe=1"
        );
    }

    #[test]
    fn test_view_form_body_encodes_values() {
        assert_eq!(view_form_body("a b", "x&y"), "op=view&id=a%20b&pre=1&x%26y=1");
    }

    #[test]
    fn test_default_settings_timeouts() {
        let settings = HttpSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_millis(3050));
        assert_eq!(settings.read_timeout, Duration::from_millis(9050));
        assert!(settings.proxy.is_none());
    }

    #[test]
    fn test_client_builds_with_proxy() {
        let settings = HttpSettings {
            proxy: Some("127.0.0.1:8080".to_string()),
            ..HttpSettings::default()
        };
        assert!(PageClient::new(&settings).is_ok());
    }
}
