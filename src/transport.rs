use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::{GenError, Result};

/// Per-request options layered over the transport defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers. These win over the transport's defaults for the same name.
    pub headers: Vec<(String, String)>,
    /// Overrides the transport's request timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Merge header lists. Later lists take precedence; names compare case-insensitively.
fn merge_headers(defaults: &[(String, String)], overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .iter()
        .filter(|(name, _)| !overrides.iter().any(|(o, _)| o.eq_ignore_ascii_case(name)))
        .cloned()
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}

/// Thin JSON-over-HTTP wrapper shared by every backend.
///
/// Every failure is logged with the target URL. Response bodies of successful
/// calls are never logged.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    default_headers: Vec<(String, String)>,
    timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            default_headers: Vec::new(),
            timeout,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Add a header sent with every request unless the caller overrides it.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: &RequestOptions) -> Result<T> {
        let headers = merge_headers(&self.default_headers, &options.headers);
        let request = self.http.get(url);
        let result = self.execute(request, url, &headers, options).await;
        log_failure("GET", url, &result);
        result
    }

    pub async fn post<T, B>(&self, url: &str, body: &B, options: &RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let json_default = [("Content-Type".to_string(), "application/json".to_string())];
        let base = merge_headers(&self.default_headers, &json_default);
        let headers = merge_headers(&base, &options.headers);

        let result = match serde_json::to_vec(body) {
            Ok(bytes) => {
                let request = self.http.post(url).body(bytes);
                self.execute(request, url, &headers, options).await
            }
            Err(e) => Err(GenError::Json(e)),
        };
        log_failure("POST", url, &result);
        result
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        mut request: RequestBuilder,
        url: &str,
        headers: &[(String, String)],
        options: &RequestOptions,
    ) -> Result<T> {
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request
            .timeout(options.timeout.unwrap_or(self.timeout))
            .send()
            .await
            .map_err(|e| GenError::Network {
                context: format!("Cannot connect to {}", url),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenError::Request { status, body });
        }

        let text = resp.text().await.map_err(|e| GenError::Network {
            context: format!("Failed to read response from {}", url),
            source: e,
        })?;

        serde_json::from_str(&text).map_err(|source| GenError::ResponseParse {
            url: url.to_string(),
            source,
        })
    }
}

fn log_failure<T>(method: &str, url: &str, result: &Result<T>) {
    if let Err(e) = result {
        tracing::error!(method, url, error = %e, "API request failed");
    }
}
