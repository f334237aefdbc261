use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::auth::TokenProvider;
use crate::errors::{AdvisorError, UpstreamError};
use crate::fanout::Outcome;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_PAGES: usize = 20;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Upper bound on `@odata.nextLink` pages followed per collection.
    pub max_pages: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Bearer-authenticated JSON client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    max_pages: usize,
}

impl ApiClient {
    pub fn new(base_url: &str, bearer: &str, options: &ClientOptions) -> Result<Self, AdvisorError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|e| AdvisorError::Authentication(format!("Invalid access token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("ConsistencyLevel", HeaderValue::from_static("eventual"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|e| AdvisorError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages: options.max_pages.max(1),
        })
    }

    /// Acquire a token for `scope` and bind a client to `base_url`.
    pub async fn connect(
        tokens: &dyn TokenProvider,
        scope: &str,
        base_url: &str,
        options: &ClientOptions,
    ) -> Result<Self, AdvisorError> {
        let token = tokens.token(scope).await?;
        Self::new(base_url, &token.token, options)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn get_json(&self, path: &str) -> Outcome {
        let url = self.url(path);
        trace!(url = %url, "GET");
        let response = self.http.get(&url).send().await?;
        read_body(response).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Outcome {
        let url = self.url(path);
        trace!(url = %url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        read_body(response).await
    }

    /// GET a collection, following `@odata.nextLink`. Always yields `{"value": [...]}`.
    pub async fn get_collection(&self, path: &str) -> Outcome {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page = self.get_json(&url).await?;
            pages += 1;
            if let Some(values) = page.get("value").and_then(Value::as_array) {
                items.extend(values.iter().cloned());
            }
            next = page
                .get("@odata.nextLink")
                .and_then(Value::as_str)
                .map(str::to_string);
            if pages >= self.max_pages {
                if next.is_some() {
                    debug!(path, pages, "Page limit reached, truncating collection");
                }
                break;
            }
        }

        Ok(json!({ "value": items }))
    }
}

async fn read_body(response: reqwest::Response) -> Outcome {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(UpstreamError::http(status.as_u16(), error_message(&text)));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| UpstreamError::transport(format!("invalid JSON body: {e}")))
}

/// `code: message` from a Graph-style error envelope, else the raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error.and_then(|e| e.get("message")).and_then(Value::as_str);
    let code = error.and_then(|e| e.get("code")).and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message.to_string(),
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_graph_envelope() {
        let body = r#"{"error":{"code":"Forbidden","message":"Tenant is not provisioned"}}"#;
        assert_eq!(error_message(body), "Forbidden: Tenant is not provisioned");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
        assert_eq!(error_message(r#"{"error":{"message":"nope"}}"#), "nope");
    }

    #[test]
    fn test_url_joins_relative_and_keeps_absolute() {
        let client = ApiClient::new("https://graph.example/", "t", &ClientOptions::default()).unwrap();
        assert_eq!(client.url("/v1.0/users"), "https://graph.example/v1.0/users");
        assert_eq!(client.url("v1.0/users"), "https://graph.example/v1.0/users");
        assert_eq!(
            client.url("https://graph.example/v1.0/users?$skiptoken=x"),
            "https://graph.example/v1.0/users?$skiptoken=x"
        );
    }

    #[test]
    fn test_rejects_unprintable_token() {
        let err = ApiClient::new("https://graph.example", "bad\ntoken", &ClientOptions::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Authentication(_)));
    }
}
