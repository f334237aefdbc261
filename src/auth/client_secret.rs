use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::errors::AdvisorError;
use super::claims;
use super::provider::{AccessToken, TokenProvider};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Seconds before expiry at which a cached token is refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// OAuth2 client-credentials flow against the Microsoft identity platform.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: DashMap<String, AccessToken>,
}

impl ClientSecretCredential {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            cache: DashMap::new(),
        }
    }

    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken, AdvisorError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let resp = self.http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| AdvisorError::Network(format!("Token request failed: {}", e)))?;

        let status = resp.status();
        let body = resp.text().await
            .map_err(|e| AdvisorError::Network(format!("Failed to read token response: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or(body);
            return Err(AdvisorError::Authentication(format!(
                "Token request for {} rejected (HTTP {}): {}",
                scope,
                status.as_u16(),
                crate::utils::truncation::truncate_setup_error(&detail)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AdvisorError::Authentication(format!("Malformed token response: {}", e)))?;
        let lifetime = Duration::seconds(parsed.expires_in.unwrap_or(3600));

        debug!(scope, roles = ?claims::roles(&parsed.access_token), "Acquired access token");
        Ok(AccessToken::new(parsed.access_token, Utc::now() + lifetime))
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken, AdvisorError> {
        let margin = Duration::seconds(REFRESH_MARGIN_SECS);
        if let Some(cached) = self.cache.get(scope) {
            if cached.is_fresh(margin) {
                return Ok(cached.clone());
            }
        }

        let token = self.request_token(scope).await?;
        self.cache.insert(scope.to_string(), token.clone());
        Ok(token)
    }

    fn provider_name(&self) -> &str {
        "client_secret"
    }
}
