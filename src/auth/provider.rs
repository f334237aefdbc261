use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::errors::AdvisorError;

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { token: token.into(), expires_at }
    }

    /// True while the token has more than `margin` left.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        self.expires_at - margin > Utc::now()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Bearer token for `scope`, e.g. `https://graph.microsoft.com/.default`.
    async fn token(&self, scope: &str) -> Result<AccessToken, AdvisorError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

/// A fixed bearer token, returned for every scope.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self, _scope: &str) -> Result<AccessToken, AdvisorError> {
        if self.token.is_empty() {
            return Err(AdvisorError::Authentication("Static token is empty".into()));
        }
        Ok(AccessToken::new(self.token.clone(), Utc::now() + Duration::hours(1)))
    }

    fn provider_name(&self) -> &str {
        "static"
    }
}
