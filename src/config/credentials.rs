use tracing::debug;

use crate::auth::{ClientSecretCredential, StaticToken, TokenProvider};
use crate::errors::AdvisorError;
use super::types::AdvisorConfig;

pub const TENANT_ID_ENV: &str = "TENANT_ID";
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "ACCESS_TOKEN";
pub const DEFENDER_DATA_ENV: &str = "DEFENDER_DATA";

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

/// Redact sensitive values in a string. Replaces known credential patterns
/// with [REDACTED].
pub fn redact_credentials(text: &str, secrets: &[&str]) -> String {
    let mut result = text.to_string();
    for secret in secrets {
        if !secret.is_empty() && secret.len() >= 4 {
            result = result.replace(secret, "[REDACTED]");
        }
    }
    result
}

/// Config value first (resolved), then the fallback environment variable.
fn configured_or_env(value: Option<&String>, env: &str) -> Option<String> {
    value
        .map(|v| resolve_credential(v))
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
}

#[derive(Clone, Default)]
pub struct TenantCredentials {
    pub tenant_id: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TenantCredentials {
    /// Build from config, letting `tenant_override` win over both config and env.
    pub fn resolve(config: &AdvisorConfig, tenant_override: Option<&str>) -> Result<Self, AdvisorError> {
        let tenant = config.tenant.clone().unwrap_or_default();
        let tenant_id = tenant_override
            .map(str::to_string)
            .or_else(|| configured_or_env(tenant.tenant_id.as_ref(), TENANT_ID_ENV))
            .ok_or_else(|| AdvisorError::Config(format!(
                "Tenant id missing: set tenant.tenant_id, --tenant-id or {}",
                TENANT_ID_ENV
            )))?;

        Ok(Self {
            tenant_id,
            client_id: configured_or_env(tenant.client_id.as_ref(), CLIENT_ID_ENV),
            client_secret: configured_or_env(tenant.client_secret.as_ref(), CLIENT_SECRET_ENV),
            access_token: configured_or_env(tenant.access_token.as_ref(), ACCESS_TOKEN_ENV),
        })
    }

    pub fn secrets(&self) -> Vec<&str> {
        [self.client_secret.as_deref(), self.access_token.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// A static token when one is configured, else the client-credential flow.
    pub fn token_provider(&self, authority: &str) -> Result<Box<dyn TokenProvider>, AdvisorError> {
        if let Some(token) = &self.access_token {
            debug!("Using pre-acquired access token");
            return Ok(Box::new(StaticToken::new(token.clone())));
        }
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Ok(Box::new(
                ClientSecretCredential::new(&self.tenant_id, id, secret).with_authority(authority),
            )),
            _ => Err(AdvisorError::Authentication(format!(
                "No credentials: set tenant.client_id/client_secret ({}/{}) or {}",
                CLIENT_ID_ENV, CLIENT_SECRET_ENV, ACCESS_TOKEN_ENV
            ))),
        }
    }
}

/// Delegated Defender data source: explicit value, then config, then `DEFENDER_DATA`.
pub fn delegated_source(config: &AdvisorConfig, explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| {
            configured_or_env(
                config.delegated.as_ref().and_then(|d| d.defender_data.as_ref()),
                DEFENDER_DATA_ENV,
            )
        })
}
