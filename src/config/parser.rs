use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::errors::AdvisorError;
use super::types::AdvisorConfig;
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;

static TENANT_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("tenant GUID pattern is valid")
});

static TENANT_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("tenant domain pattern is valid")
});

pub async fn parse_config(path: &Path) -> Result<AdvisorConfig, AdvisorError> {
    if !path.exists() {
        return Err(AdvisorError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(AdvisorError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<AdvisorConfig, AdvisorError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(AdvisorConfig::default());
    }

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: AdvisorConfig = serde_yaml::from_value(yaml)?;
    validate_semantics(&config)?;

    Ok(config)
}

/// True for a directory GUID or a verified domain such as `contoso.onmicrosoft.com`.
pub fn is_valid_tenant_id(tenant_id: &str) -> bool {
    TENANT_GUID.is_match(tenant_id) || TENANT_DOMAIN.is_match(tenant_id)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), AdvisorError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| AdvisorError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| AdvisorError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that deserialize but cannot drive a collection run.
pub fn validate_semantics(config: &AdvisorConfig) -> Result<(), AdvisorError> {
    if let Some(tenant_id) = config.tenant.as_ref().and_then(|t| t.tenant_id.as_deref()) {
        if !tenant_id.starts_with('$') && !is_valid_tenant_id(tenant_id) {
            return Err(AdvisorError::Config(format!(
                "Invalid tenant id '{}': expected a GUID or domain name",
                tenant_id
            )));
        }
    }

    if let Some(collection) = &config.collection {
        if collection.timeout_secs == Some(0) {
            return Err(AdvisorError::Config("collection.timeout_secs must be greater than 0".into()));
        }
        if collection.max_pages == Some(0) {
            return Err(AdvisorError::Config("collection.max_pages must be greater than 0".into()));
        }
        if collection.lookback_days.is_some_and(|d| d < 1) {
            return Err(AdvisorError::Config("collection.lookback_days must be at least 1".into()));
        }
        if collection.services.as_ref().is_some_and(|s| s.is_empty()) {
            return Err(AdvisorError::Config("collection.services must name at least one service".into()));
        }
    }

    if let Some(tenant) = &config.tenant {
        let has_id = tenant.client_id.as_ref().is_some_and(|v| !v.is_empty());
        let has_secret = tenant.client_secret.as_ref().is_some_and(|v| !v.is_empty());
        if has_id != has_secret && tenant.access_token.is_none() {
            warn!("Only one of client_id / client_secret configured; environment fallback will be used");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, Service};
    use std::io::Write;

    #[test]
    fn test_tenant_id_formats() {
        assert!(is_valid_tenant_id("72f988bf-86f1-41af-91ab-2d7cd011db47"));
        assert!(is_valid_tenant_id("contoso.onmicrosoft.com"));
        assert!(!is_valid_tenant_id("not a tenant"));
        assert!(!is_valid_tenant_id("72f988bf-86f1-41af"));
        assert!(!is_valid_tenant_id("localhost"));
    }

    #[test]
    fn test_full_config_parses() {
        let config = parse_config_str(
            "tenant:\n  tenant_id: contoso.onmicrosoft.com\n  client_id: $CLIENT_ID\n  client_secret: $CLIENT_SECRET\n\
             collection:\n  services: [entra]\n  timeout_secs: 10\n\
             output:\n  format: summary\n",
        ).unwrap();
        assert_eq!(config.services(), vec![Service::Entra]);
        assert_eq!(config.timeout_secs(), 10);
    }

    #[test]
    fn test_empty_file_is_default_config() {
        let config = parse_config_str("").unwrap();
        assert!(config.tenant.is_none());
    }

    #[test]
    fn test_invalid_tenant_rejected() {
        let err = parse_config_str("tenant:\n  tenant_id: 'bad tenant'\n").unwrap_err();
        assert!(matches!(err, AdvisorError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AdvisorConfig {
            collection: Some(CollectionConfig { timeout_secs: Some(0), ..Default::default() }),
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_empty_services_rejected() {
        let config = AdvisorConfig {
            collection: Some(CollectionConfig { services: Some(vec![]), ..Default::default() }),
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_unknown_service_fails_to_deserialize() {
        assert!(matches!(
            parse_config_str("collection:\n  services: [purview]\n"),
            Err(AdvisorError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tenant:\n  tenant_id: 72f988bf-86f1-41af-91ab-2d7cd011db47").unwrap();
        let config = parse_config(file.path()).await.unwrap();
        assert_eq!(
            config.tenant.unwrap().tenant_id.as_deref(),
            Some("72f988bf-86f1-41af-91ab-2d7cd011db47")
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = parse_config(Path::new("/nonexistent/posture.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
