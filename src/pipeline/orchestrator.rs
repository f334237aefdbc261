use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::auth::TokenProvider;
use crate::config::credentials::{delegated_source, redact_credentials};
use crate::config::{AdvisorConfig, CollectionSettings, Service, TenantCredentials};
use crate::defender::{load_delegated, DefenderCollector, DefenderSnapshot};
use crate::entra::{EntraCollector, EntraSnapshot};
use crate::errors::AdvisorError;
use crate::insights::{DefenderInsights, EntraInsights};
use crate::models::Advisory;

/// Command-line overrides layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub tenant_id: Option<String>,
    pub services: Option<Vec<Service>>,
    pub defender_data: Option<String>,
}

/// Snapshot, insights and advisories of one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendReport<S, I> {
    pub snapshot: S,
    pub insights: I,
    pub advisories: Vec<Advisory>,
}

pub type DefenderReport = BackendReport<DefenderSnapshot, DefenderInsights>;
pub type EntraReport = BackendReport<EntraSnapshot, EntraInsights>;

#[derive(Debug, Clone, Serialize)]
pub struct TenantReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defender: Option<DefenderReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entra: Option<EntraReport>,
}

impl TenantReport {
    pub fn advisories(&self) -> impl Iterator<Item = &Advisory> {
        let defender = self.defender.iter().flat_map(|r| r.advisories.iter());
        let entra = self.entra.iter().flat_map(|r| r.advisories.iter());
        defender.chain(entra)
    }
}

pub fn tool_version() -> String {
    let git_hash = option_env!("GIT_HASH").unwrap_or("dev");
    format!("{} ({})", env!("CARGO_PKG_VERSION"), git_hash)
}

/// Runs every selected backend once against one tenant.
pub struct PostureOrchestrator {
    credentials: TenantCredentials,
    settings: CollectionSettings,
    services: Vec<Service>,
    delegated_source: Option<String>,
    authority: String,
}

impl PostureOrchestrator {
    pub fn new(config: &AdvisorConfig, options: RunOptions) -> Result<Self, AdvisorError> {
        let credentials = TenantCredentials::resolve(config, options.tenant_id.as_deref())?;
        let mut services = options.services.unwrap_or_else(|| config.services());
        services.sort();
        services.dedup();
        if services.is_empty() {
            return Err(AdvisorError::Config("At least one service must be selected".into()));
        }
        Ok(Self {
            credentials,
            settings: config.collection_settings(),
            services,
            delegated_source: delegated_source(config, options.defender_data.as_deref()),
            authority: config.authority(),
        })
    }

    /// Replace the effective collection settings, e.g. to point at a mock upstream.
    pub fn with_settings(mut self, settings: CollectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn tenant_id(&self) -> &str {
        &self.credentials.tenant_id
    }

    /// Collect with the credentials resolved from config and environment.
    pub async fn run(&self) -> Result<TenantReport, AdvisorError> {
        let secrets = self.credentials.secrets();
        let tokens = self
            .credentials
            .token_provider(&self.authority)
            .map_err(|e| redacted(e, &secrets))?;
        self.run_with(tokens.as_ref()).await.map_err(|e| redacted(e, &secrets))
    }

    pub async fn run_with(&self, tokens: &dyn TokenProvider) -> Result<TenantReport, AdvisorError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            tenant = %self.credentials.tenant_id,
            provider = tokens.provider_name(),
            services = ?self.services,
            "Starting posture collection"
        );

        let delegated = match (&self.delegated_source, self.wants(Service::Defender)) {
            (Some(source), true) => Some(load_delegated(source).await?),
            _ => None,
        };

        let (defender, entra) = tokio::join!(
            self.collect_defender(tokens, delegated),
            self.collect_entra(tokens),
        );

        let defender = defender
            .map(|snapshot| {
                let insights = DefenderInsights::from_snapshot(&snapshot);
                let advisories = insights.advisories()?;
                Ok::<_, AdvisorError>(BackendReport { snapshot, insights, advisories })
            })
            .transpose()?;
        let entra = entra
            .map(|snapshot| {
                let insights = EntraInsights::from_snapshot(&snapshot);
                let advisories = insights.advisories()?;
                Ok::<_, AdvisorError>(BackendReport { snapshot, insights, advisories })
            })
            .transpose()?;

        let report = TenantReport {
            run_id,
            generated_at: Utc::now(),
            tool_version: tool_version(),
            tenant_id: self.credentials.tenant_id.clone(),
            defender,
            entra,
        };
        info!(
            run_id = %report.run_id,
            advisories = report.advisories().count(),
            "Posture collection complete"
        );
        Ok(report)
    }

    fn wants(&self, service: Service) -> bool {
        self.services.contains(&service)
    }

    async fn collect_defender(&self, tokens: &dyn TokenProvider, delegated: Option<Value>) -> Option<DefenderSnapshot> {
        if !self.wants(Service::Defender) {
            return None;
        }
        let mut collector = DefenderCollector::new(tokens, &self.settings);
        if let Some(blob) = delegated {
            collector = collector.with_delegated(blob);
        }
        Some(collector.collect().await)
    }

    async fn collect_entra(&self, tokens: &dyn TokenProvider) -> Option<EntraSnapshot> {
        if !self.wants(Service::Entra) {
            return None;
        }
        Some(EntraCollector::new(tokens, &self.settings).collect().await)
    }
}

fn redacted(error: AdvisorError, secrets: &[&str]) -> AdvisorError {
    match error {
        AdvisorError::Authentication(m) => AdvisorError::Authentication(redact_credentials(&m, secrets)),
        AdvisorError::Network(m) => AdvisorError::Network(redact_credentials(&m, secrets)),
        other => other,
    }
}
