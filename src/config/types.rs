use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::upstream::{ClientOptions, DEFENDER_BASE_URL, GRAPH_BASE_URL};
use crate::auth::client_secret::DEFAULT_AUTHORITY;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AdvisorConfig {
    pub tenant: Option<TenantConfig>,
    pub collection: Option<CollectionConfig>,
    pub endpoints: Option<EndpointConfig>,
    pub delegated: Option<DelegatedConfig>,
    pub output: Option<OutputConfig>,
}

/// App registration used for client-credential auth. Values may be `$ENV` references.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TenantConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-acquired bearer token; bypasses client-credential auth when set.
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CollectionConfig {
    pub services: Option<Vec<Service>>,
    pub timeout_secs: Option<u64>,
    pub max_pages: Option<usize>,
    pub lookback_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EndpointConfig {
    pub graph: Option<String>,
    pub defender: Option<String>,
    pub authority: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DelegatedConfig {
    /// Inline JSON or a path to delegated Defender data.
    pub defender_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Defender,
    Entra,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Defender, Service::Entra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defender => "defender",
            Self::Entra => "entra",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Defender => "Microsoft Defender",
            Self::Entra => "Microsoft Entra",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Summary,
}

/// Effective collection parameters after defaults are applied.
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub graph_base_url: String,
    pub defender_base_url: String,
    pub lookback_days: i64,
    pub client: ClientOptions,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        AdvisorConfig::default().collection_settings()
    }
}

impl AdvisorConfig {
    pub fn services(&self) -> Vec<Service> {
        let mut services = self
            .collection
            .as_ref()
            .and_then(|c| c.services.clone())
            .unwrap_or_else(|| Service::ALL.to_vec());
        services.sort();
        services.dedup();
        services
    }

    pub fn timeout_secs(&self) -> u64 {
        self.collection.as_ref().and_then(|c| c.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn authority(&self) -> String {
        self.endpoints
            .as_ref()
            .and_then(|e| e.authority.clone())
            .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string())
    }

    pub fn collection_settings(&self) -> CollectionSettings {
        let collection = self.collection.clone().unwrap_or_default();
        let endpoints = self.endpoints.clone().unwrap_or_default();
        CollectionSettings {
            graph_base_url: endpoints.graph.unwrap_or_else(|| GRAPH_BASE_URL.to_string()),
            defender_base_url: endpoints.defender.unwrap_or_else(|| DEFENDER_BASE_URL.to_string()),
            lookback_days: collection.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS),
            client: ClientOptions {
                timeout: Duration::from_secs(self.timeout_secs()),
                max_pages: collection.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
            },
        }
    }
}
