//! Canonical records for Graph Security and Defender for Endpoint payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::lenient_count;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityAlert {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityIncident {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecureScore {
    pub current_score: Option<f64>,
    pub max_score: Option<f64>,
    pub created_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlProfile {
    pub id: Option<String>,
    pub title: Option<String>,
    pub control_category: Option<String>,
    pub implementation_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskyUser {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub risk_level: Option<String>,
    pub risk_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskySignIn {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub risk_level_aggregated: Option<String>,
    pub risk_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OAuthGrant {
    pub client_id: Option<String>,
    pub resource_id: Option<String>,
    pub consent_type: Option<String>,
    /// Space-separated delegated scopes.
    pub scope: Option<String>,
}

impl OAuthGrant {
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }
}

/// Third-party application consents grouped by client id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OAuthApp {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub grants: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefenderIncident {
    pub incident_name: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Machine {
    pub id: Option<String>,
    pub computer_dns_name: Option<String>,
    pub os_platform: Option<String>,
    pub risk_score: Option<String>,
    pub exposure_level: Option<String>,
    pub software_inventory: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vulnerability {
    pub id: Option<String>,
    pub name: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailThreat {
    pub subject: Option<String>,
    pub recipient_email_address: Option<String>,
    /// A single string or a list, depending on the detection source.
    pub threat_type: Option<Value>,
}

impl EmailThreat {
    pub fn threat_text(&self) -> String {
        match &self.threat_type {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityRecommendation {
    pub id: Option<String>,
    pub recommendation_name: Option<String>,
    pub recommendation_category: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Software {
    pub id: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub number_of_weaknesses: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExposureScore {
    pub score: Option<f64>,
    pub time: Option<String>,
}

/// One summarized row of an advanced hunting query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HuntingRow {
    pub device_name: Option<String>,
    pub account_name: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_events: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub total_connections: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub unique_sensitive_files: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub phishing_attempts: Option<u64>,
}
