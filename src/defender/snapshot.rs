use serde::Serialize;

use crate::fanout::CollectionStatus;
use crate::metrics::Histogram;
use crate::models::defender::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total: u64,
    pub by_severity: Histogram,
    pub by_category: Histogram,
    pub copilot_related: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentSummary {
    pub total: u64,
    pub active: u64,
    pub resolved: u64,
    pub high_severity: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecureScoreSummary {
    pub current_score: f64,
    pub max_score: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlSummary {
    pub total: u64,
    pub implemented: u64,
    pub not_implemented: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlFocusSummary {
    pub identity_controls: u64,
    pub data_controls: u64,
    pub copilot_relevant: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskyUsersSummary {
    pub total: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub confirmed_compromised: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskySignInsSummary {
    pub total: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OAuthRiskSummary {
    pub total_apps: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub over_privileged: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefenderIncidentSummary {
    pub total: u64,
    pub in_progress: u64,
    pub new: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub total: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
    pub copilot_enabled: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VulnerabilitySummary {
    pub total: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HuntingSummary {
    pub suspicious_processes: u64,
    pub unusual_network_activity: u64,
    pub sensitive_file_access: u64,
    pub phishing_attempts: u64,
    /// Distinct devices per query, summed across queries.
    pub affected_devices: u64,
    /// Distinct accounts per query, summed across queries.
    pub affected_users: u64,
}

/// Raw rows of the four advanced hunting queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HuntingEvents {
    pub process_events: Vec<HuntingRow>,
    pub network_events: Vec<HuntingRow>,
    pub file_access_events: Vec<HuntingRow>,
    pub email_threats: Vec<HuntingRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailThreatSummary {
    pub total: u64,
    pub phishing: u64,
    pub malware: u64,
    pub spam: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationsSummary {
    pub total: u64,
    pub critical: u64,
    pub high: u64,
    pub copilot_related: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoftwareSummary {
    pub total_apps: u64,
    pub copilot_apps: u64,
    pub vulnerable_apps: u64,
}

/// Exposure level bands; lower scores are better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExposureLevel {
    #[default]
    Unknown,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl ExposureLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 30.0 {
            ExposureLevel::Low
        } else if score <= 60.0 {
            ExposureLevel::Medium
        } else {
            ExposureLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureLevel::Unknown => "Unknown",
            ExposureLevel::Low => "Low Risk",
            ExposureLevel::Medium => "Medium Risk",
            ExposureLevel::High => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExposureSummary {
    pub score: f64,
    pub level: ExposureLevel,
}

/// Everything gathered from Graph Security and the Defender API for one tenant.
///
/// Built empty, filled by one collection pass, then treated as read-only.
/// Every counter starts at zero so consumers only threshold-check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefenderSnapshot {
    pub available: bool,
    pub graph_security_available: bool,
    pub defender_api_available: bool,
    #[serde(flatten)]
    pub status: CollectionStatus,

    pub security_alerts: Vec<SecurityAlert>,
    pub alert_summary: AlertSummary,

    pub security_incidents: Vec<SecurityIncident>,
    pub incident_summary: IncidentSummary,

    pub secure_score: Option<SecureScore>,
    pub secure_score_summary: SecureScoreSummary,

    pub secure_score_controls: Vec<ControlProfile>,
    pub control_summary: ControlSummary,
    pub identity_controls: Vec<ControlProfile>,
    pub data_controls: Vec<ControlProfile>,
    pub control_focus_summary: ControlFocusSummary,

    pub risky_users: Vec<RiskyUser>,
    pub risky_users_summary: RiskyUsersSummary,

    pub risky_sign_ins: Vec<RiskySignIn>,
    pub risky_sign_ins_summary: RiskySignInsSummary,

    pub oauth_apps: Vec<OAuthApp>,
    pub oauth_risk_summary: OAuthRiskSummary,

    pub defender_incidents: Vec<DefenderIncident>,
    pub defender_incident_summary: DefenderIncidentSummary,

    pub defender_devices: Vec<Machine>,
    pub device_summary: DeviceSummary,

    pub defender_vulnerabilities: Vec<Vulnerability>,
    pub vulnerability_summary: VulnerabilitySummary,

    pub hunting_events: HuntingEvents,
    pub hunting_summary: HuntingSummary,

    pub email_threats: Vec<EmailThreat>,
    pub email_threat_summary: EmailThreatSummary,

    pub security_recommendations: Vec<SecurityRecommendation>,
    pub recommendations_summary: RecommendationsSummary,

    pub software_inventory: Vec<Software>,
    pub software_summary: SoftwareSummary,

    pub exposure_score: Option<ExposureScore>,
    pub exposure_summary: ExposureSummary,
}

impl DefenderSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn refresh_availability(&mut self) {
        self.available = self.graph_security_available || self.defender_api_available;
    }
}
