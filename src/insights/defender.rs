use serde::Serialize;

use crate::defender::DefenderSnapshot;
use crate::errors::AdvisorError;
use crate::models::Advisory;
use super::{AdvisoryTemplate, Concern};

pub const SERVICE: &str = "Defender";

const OAUTH: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Microsoft Defender for Cloud Apps",
    base: "Microsoft Defender for Cloud Apps is active, protecting Copilot workloads",
    clean: "No high-risk OAuth apps detected",
    link_text: "Cloud Apps",
    link_url: "https://learn.microsoft.com/defender-cloud-apps/what-is-defender-for-cloud-apps",
};

const EMAIL_THREATS: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Microsoft Defender for Office 365",
    base: "Microsoft Defender for Office 365 is active, protecting Copilot workloads",
    clean: "No email threats detected in last 30 days",
    link_text: "Defender for Office 365",
    link_url: "https://learn.microsoft.com/microsoft-365/security/office-365-security/mdo-about",
};

const INCIDENTS: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Microsoft Defender XDR",
    base: "Microsoft Defender XDR is active, protecting Copilot workloads",
    clean: "No security incidents detected",
    link_text: "Defender XDR",
    link_url: "https://learn.microsoft.com/microsoft-365/security/defender/",
};

const IDENTITY: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Microsoft Defender for Identity",
    base: "Microsoft Defender for Identity is active, protecting Copilot workloads",
    clean: "No risky users or sign-ins detected",
    link_text: "Defender for Identity",
    link_url: "https://learn.microsoft.com/defender-for-identity/what-is",
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefenderInsights {
    pub available: bool,
    pub oauth: Concern,
    pub email_threats: Concern,
    pub incidents: Concern,
    pub identity: Concern,
}

impl DefenderInsights {
    pub fn from_snapshot(snapshot: &DefenderSnapshot) -> Self {
        if !snapshot.available {
            return Self::default();
        }
        Self {
            available: true,
            oauth: oauth(snapshot),
            email_threats: email_threats(snapshot),
            incidents: incidents(snapshot),
            identity: identity(snapshot),
        }
    }

    pub fn has_oauth_risks(&self) -> bool {
        self.oauth.has_findings()
    }

    pub fn has_email_threats(&self) -> bool {
        self.email_threats.has_findings()
    }

    pub fn has_incidents(&self) -> bool {
        self.incidents.has_findings()
    }

    pub fn has_identity_risks(&self) -> bool {
        self.identity.has_findings()
    }

    /// One advisory per concern; nothing when Defender was unreachable.
    pub fn advisories(&self) -> Result<Vec<Advisory>, AdvisorError> {
        if !self.available {
            return Ok(Vec::new());
        }
        [
            (&self.incidents, &INCIDENTS),
            (&self.identity, &IDENTITY),
            (&self.oauth, &OAUTH),
            (&self.email_threats, &EMAIL_THREATS),
        ]
        .into_iter()
        .map(|(concern, template)| concern.to_advisory(SERVICE, template))
        .collect()
    }
}

fn oauth(snapshot: &DefenderSnapshot) -> Concern {
    let summary = &snapshot.oauth_risk_summary;
    let mut concern = Concern::default();
    if summary.high_risk > 0 {
        concern.metric(format!("{} high-risk OAuth apps", summary.high_risk));
        concern.recommend(format!("Review {} high-risk app permissions", summary.high_risk));
    } else if summary.over_privileged > 0 {
        concern.metric(format!("{} over-privileged apps", summary.over_privileged));
    }
    concern
}

fn email_threats(snapshot: &DefenderSnapshot) -> Concern {
    let by_category = &snapshot.alert_summary.by_category;
    let mut concern = Concern::default();
    for category in ["Phishing", "Malware"] {
        let count = by_category.get(category);
        if count > 0 {
            concern.metric(format!("{} {} alerts", count, category.to_lowercase()));
        }
    }
    concern
}

fn incidents(snapshot: &DefenderSnapshot) -> Concern {
    let summary = &snapshot.incident_summary;
    let mut concern = Concern::default();
    if summary.total == 0 {
        return concern;
    }
    if summary.high_severity > 0 {
        concern.metric(format!("{} incidents ({} high-severity)", summary.active, summary.high_severity));
        concern.recommend(format!("Investigate {} high-severity incident(s)", summary.high_severity));
    } else if summary.active > 0 {
        concern.metric(format!("{} active incidents", summary.active));
        concern.recommend(format!("Review {} active incident(s)", summary.active));
    }
    concern
}

fn identity(snapshot: &DefenderSnapshot) -> Concern {
    let users = &snapshot.risky_users_summary;
    let mut concern = Concern::default();
    if users.total > 0 {
        if users.confirmed_compromised > 0 {
            concern.metric(format!("{} risky users ({} compromised)", users.total, users.confirmed_compromised));
            concern.recommend(format!("Revoke access for {} compromised account(s)", users.confirmed_compromised));
        } else if users.high > 0 {
            concern.metric(format!("{} risky users ({} high-risk)", users.total, users.high));
            concern.recommend(format!("Review {} high-risk identity(ies)", users.high));
        } else {
            concern.metric(format!("{} risky users", users.total));
        }
    }
    let high_sign_ins = snapshot.risky_sign_ins_summary.high_risk;
    if high_sign_ins > 0 {
        concern.metric(format!("{} high-risk sign-ins", high_sign_ins));
    }
    concern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defender::DefenderSource;
    use serde_json::json;

    fn snapshot_with(name: &str, payload: serde_json::Value) -> DefenderSnapshot {
        let mut snapshot = DefenderSnapshot::new();
        snapshot.graph_security_available = true;
        snapshot.absorb(DefenderSource::GraphSecurity, name, &payload);
        snapshot.refresh_availability();
        snapshot
    }

    #[test]
    fn test_unavailable_snapshot_has_no_insights() {
        let insights = DefenderInsights::from_snapshot(&DefenderSnapshot::new());
        assert_eq!(insights, DefenderInsights::default());
        assert!(!insights.has_incidents());
        assert!(insights.advisories().unwrap().is_empty());
    }

    #[test]
    fn test_high_severity_incidents_take_priority() {
        let snapshot = snapshot_with("incidents", json!({"value": [
            {"status": "active", "severity": "high"},
            {"status": "active", "severity": "low"},
            {"status": "resolved", "severity": "medium"}
        ]}));
        let insights = DefenderInsights::from_snapshot(&snapshot);
        assert_eq!(insights.incidents.metrics, vec!["2 incidents (1 high-severity)"]);
        assert_eq!(insights.incidents.recommended_action, "Investigate 1 high-severity incident(s)");
    }

    #[test]
    fn test_identity_compromised_over_high_risk() {
        let snapshot = snapshot_with("risky_users", json!({"value": [
            {"riskLevel": "high", "riskState": "confirmedCompromised"},
            {"riskLevel": "high", "riskState": "atRisk"},
            {"riskLevel": "low", "riskState": "atRisk"}
        ]}));
        let insights = DefenderInsights::from_snapshot(&snapshot);
        assert_eq!(insights.identity.metrics, vec!["3 risky users (1 compromised)"]);
        assert_eq!(insights.identity.recommended_action, "Revoke access for 1 compromised account(s)");
        assert!(insights.has_identity_risks());
    }

    #[test]
    fn test_email_threats_from_alert_categories() {
        let snapshot = snapshot_with("alerts", json!({"value": [
            {"category": "phishing", "severity": "high"},
            {"category": "Phishing", "severity": "low"},
            {"category": "InitialAccess"}
        ]}));
        let insights = DefenderInsights::from_snapshot(&snapshot);
        assert_eq!(insights.email_threats.metrics, vec!["2 phishing alerts"]);
        assert!(insights.email_threats.recommended_action.is_empty());
        assert!(!insights.has_oauth_risks());

        let advisories = insights.advisories().unwrap();
        let email = advisories.iter().find(|a| a.feature == "Microsoft Defender for Office 365").unwrap();
        assert_eq!(email.priority, "");
        assert!(email.observation.ends_with("2 phishing alerts"));
    }

    #[test]
    fn test_clean_tenant_advisories() {
        let snapshot = snapshot_with("alerts", json!({"value": []}));
        let advisories = DefenderInsights::from_snapshot(&snapshot).advisories().unwrap();
        assert_eq!(advisories.len(), 4);
        assert_eq!(
            advisories[0].observation,
            "Microsoft Defender XDR is active, protecting Copilot workloads. No security incidents detected"
        );
        assert!(advisories.iter().all(|a| a.priority.is_empty()));
    }
}
