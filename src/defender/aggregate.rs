//! Folds from canonical Defender records into snapshot summaries.
//!
//! A domain is only touched when its request succeeded with a non-empty
//! collection; anything else leaves the zero defaults in place.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;

use crate::fanout::Triage;
use crate::metrics::{contains_any, count_where, field_in, lowered, ratio_percentage, Histogram};
use crate::models::defender::*;
use crate::models::normalize::{collection, single};
use super::requests::{api, graph};
use super::snapshot::*;

pub const ALERT_COPILOT_KEYWORDS: &[&str] = &["copilot", "ai", "chatgpt", "openai", "agent", "plugin"];
const IDENTITY_CONTROL_KEYWORDS: &[&str] = &["identity", "authentication", "mfa", "conditional"];
const DATA_CONTROL_KEYWORDS: &[&str] = &["data", "dlp", "encryption", "information"];
const COPILOT_CONTROL_KEYWORDS: &[&str] = &["copilot", "ai", "agent", "m365", "office365", "sharepoint", "teams"];
const RECOMMENDATION_KEYWORDS: &[&str] = &[
    "microsoft 365", "m365", "office", "teams", "sharepoint", "onedrive", "exchange",
    "identity", "authentication", "mfa",
];
const SOFTWARE_KEYWORDS: &[&str] = &["microsoft teams", "microsoft 365", "edge", "copilot", "office"];
const DEVICE_APP_KEYWORDS: &[&str] = &["teams", "microsoft 365"];

pub const HIGH_RISK_SCOPES: &[&str] = &["Mail.ReadWrite", "Files.ReadWrite.All", "Sites.ReadWrite.All", "User.ReadWrite.All"];
pub const MEDIUM_RISK_SCOPES: &[&str] = &["Mail.Read", "Files.Read.All", "Sites.Read.All"];
/// Apps holding more distinct scopes than this are over-privileged.
pub const OVER_PRIVILEGED_SCOPE_COUNT: usize = 10;

/// Which sub-API a payload came from; request names overlap between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenderSource {
    GraphSecurity,
    DefenderApi,
}

impl DefenderSnapshot {
    /// Fold every successful payload of one sub-API and mark it available.
    pub fn ingest(&mut self, source: DefenderSource, triage: &Triage) {
        if triage.any_success() {
            match source {
                DefenderSource::GraphSecurity => self.graph_security_available = true,
                DefenderSource::DefenderApi => self.defender_api_available = true,
            }
        }
        for (name, payload) in &triage.successes {
            self.absorb(source, name, payload);
        }
        self.refresh_availability();
    }

    pub(crate) fn absorb(&mut self, source: DefenderSource, name: &str, payload: &Value) {
        match (source, name) {
            (DefenderSource::GraphSecurity, graph::ALERTS) => self.fold_alerts(collection(payload)),
            (DefenderSource::GraphSecurity, graph::INCIDENTS) => self.fold_incidents(collection(payload)),
            (DefenderSource::GraphSecurity, graph::SECURE_SCORES) => self.fold_secure_score(single(payload)),
            (DefenderSource::GraphSecurity, graph::SECURE_SCORE_CONTROLS) => self.fold_controls(collection(payload)),
            (DefenderSource::GraphSecurity, graph::RISKY_USERS) => self.fold_risky_users(collection(payload)),
            (DefenderSource::GraphSecurity, graph::RISKY_SIGN_INS) => self.fold_risky_sign_ins(collection(payload)),
            (DefenderSource::GraphSecurity, graph::OAUTH_GRANTS) => self.fold_oauth_grants(collection(payload)),
            (DefenderSource::DefenderApi, api::INCIDENTS) => self.fold_defender_incidents(collection(payload)),
            (DefenderSource::DefenderApi, api::MACHINES) => self.fold_machines(collection(payload)),
            (DefenderSource::DefenderApi, api::VULNERABILITIES) => self.fold_vulnerabilities(collection(payload)),
            (DefenderSource::DefenderApi, api::HUNTING_PROCESSES) => self.fold_hunting_processes(collection(payload)),
            (DefenderSource::DefenderApi, api::HUNTING_NETWORK) => self.fold_hunting_network(collection(payload)),
            (DefenderSource::DefenderApi, api::HUNTING_FILES) => self.fold_hunting_files(collection(payload)),
            (DefenderSource::DefenderApi, api::HUNTING_EMAILS) => self.fold_hunting_emails(collection(payload)),
            (DefenderSource::DefenderApi, api::EMAIL_THREATS) => self.fold_email_threats(collection(payload)),
            (DefenderSource::DefenderApi, api::RECOMMENDATIONS) => self.fold_recommendations(collection(payload)),
            (DefenderSource::DefenderApi, api::SOFTWARE) => self.fold_software(collection(payload)),
            (DefenderSource::DefenderApi, api::EXPOSURE_SCORE) => self.fold_exposure(single(payload)),
            _ => debug!(request = name, ?source, "No aggregator for request"),
        }
    }

    fn fold_alerts(&mut self, alerts: Vec<SecurityAlert>) {
        if alerts.is_empty() {
            return;
        }
        self.alert_summary = AlertSummary {
            total: alerts.len() as u64,
            by_severity: alerts.iter().map(|a| a.severity.as_deref()).collect(),
            by_category: alerts.iter().map(|a| a.category.as_deref()).collect(),
            copilot_related: count_where(&alerts, |a| {
                contains_any(&[lowered(&a.title), lowered(&a.description)], ALERT_COPILOT_KEYWORDS)
            }),
        };
        self.security_alerts = alerts;
    }

    fn fold_incidents(&mut self, incidents: Vec<SecurityIncident>) {
        if incidents.is_empty() {
            return;
        }
        self.incident_summary = IncidentSummary {
            total: incidents.len() as u64,
            active: count_where(&incidents, |i| field_in(&i.status, &["active", "new", "inprogress"])),
            resolved: count_where(&incidents, |i| field_in(&i.status, &["resolved", "closed"])),
            high_severity: count_where(&incidents, |i| field_in(&i.severity, &["high"])),
        };
        self.security_incidents = incidents;
    }

    fn fold_secure_score(&mut self, latest: Option<SecureScore>) {
        let Some(latest) = latest else { return };
        let current = latest.current_score.unwrap_or_default();
        let max = latest.max_score.unwrap_or_default();
        self.secure_score_summary = SecureScoreSummary {
            current_score: current,
            max_score: max,
            percentage: ratio_percentage(current, max),
        };
        self.secure_score = Some(latest);
    }

    fn fold_controls(&mut self, controls: Vec<ControlProfile>) {
        if controls.is_empty() {
            return;
        }
        let implemented = count_where(&controls, |c| field_in(&c.implementation_status, &["implemented"]));
        let in_focus = |c: &ControlProfile, keywords: &[&str]| {
            contains_any(&[lowered(&c.control_category), lowered(&c.title)], keywords)
        };

        self.identity_controls = controls.iter().filter(|c| in_focus(c, IDENTITY_CONTROL_KEYWORDS)).cloned().collect();
        self.data_controls = controls.iter().filter(|c| in_focus(c, DATA_CONTROL_KEYWORDS)).cloned().collect();
        self.control_summary = ControlSummary {
            total: controls.len() as u64,
            implemented,
            not_implemented: controls.len() as u64 - implemented,
        };
        self.control_focus_summary = ControlFocusSummary {
            identity_controls: self.identity_controls.len() as u64,
            data_controls: self.data_controls.len() as u64,
            copilot_relevant: count_where(&controls, |c| contains_any(&[lowered(&c.title)], COPILOT_CONTROL_KEYWORDS)),
        };
        self.secure_score_controls = controls;
    }

    fn fold_risky_users(&mut self, users: Vec<RiskyUser>) {
        if users.is_empty() {
            return;
        }
        self.risky_users_summary = RiskyUsersSummary {
            total: users.len() as u64,
            high: count_where(&users, |u| field_in(&u.risk_level, &["high"])),
            medium: count_where(&users, |u| field_in(&u.risk_level, &["medium"])),
            low: count_where(&users, |u| field_in(&u.risk_level, &["low"])),
            confirmed_compromised: count_where(&users, |u| field_in(&u.risk_state, &["confirmedcompromised"])),
        };
        self.risky_users = users;
    }

    fn fold_risky_sign_ins(&mut self, sign_ins: Vec<RiskySignIn>) {
        if sign_ins.is_empty() {
            return;
        }
        self.risky_sign_ins_summary = RiskySignInsSummary {
            total: sign_ins.len() as u64,
            high_risk: count_where(&sign_ins, |s| field_in(&s.risk_level_aggregated, &["high"])),
            medium_risk: count_where(&sign_ins, |s| field_in(&s.risk_level_aggregated, &["medium"])),
        };
        self.risky_sign_ins = sign_ins;
    }

    fn fold_oauth_grants(&mut self, grants: Vec<OAuthGrant>) {
        if grants.is_empty() {
            return;
        }
        let mut by_client: BTreeMap<String, (BTreeSet<String>, usize)> = BTreeMap::new();
        for grant in &grants {
            let client_id = grant.client_id.clone().unwrap_or_else(|| "unknown".to_string());
            let entry = by_client.entry(client_id).or_default();
            entry.0.extend(grant.scopes().map(str::to_string));
            entry.1 += 1;
        }

        let mut summary = OAuthRiskSummary { total_apps: by_client.len() as u64, ..Default::default() };
        for (scopes, _) in by_client.values() {
            if HIGH_RISK_SCOPES.iter().any(|s| scopes.contains(*s)) {
                summary.high_risk += 1;
            } else if MEDIUM_RISK_SCOPES.iter().any(|s| scopes.contains(*s)) {
                summary.medium_risk += 1;
            }
            if scopes.len() > OVER_PRIVILEGED_SCOPE_COUNT {
                summary.over_privileged += 1;
            }
        }
        self.oauth_risk_summary = summary;
        self.oauth_apps = by_client
            .into_iter()
            .map(|(client_id, (scopes, grants))| OAuthApp { client_id, scopes: scopes.into_iter().collect(), grants })
            .collect();
    }

    fn fold_defender_incidents(&mut self, incidents: Vec<DefenderIncident>) {
        if incidents.is_empty() {
            return;
        }
        self.defender_incident_summary = DefenderIncidentSummary {
            total: incidents.len() as u64,
            in_progress: count_where(&incidents, |i| field_in(&i.status, &["active", "inprogress"])),
            new: count_where(&incidents, |i| field_in(&i.status, &["new"])),
        };
        self.defender_incidents = incidents;
    }

    fn fold_machines(&mut self, machines: Vec<Machine>) {
        if machines.is_empty() {
            return;
        }
        self.device_summary = DeviceSummary {
            total: machines.len() as u64,
            high_risk: count_where(&machines, |m| field_in(&m.risk_score, &["high"])),
            medium_risk: count_where(&machines, |m| field_in(&m.risk_score, &["medium"])),
            low_risk: count_where(&machines, |m| field_in(&m.risk_score, &["low"])),
            copilot_enabled: count_where(&machines, |m| {
                let inventory: Vec<String> = m
                    .software_inventory
                    .iter()
                    .flatten()
                    .map(|s| match s {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                contains_any(&inventory, DEVICE_APP_KEYWORDS)
            }),
        };
        self.defender_devices = machines;
    }

    fn fold_vulnerabilities(&mut self, vulns: Vec<Vulnerability>) {
        if vulns.is_empty() {
            return;
        }
        let severity: Histogram = vulns.iter().map(|v| v.severity.as_deref()).collect();
        self.vulnerability_summary = VulnerabilitySummary {
            total: vulns.len() as u64,
            critical: severity["critical"],
            high: severity["high"],
            medium: severity["medium"],
            low: severity["low"],
        };
        self.defender_vulnerabilities = vulns;
    }

    fn fold_hunting_processes(&mut self, rows: Vec<HuntingRow>) {
        if rows.is_empty() {
            return;
        }
        self.hunting_summary.suspicious_processes = rows.iter().filter_map(|r| r.total_events).sum();
        self.hunting_summary.affected_devices += distinct(&rows, |r| &r.device_name);
        self.hunting_summary.affected_users += distinct(&rows, |r| &r.account_name);
        self.hunting_events.process_events = rows;
    }

    fn fold_hunting_network(&mut self, rows: Vec<HuntingRow>) {
        if rows.is_empty() {
            return;
        }
        self.hunting_summary.unusual_network_activity = rows.iter().filter_map(|r| r.total_connections).sum();
        self.hunting_summary.affected_devices += distinct(&rows, |r| &r.device_name);
        self.hunting_events.network_events = rows;
    }

    fn fold_hunting_files(&mut self, rows: Vec<HuntingRow>) {
        if rows.is_empty() {
            return;
        }
        self.hunting_summary.sensitive_file_access = rows.iter().filter_map(|r| r.unique_sensitive_files).sum();
        self.hunting_summary.affected_devices += distinct(&rows, |r| &r.device_name);
        self.hunting_summary.affected_users += distinct(&rows, |r| &r.account_name);
        self.hunting_events.file_access_events = rows;
    }

    fn fold_hunting_emails(&mut self, rows: Vec<HuntingRow>) {
        if rows.is_empty() {
            return;
        }
        self.hunting_summary.phishing_attempts = rows.iter().filter_map(|r| r.phishing_attempts).sum();
        self.hunting_events.email_threats = rows;
    }

    fn fold_email_threats(&mut self, threats: Vec<EmailThreat>) {
        if threats.is_empty() {
            return;
        }
        let has = |kw: &str| count_where(&threats, |t| contains_any(&[t.threat_text()], &[kw]));
        self.email_threat_summary = EmailThreatSummary {
            total: threats.len() as u64,
            phishing: has("phish"),
            malware: has("malware"),
            spam: has("spam"),
        };
        self.email_threats = threats;
    }

    fn fold_recommendations(&mut self, recs: Vec<SecurityRecommendation>) {
        if recs.is_empty() {
            return;
        }
        self.recommendations_summary = RecommendationsSummary {
            total: recs.len() as u64,
            critical: count_where(&recs, |r| field_in(&r.severity, &["critical"])),
            high: count_where(&recs, |r| field_in(&r.severity, &["high"])),
            copilot_related: count_where(&recs, |r| {
                contains_any(&[lowered(&r.recommendation_name), lowered(&r.recommendation_category)], RECOMMENDATION_KEYWORDS)
            }),
        };
        self.security_recommendations = recs;
    }

    fn fold_software(&mut self, apps: Vec<Software>) {
        if apps.is_empty() {
            return;
        }
        self.software_summary = SoftwareSummary {
            total_apps: apps.len() as u64,
            copilot_apps: count_where(&apps, |a| contains_any(&[lowered(&a.name), lowered(&a.vendor)], SOFTWARE_KEYWORDS)),
            vulnerable_apps: count_where(&apps, |a| a.number_of_weaknesses.unwrap_or_default() > 0),
        };
        self.software_inventory = apps;
    }

    fn fold_exposure(&mut self, exposure: Option<ExposureScore>) {
        let Some(exposure) = exposure else { return };
        let score = exposure.score.unwrap_or_default();
        self.exposure_summary = ExposureSummary { score, level: ExposureLevel::from_score(score) };
        self.exposure_score = Some(exposure);
    }
}

fn distinct(rows: &[HuntingRow], field: impl Fn(&HuntingRow) -> &Option<String>) -> u64 {
    rows.iter()
        .filter_map(|r| field(r).as_deref())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(name: &str, payload: Value) -> DefenderSnapshot {
        let mut snap = DefenderSnapshot::new();
        snap.absorb(DefenderSource::GraphSecurity, name, &payload);
        snap
    }

    fn defender(name: &str, payload: Value) -> DefenderSnapshot {
        let mut snap = DefenderSnapshot::new();
        snap.absorb(DefenderSource::DefenderApi, name, &payload);
        snap
    }

    #[test]
    fn test_alert_histograms_and_keywords() {
        let snap = graph("alerts", json!({"value": [
            {"severity": "High", "category": "Phishing", "title": "Suspicious COPILOT plugin"},
            {"severity": "high", "category": "Malware", "title": "Ransomware"},
            {"severity": "Low", "description": "OpenAI token leaked"},
            {}
        ]}));
        assert_eq!(snap.alert_summary.total, 4);
        assert_eq!(snap.alert_summary.by_severity["High"], 2);
        assert_eq!(snap.alert_summary.by_severity["Unknown"], 1);
        assert_eq!(snap.alert_summary.by_category["phishing"], 1);
        assert_eq!(snap.alert_summary.copilot_related, 2);
        assert_eq!(snap.security_alerts.len(), 4);
    }

    #[test]
    fn test_empty_collection_keeps_defaults() {
        let snap = graph("alerts", json!({"value": []}));
        assert_eq!(snap.alert_summary, AlertSummary::default());
        let snap = defender("exposure_score", json!(null));
        assert_eq!(snap.exposure_summary.level, ExposureLevel::Unknown);
    }

    #[test]
    fn test_incident_states() {
        let snap = graph("incidents", json!({"value": [
            {"status": "active", "severity": "high"},
            {"status": "New", "severity": "medium"},
            {"status": "resolved", "severity": "High"},
            {"status": "redirected"}
        ]}));
        assert_eq!(snap.incident_summary, IncidentSummary { total: 4, active: 2, resolved: 1, high_severity: 2 });
    }

    #[test]
    fn test_secure_score_uses_first_item() {
        let snap = graph("secure_scores", json!({"value": [
            {"currentScore": 45.5, "maxScore": 91.0},
            {"currentScore": 10.0, "maxScore": 91.0}
        ]}));
        assert_eq!(snap.secure_score_summary.current_score, 45.5);
        assert_eq!(snap.secure_score_summary.percentage, 50.0);
    }

    #[test]
    fn test_secure_score_zero_max() {
        let snap = graph("secure_scores", json!({"value": [{"currentScore": 5.0, "maxScore": 0.0}]}));
        assert_eq!(snap.secure_score_summary.percentage, 0.0);
    }

    #[test]
    fn test_control_focus() {
        let snap = graph("secure_score_controls", json!({"value": [
            {"title": "Require MFA for admins", "controlCategory": "Identity", "implementationStatus": "Implemented"},
            {"title": "Enable DLP for Teams", "controlCategory": "Data"},
            {"title": "Turn on audit", "controlCategory": "Apps", "implementationStatus": "notImplemented"}
        ]}));
        assert_eq!(snap.control_summary, ControlSummary { total: 3, implemented: 1, not_implemented: 2 });
        assert_eq!(snap.control_focus_summary.identity_controls, 1);
        assert_eq!(snap.control_focus_summary.data_controls, 1);
        assert_eq!(snap.control_focus_summary.copilot_relevant, 1);
    }

    #[test]
    fn test_oauth_apps_grouped_by_client() {
        let many: Vec<String> = (0..11).map(|i| format!("Scope{}.Read", i)).collect();
        let snap = graph("oauth_grants", json!({"value": [
            {"clientId": "a", "scope": "openid Mail.ReadWrite"},
            {"clientId": "a", "scope": "profile"},
            {"clientId": "b", "scope": "Files.Read.All"},
            {"clientId": "c", "scope": many.join(" ")},
            {"scope": "User.Read"}
        ]}));
        assert_eq!(snap.oauth_risk_summary, OAuthRiskSummary { total_apps: 4, high_risk: 1, medium_risk: 1, over_privileged: 1 });
        let a = snap.oauth_apps.iter().find(|app| app.client_id == "a").unwrap();
        assert_eq!(a.grants, 2);
        assert_eq!(a.scopes, vec!["Mail.ReadWrite", "openid", "profile"]);
        assert!(snap.oauth_apps.iter().any(|app| app.client_id == "unknown"));
    }

    #[test]
    fn test_machines_risk_and_inventory() {
        let snap = defender("machines", json!({"value": [
            {"riskScore": "High", "softwareInventory": ["Microsoft Teams"]},
            {"riskScore": "Medium", "softwareInventory": [{"name": "Microsoft 365 Apps"}]},
            {"riskScore": "None"},
            {"riskScore": "Low"}
        ]}));
        assert_eq!(snap.device_summary, DeviceSummary { total: 4, high_risk: 1, medium_risk: 1, low_risk: 1, copilot_enabled: 2 });
    }

    #[test]
    fn test_vulnerability_severity_counts() {
        let snap = defender("vulnerabilities", json!({"value": [
            {"severity": "Critical"}, {"severity": "critical"}, {"severity": "High"}, {"severity": "Low"}, {}
        ]}));
        assert_eq!(snap.vulnerability_summary, VulnerabilitySummary { total: 5, critical: 2, high: 1, medium: 0, low: 1 });
    }

    #[test]
    fn test_hunting_devices_sum_across_queries() {
        let mut snap = DefenderSnapshot::new();
        snap.absorb(DefenderSource::DefenderApi, api::HUNTING_PROCESSES, &json!({"Results": [
            {"DeviceName": "pc1", "AccountName": "alice", "TotalEvents": 7},
            {"DeviceName": "pc1", "AccountName": "bob", "TotalEvents": 9}
        ]}));
        snap.absorb(DefenderSource::DefenderApi, api::HUNTING_NETWORK, &json!({"Results": [
            {"DeviceName": "pc1", "TotalConnections": 150},
            {"DeviceName": "pc2", "TotalConnections": 120}
        ]}));
        snap.absorb(DefenderSource::DefenderApi, api::HUNTING_EMAILS, &json!({"Results": [
            {"PhishingAttempts": 3}, {"PhishingAttempts": 2}
        ]}));
        let h = &snap.hunting_summary;
        assert_eq!(h.suspicious_processes, 16);
        assert_eq!(h.unusual_network_activity, 270);
        assert_eq!(h.affected_devices, 3);
        assert_eq!(h.affected_users, 2);
        assert_eq!(h.phishing_attempts, 5);
        assert_eq!(snap.hunting_events.network_events.len(), 2);
    }

    #[test]
    fn test_hunting_counts_reported_as_floats_still_sum() {
        let mut snap = DefenderSnapshot::new();
        snap.absorb(DefenderSource::DefenderApi, api::HUNTING_EMAILS, &json!({"Results": [
            {"RecipientEmailAddress": "a@contoso.com", "PhishingAttempts": 7.0},
            {"RecipientEmailAddress": "b@contoso.com", "PhishingAttempts": 2}
        ]}));
        assert_eq!(snap.hunting_summary.phishing_attempts, 9);
        assert_eq!(snap.hunting_events.email_threats.len(), 2);
    }

    #[test]
    fn test_email_threat_types() {
        let snap = defender("email_threats", json!({"value": [
            {"threatType": "Phish"},
            {"threatType": ["Malware", "Phish"]},
            {"threatType": "Spam"}
        ]}));
        assert_eq!(snap.email_threat_summary, EmailThreatSummary { total: 3, phishing: 2, malware: 1, spam: 1 });
    }

    #[test]
    fn test_software_and_recommendations() {
        let snap = defender("software", json!({"value": [
            {"name": "Microsoft Teams", "vendor": "microsoft", "numberOfWeaknesses": 2},
            {"name": "7-zip", "vendor": "igor pavlov", "numberOfWeaknesses": 0}
        ]}));
        assert_eq!(snap.software_summary, SoftwareSummary { total_apps: 2, copilot_apps: 1, vulnerable_apps: 1 });

        let snap = defender("recommendations", json!({"value": [
            {"recommendationName": "Enable MFA", "severity": "Critical"},
            {"recommendationName": "Update Chrome", "recommendationCategory": "Application", "severity": "High"}
        ]}));
        assert_eq!(snap.recommendations_summary, RecommendationsSummary { total: 2, critical: 1, high: 1, copilot_related: 1 });
    }

    #[test]
    fn test_exposure_score_object() {
        let snap = defender("exposure_score", json!({"score": 42.5, "time": "2024-01-01T00:00:00Z"}));
        assert_eq!(snap.exposure_summary.score, 42.5);
        assert_eq!(snap.exposure_summary.level, ExposureLevel::Medium);
    }

    #[test]
    fn test_request_names_are_scoped_by_source() {
        let payload = json!({"value": [{"status": "New"}]});
        let snap = defender("incidents", payload.clone());
        assert_eq!(snap.defender_incident_summary.new, 1);
        assert_eq!(snap.incident_summary.total, 0);
        let snap = graph("incidents", payload);
        assert_eq!(snap.incident_summary.active, 1);
        assert_eq!(snap.defender_incident_summary.total, 0);
    }
}
