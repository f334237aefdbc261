use std::time::Duration;

use futures::FutureExt;
use serde_json::{json, Value};

use tenant_posture::defender::requests::{api, graph, DEFENDER_API_RULE, GRAPH_SECURITY_RULE};
use tenant_posture::defender::{DefenderSnapshot, DefenderSource};
use tenant_posture::entra::requests::{names, ENTRA_RULE};
use tenant_posture::entra::EntraSnapshot;
use tenant_posture::errors::UpstreamError;
use tenant_posture::fanout::{fan_out, triage, CollectionStatus, Outcome, RequestSet};
use tenant_posture::metrics::percentage;

const NOT_PROVISIONED: &str = "Forbidden: Tenant is not provisioned for this product";

fn items(values: Vec<Value>) -> Value {
    json!({ "value": values })
}

/// A fake operation that settles after `delay_ms` with `outcome`.
fn op<'a>(delay_ms: u64, outcome: Outcome) -> futures::future::BoxFuture<'a, Outcome> {
    async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        outcome
    }
    .boxed()
}

fn scenario_a_alerts() -> Value {
    let mut alerts = Vec::new();
    for i in 0..6 {
        let severity = if i % 2 == 0 { "High" } else { "high" };
        alerts.push(json!({ "title": format!("Unusual sign-in {i}"), "severity": severity }));
    }
    for i in 0..4 {
        alerts.push(json!({ "title": format!("Ransomware behavior {i}"), "severity": "Medium" }));
    }
    alerts[1]["title"] = json!("Suspicious Copilot prompt");
    alerts[7]["title"] = json!("COPILOT data export");
    items(alerts)
}

async fn defender_pass(requests: RequestSet<'_>) -> DefenderSnapshot {
    let mut snapshot = DefenderSnapshot::new();
    let results = fan_out(requests).await;
    let triaged = triage(results, &GRAPH_SECURITY_RULE, &mut snapshot.status);
    snapshot.ingest(DefenderSource::GraphSecurity, &triaged);
    snapshot
}

#[tokio::test]
async fn test_scenario_a_alerts_with_three_activation_failures() {
    let mut set = RequestSet::new();
    set.add(graph::ALERTS, op(5, Ok(scenario_a_alerts())))
        // Declared first among the failures but settles last.
        .add(graph::INCIDENTS, op(40, Err(UpstreamError::http(403, "Incidents: tenant is not provisioned"))))
        .add(graph::SECURE_SCORES, op(1, Err(UpstreamError::http(403, "Scores: tenant is not provisioned"))))
        .add(graph::RISKY_USERS, op(10, Err(UpstreamError::http(403, NOT_PROVISIONED))));

    let snapshot = defender_pass(set).await;

    assert_eq!(snapshot.alert_summary.total, 10);
    assert_eq!(snapshot.alert_summary.by_severity["High"], 6);
    assert_eq!(snapshot.alert_summary.by_severity["medium"], 4);
    assert_eq!(snapshot.alert_summary.copilot_related, 2);
    assert!(snapshot.status.activation_needed);
    assert_eq!(
        snapshot.status.activation_message,
        "Microsoft Defender XDR not activated: Incidents: tenant is not provisioned"
    );
    assert!(snapshot.status.missing_features.is_empty());
    assert!(snapshot.graph_security_available);
    assert_eq!(snapshot.incident_summary.total, 0);
    assert_eq!(snapshot.risky_users_summary.total, 0);
}

#[tokio::test]
async fn test_scenario_b_empty_success_still_marks_available() {
    let mut set = RequestSet::new();
    set.add(graph::ALERTS, op(0, Ok(items(vec![]))));
    let snapshot = defender_pass(set).await;

    assert_eq!(snapshot.alert_summary.total, 0);
    assert!(snapshot.alert_summary.by_severity.is_empty());
    assert!(snapshot.graph_security_available);
    assert!(snapshot.available);
    assert!(!snapshot.defender_api_available);

    let mut entra = EntraSnapshot::new();
    let mut set = RequestSet::new();
    set.add(names::CA_POLICIES, op(0, Ok(items(vec![]))));
    let triaged = triage(fan_out(set).await, &ENTRA_RULE, &mut entra.status);
    entra.ingest(&triaged);

    assert_eq!(entra.ca_summary.total, 0);
    assert!(entra.graph_available);
    assert!(entra.available);
}

#[tokio::test]
async fn test_scenario_c_delegated_matches_fan_out() {
    let blob = json!({ "machines": { "value": [{ "riskScore": "High" }] } });
    let mut delegated = DefenderSnapshot::new();
    delegated.ingest_delegated(&blob).unwrap();

    let mut live = DefenderSnapshot::new();
    let mut set = RequestSet::new();
    set.add(api::MACHINES, op(0, Ok(blob["machines"].clone())));
    let triaged = triage(fan_out(set).await, &DEFENDER_API_RULE, &mut live.status);
    live.ingest(DefenderSource::DefenderApi, &triaged);

    assert_eq!(delegated.device_summary.total, 1);
    assert_eq!(delegated.device_summary.high_risk, 1);
    assert_eq!(delegated.device_summary, live.device_summary);
    assert_eq!(delegated.defender_devices, live.defender_devices);
    assert!(delegated.defender_api_available);
}

#[test]
fn test_zero_default_before_any_fan_out() {
    let defender = DefenderSnapshot::new();
    assert!(!defender.available && !defender.graph_security_available && !defender.defender_api_available);
    assert_eq!(defender.status, CollectionStatus::new());
    assert_eq!(defender.alert_summary.total, 0);
    assert_eq!(defender.device_summary.total, 0);
    assert_eq!(defender.secure_score_summary.percentage, 0.0);

    let entra = EntraSnapshot::new();
    assert!(!entra.available && !entra.graph_available);
    assert_eq!(entra.auth_summary.mfa_registration_rate, 0.0);
    assert_eq!(entra.device_summary.compliance_rate, 0.0);
    assert!(entra.ca_policies.is_empty());
}

fn isolation_payload(name: &str) -> Value {
    match name {
        graph::ALERTS => items(vec![json!({ "severity": "High" }), json!({ "severity": "Low" })]),
        graph::INCIDENTS => items(vec![json!({ "status": "active", "severity": "high" })]),
        graph::RISKY_USERS => items(vec![json!({ "riskLevel": "high" })]),
        _ => items(vec![json!({ "clientId": "app-1", "scope": "Mail.Read User.Read" })]),
    }
}

#[tokio::test]
async fn test_partial_failure_isolation_over_all_subsets() {
    let requests = [graph::ALERTS, graph::INCIDENTS, graph::RISKY_USERS, graph::OAUTH_GRANTS];

    for mask in 0u8..16 {
        let failing = |i: usize| mask & (1 << i) != 0;
        let mut set = RequestSet::new();
        for (i, name) in requests.iter().enumerate() {
            let outcome = if failing(i) {
                match i % 3 {
                    0 => Err(UpstreamError::http(403, NOT_PROVISIONED)),
                    1 => Err(UpstreamError::http(404, "Not Found")),
                    _ => Err(UpstreamError::transport("connection reset")),
                }
            } else {
                Ok(isolation_payload(name))
            };
            set.add(*name, op(0, outcome));
        }

        let snapshot = defender_pass(set).await;
        let expect = |i: usize, populated: u64| if failing(i) { 0 } else { populated };

        assert_eq!(snapshot.alert_summary.total, expect(0, 2), "mask {mask:04b}");
        assert_eq!(snapshot.incident_summary.total, expect(1, 1), "mask {mask:04b}");
        assert_eq!(snapshot.incident_summary.active, expect(1, 1), "mask {mask:04b}");
        assert_eq!(snapshot.risky_users_summary.high, expect(2, 1), "mask {mask:04b}");
        assert_eq!(snapshot.oauth_risk_summary.total_apps, expect(3, 1), "mask {mask:04b}");
        assert_eq!(snapshot.graph_security_available, mask != 0b1111, "mask {mask:04b}");
    }
}

#[tokio::test]
async fn test_403_and_404_never_share_a_request() {
    let mut set = RequestSet::new();
    set.add(graph::ALERTS, op(0, Err(UpstreamError::http(403, NOT_PROVISIONED))))
        .add(graph::SECURE_SCORES, op(0, Err(UpstreamError::http(404, "Resource not found"))))
        .add(graph::RISKY_USERS, op(0, Err(UpstreamError::http(403, "Insufficient privileges"))));

    let snapshot = defender_pass(set).await;

    assert!(snapshot.status.activation_needed);
    assert_eq!(snapshot.status.missing_features, vec![graph::SECURE_SCORES.to_string()]);
    assert_eq!(snapshot.status.permission_denied, vec![graph::RISKY_USERS.to_string()]);
    assert!(!snapshot.status.missing_features.iter().any(|n| n == graph::ALERTS));
    assert!(!snapshot.available);
}

#[tokio::test]
async fn test_first_activation_message_is_never_overwritten() {
    let mut status = CollectionStatus::new();
    for message in ["first is not provisioned", "second is not provisioned"] {
        let mut set = RequestSet::new();
        set.add(graph::ALERTS, op(0, Err(UpstreamError::http(403, message))));
        triage(fan_out(set).await, &GRAPH_SECURITY_RULE, &mut status);
    }
    assert_eq!(status.activation_message, "Microsoft Defender XDR not activated: first is not provisioned");
}

#[test]
fn test_percentages_with_zero_denominator() {
    assert_eq!(percentage(5, 0), 0.0);
    assert_eq!(percentage(0, 0), 0.0);
    assert_eq!(percentage(1, 3), 33.33);
}

#[tokio::test]
async fn test_keyword_relevance_ignores_case() {
    let mut set = RequestSet::new();
    set.add(graph::ALERTS, op(0, Ok(items(vec![json!({ "title": "cOpIlOt PROMPT injection" })]))));
    let snapshot = defender_pass(set).await;
    assert_eq!(snapshot.alert_summary.copilot_related, 1);
}
