//! Request sets for the two Defender sub-APIs.

use chrono::{Duration, SecondsFormat, Utc};
use futures::FutureExt;
use serde_json::json;

use crate::fanout::{ActivationRule, RequestSet};
use crate::upstream::ApiClient;

pub const GRAPH_SECURITY_RULE: ActivationRule = ActivationRule {
    source: "Graph Security API",
    product: "Microsoft Defender XDR",
    markers: &["not provisioned"],
};

pub const DEFENDER_API_RULE: ActivationRule = ActivationRule {
    source: "Defender API",
    product: "Microsoft Defender for Endpoint",
    markers: &["not provisioned", "not onboarded"],
};

/// Request names of the Graph Security sub-API.
pub mod graph {
    pub const ALERTS: &str = "alerts";
    pub const INCIDENTS: &str = "incidents";
    pub const SECURE_SCORES: &str = "secure_scores";
    pub const SECURE_SCORE_CONTROLS: &str = "secure_score_controls";
    pub const RISKY_USERS: &str = "risky_users";
    pub const RISKY_SIGN_INS: &str = "risky_sign_ins";
    pub const OAUTH_GRANTS: &str = "oauth_grants";
}

/// Request names of the Defender for Endpoint REST API.
pub mod api {
    pub const INCIDENTS: &str = "incidents";
    pub const MACHINES: &str = "machines";
    pub const VULNERABILITIES: &str = "vulnerabilities";
    pub const HUNTING_PROCESSES: &str = "hunting_copilot_processes";
    pub const HUNTING_NETWORK: &str = "hunting_copilot_network";
    pub const HUNTING_FILES: &str = "hunting_copilot_files";
    pub const HUNTING_EMAILS: &str = "hunting_copilot_emails";
    pub const EMAIL_THREATS: &str = "email_threats";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const SOFTWARE: &str = "software";
    pub const EXPOSURE_SCORE: &str = "exposure_score";
}

const PROCESS_QUERY: &str = r#"DeviceProcessEvents
| where Timestamp > ago(30d)
| where ProcessCommandLine has_any ('copilot', 'bing chat', 'edge://copilot', 'teams copilot')
    or InitiatingProcessCommandLine has_any ('copilot', 'ai assistant')
| where ActionType in ('ProcessCreated', 'ScriptExecution')
| summarize TotalEvents=count(), UniqueSuspiciousProcesses=dcount(FileName)
    by DeviceName, AccountName
| where TotalEvents > 5
| order by TotalEvents desc
| limit 100"#;

const NETWORK_QUERY: &str = r#"DeviceNetworkEvents
| where Timestamp > ago(30d)
| where RemoteUrl has_any ('openai.com', 'copilot', 'bing.com/chat', 'ai.azure.com')
    or InitiatingProcessFileName has_any ('Teams.exe', 'msedge.exe', 'powerpnt.exe', 'winword.exe', 'excel.exe')
| where ActionType in ('ConnectionSuccess', 'ConnectionRequest')
| summarize TotalConnections=count(), DataSent=sum(tolong(RemoteSentBytes))
    by DeviceName, InitiatingProcessFileName
| extend DataSentMB = DataSent / 1024 / 1024
| where DataSentMB > 10 or TotalConnections > 100
| order by DataSentMB desc
| limit 100"#;

const FILE_QUERY: &str = r#"DeviceFileEvents
| where Timestamp > ago(30d)
| where InitiatingProcessFileName has_any ('Teams.exe', 'msedge.exe', 'OneDrive.exe')
| where SensitivityLabel in ('Highly Confidential', 'Confidential', 'Secret')
    or FileName endswith_any ('.docx', '.xlsx', '.pptx', '.pdf')
| where ActionType in ('FileCreated', 'FileModified', 'FileRenamed', 'FileCopied')
| summarize TotalFileOperations=count(), UniqueSensitiveFiles=dcount(FileName)
    by DeviceName, AccountName, InitiatingProcessFileName
| where TotalFileOperations > 20
| order by UniqueSensitiveFiles desc
| limit 100"#;

const EMAIL_QUERY: &str = r#"EmailEvents
| where Timestamp > ago(30d)
| where Subject has_any ('copilot', 'AI assistant', 'chatgpt', 'openai', 'artificial intelligence')
    or EmailDirection == 'Inbound'
| where ThreatTypes has_any ('Phish', 'Malware', 'Spam')
| summarize TotalThreats=count(), PhishingAttempts=countif(ThreatTypes has 'Phish')
    by RecipientEmailAddress
| order by TotalThreats desc
| limit 100"#;

pub fn graph_security_requests(client: &ApiClient) -> RequestSet<'_> {
    let mut set = RequestSet::new();
    set.add(graph::ALERTS, client.get_collection("/v1.0/security/alerts_v2").boxed())
        .add(graph::INCIDENTS, client.get_collection("/v1.0/security/incidents").boxed())
        .add(graph::SECURE_SCORES, client.get_json("/v1.0/security/secureScores?$top=1").boxed())
        .add(
            graph::SECURE_SCORE_CONTROLS,
            client.get_collection("/v1.0/security/secureScoreControlProfiles").boxed(),
        )
        .add(graph::RISKY_USERS, client.get_collection("/v1.0/identityProtection/riskyUsers").boxed())
        .add(
            graph::RISKY_SIGN_INS,
            client.get_collection("/beta/auditLogs/signIns?$filter=riskState eq 'atRisk'").boxed(),
        )
        .add(graph::OAUTH_GRANTS, client.get_collection("/v1.0/oauth2PermissionGrants").boxed());
    set
}

/// Defender for Endpoint requests; `lookback_days` bounds the email detection window.
pub fn defender_api_requests(client: &ApiClient, lookback_days: i64) -> RequestSet<'_> {
    let since = (Utc::now() - Duration::days(lookback_days)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let email_path = format!("/api/EmailPostDeliveryDetections?$filter=DetectionTime ge {since}");

    let mut set = RequestSet::new();
    set.add(api::INCIDENTS, client.get_collection("/api/incidents").boxed())
        .add(api::MACHINES, client.get_collection("/api/machines").boxed())
        .add(api::VULNERABILITIES, client.get_collection("/api/vulnerabilities").boxed());
    for (name, query) in [
        (api::HUNTING_PROCESSES, PROCESS_QUERY),
        (api::HUNTING_NETWORK, NETWORK_QUERY),
        (api::HUNTING_FILES, FILE_QUERY),
        (api::HUNTING_EMAILS, EMAIL_QUERY),
    ] {
        set.add(name, async move {
            client.post_json("/api/advancedhunting/run", &json!({ "Query": query })).await
        }.boxed());
    }
    set.add(api::EMAIL_THREATS, async move { client.get_collection(&email_path).await }.boxed())
        .add(api::RECOMMENDATIONS, client.get_collection("/api/recommendations").boxed())
        .add(api::SOFTWARE, client.get_collection("/api/Software").boxed())
        .add(api::EXPOSURE_SCORE, client.get_json("/api/exposureScore").boxed());
    set
}
