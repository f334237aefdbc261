//! Graph request sets for Entra ID posture.

use chrono::{Duration, SecondsFormat, Utc};
use futures::FutureExt;

use crate::fanout::{ActivationRule, RequestSet};
use crate::upstream::ApiClient;

/// Entra has no tenant-level provisioning signal; every 403 is a permission gap.
pub const ENTRA_RULE: ActivationRule = ActivationRule {
    source: "Graph",
    product: "Microsoft Entra ID",
    markers: &[],
};

pub const GLOBAL_SECURE_ACCESS_RULE: ActivationRule = ActivationRule {
    source: "Global Secure Access",
    product: "Microsoft Entra Suite",
    markers: &[],
};

/// Days of sign-in history sampled.
pub const SIGNIN_SAMPLE_DAYS: i64 = 7;
/// Sign-ins are sampled from the first page only.
pub const SIGNIN_SAMPLE_SIZE: usize = 500;

pub mod names {
    pub const CA_POLICIES: &str = "ca_policies";
    pub const AUTH_METHODS: &str = "auth_methods";
    pub const RISKY_USERS: &str = "risky_users";
    pub const RISK_DETECTIONS: &str = "risk_detections";
    pub const ROLE_ASSIGNMENTS: &str = "role_assignments";
    pub const ROLE_ELIGIBILITY_SCHEDULES: &str = "role_eligibility_schedules";
    pub const ROLE_ASSIGNMENT_SCHEDULES: &str = "role_assignment_schedules";
    pub const ACCESS_REVIEWS: &str = "access_reviews";
    pub const MANAGED_DEVICES: &str = "managed_devices";
    pub const COMPLIANCE_POLICIES: &str = "compliance_policies";
    pub const GROUPS: &str = "groups";
    pub const GUESTS: &str = "guests";
    pub const CROSS_TENANT_POLICY: &str = "cross_tenant_policy";
    pub const SERVICE_PRINCIPALS: &str = "service_principals";
    pub const OAUTH_GRANTS: &str = "oauth_grants";
    pub const CONSENT_POLICIES: &str = "consent_policies";
    pub const AUTHORIZATION_POLICY: &str = "authorization_policy";
    pub const SIGNIN_LOGS: &str = "signin_logs";
}

/// Global Secure Access (beta networkAccess) request names.
pub mod network {
    pub const FILTERING_POLICIES: &str = "filtering_policies";
    pub const FORWARDING_PROFILES: &str = "forwarding_profiles";
    pub const REMOTE_NETWORKS: &str = "remote_networks";
    pub const BRANCHES: &str = "branches";

    /// Requests behind the Internet Access summary.
    pub const INTERNET_ACCESS: &[&str] = &[FILTERING_POLICIES, FORWARDING_PROFILES];
    /// Requests behind the Private Access summary; branch failures are not reported.
    pub const PRIVATE_ACCESS: &[&str] = &[REMOTE_NETWORKS];
}

/// The 18 directory, identity and Intune requests.
pub fn directory_requests(client: &ApiClient) -> RequestSet<'_> {
    use names::*;

    let since = (Utc::now() - Duration::days(SIGNIN_SAMPLE_DAYS)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let signin_path = format!("/v1.0/auditLogs/signIns?$filter=createdDateTime ge {since}&$top={SIGNIN_SAMPLE_SIZE}");

    let mut set = RequestSet::new();
    set.add(CA_POLICIES, client.get_collection("/v1.0/identity/conditionalAccess/policies").boxed())
        .add(
            AUTH_METHODS,
            client.get_collection("/v1.0/reports/authenticationMethods/userRegistrationDetails").boxed(),
        )
        .add(RISKY_USERS, client.get_collection("/v1.0/identityProtection/riskyUsers").boxed())
        .add(RISK_DETECTIONS, client.get_collection("/v1.0/identityProtection/riskDetections").boxed())
        .add(ROLE_ASSIGNMENTS, client.get_collection("/v1.0/roleManagement/directory/roleAssignments").boxed())
        .add(
            ROLE_ELIGIBILITY_SCHEDULES,
            client.get_collection("/v1.0/roleManagement/directory/roleEligibilitySchedules").boxed(),
        )
        .add(
            ROLE_ASSIGNMENT_SCHEDULES,
            client.get_collection("/v1.0/roleManagement/directory/roleAssignmentSchedules").boxed(),
        )
        .add(ACCESS_REVIEWS, client.get_collection("/v1.0/identityGovernance/accessReviews/definitions").boxed())
        .add(MANAGED_DEVICES, client.get_collection("/v1.0/deviceManagement/managedDevices").boxed())
        .add(
            COMPLIANCE_POLICIES,
            client.get_collection("/v1.0/deviceManagement/deviceCompliancePolicies").boxed(),
        )
        .add(
            GROUPS,
            client
                .get_collection(
                    "/v1.0/groups?$filter=assignedLicenses/$count ne 0&$count=true&$top=999\
                     &$select=id,displayName,groupTypes,securityEnabled,mailEnabled,assignedLicenses,licenseProcessingState",
                )
                .boxed(),
        )
        .add(
            GUESTS,
            client
                .get_collection(
                    "/v1.0/users?$filter=userType eq 'Guest'&$top=999\
                     &$select=id,displayName,userPrincipalName,createdDateTime,assignedLicenses",
                )
                .boxed(),
        )
        .add(
            CROSS_TENANT_POLICY,
            client.get_json("/v1.0/policies/crossTenantAccessPolicy?$expand=default,partners").boxed(),
        )
        .add(
            SERVICE_PRINCIPALS,
            client
                .get_collection("/v1.0/servicePrincipals?$top=500&$select=id,appId,displayName,publisherName")
                .boxed(),
        )
        .add(OAUTH_GRANTS, client.get_collection("/v1.0/oauth2PermissionGrants").boxed())
        .add(CONSENT_POLICIES, client.get_collection("/v1.0/policies/permissionGrantPolicies").boxed())
        .add(AUTHORIZATION_POLICY, client.get_json("/v1.0/policies/authorizationPolicy").boxed())
        .add(SIGNIN_LOGS, async move { client.get_json(&signin_path).await }.boxed());
    set
}

/// Global Secure Access configuration, beta endpoints.
pub fn network_access_requests(client: &ApiClient) -> RequestSet<'_> {
    use network::*;

    let mut set = RequestSet::new();
    set.add(FILTERING_POLICIES, client.get_collection("/beta/networkAccess/filteringPolicies").boxed())
        .add(FORWARDING_PROFILES, client.get_collection("/beta/networkAccess/forwardingProfiles").boxed())
        .add(
            REMOTE_NETWORKS,
            client.get_collection("/beta/networkAccess/connectivity/remoteNetworks").boxed(),
        )
        .add(BRANCHES, client.get_collection("/beta/networkAccess/connectivity/branches").boxed());
    set
}
