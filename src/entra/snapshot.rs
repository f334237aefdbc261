use serde::Serialize;
use serde_json::Value;

use crate::fanout::CollectionStatus;
use crate::models::defender::{OAuthGrant, RiskyUser};
use crate::models::entra::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaSummary {
    pub total: u64,
    pub enabled: u64,
    pub disabled: u64,
    pub report_only: u64,
    pub require_mfa: u64,
    pub require_compliant_device: u64,
    pub require_managed_device: u64,
    pub target_m365_apps: u64,
    pub target_all_apps: u64,
    pub block_legacy_auth: u64,
    pub location_based: u64,
    pub user_risk_based: u64,
    pub signin_risk_based: u64,
}

/// Users registered per authentication method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCounts {
    pub microsoft_authenticator: u64,
    pub fido2: u64,
    pub windows_hello: u64,
    pub phone: u64,
    pub email: u64,
    pub software_oath: u64,
    pub temporary_access_pass: u64,
}

impl MethodCounts {
    /// Count one registration of a Graph method name; unknown names are ignored.
    pub fn record(&mut self, method: &str) {
        let slot = match method {
            "microsoftAuthenticator" | "microsoftAuthenticatorPush" | "microsoftAuthenticatorPasswordless" => {
                &mut self.microsoft_authenticator
            }
            "fido2" | "passKeyDeviceBound" | "passKeyDeviceBoundAuthenticator" => &mut self.fido2,
            "windowsHello" | "windowsHelloForBusiness" => &mut self.windows_hello,
            "phone" | "mobilePhone" | "alternateMobilePhone" | "officePhone" => &mut self.phone,
            "email" => &mut self.email,
            "softwareOath" | "softwareOneTimePasscode" | "hardwareOneTimePasscode" => &mut self.software_oath,
            "temporaryAccessPass" => &mut self.temporary_access_pass,
            _ => return,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthSummary {
    pub total_users: u64,
    pub mfa_registered: u64,
    pub mfa_capable: u64,
    pub passwordless_enabled: u64,
    pub mfa_registration_rate: f64,
    pub passwordless_adoption_rate: f64,
    pub methods: MethodCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub risky_users_total: u64,
    pub risky_users_high: u64,
    pub risky_users_medium: u64,
    pub risky_users_low: u64,
    pub confirmed_compromised: u64,
    pub at_risk: u64,
    pub remediated: u64,
    pub dismissed: u64,
    pub risk_detections_total: u64,
    pub risk_detections_high: u64,
    pub user_risk_policy_exists: bool,
    pub signin_risk_policy_exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PimSummary {
    pub total_active_assignments: u64,
    pub total_eligible_assignments: u64,
    pub total_time_bound_assignments: u64,
    /// Every standing role assignment counts as permanent.
    pub permanent_assignments: u64,
    pub permanent_global_admins: u64,
    /// Distinct roles with at least one standing assignment.
    pub permanent_privileged_roles: u64,
    pub eligible_assignments: u64,
    pub pim_enabled_roles: u64,
    /// Roles with standing assignments and no eligible schedule.
    pub roles_with_only_permanent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessReviewSummary {
    pub total_definitions: u64,
    pub active_reviews: u64,
    pub group_membership_reviews: u64,
    pub role_assignment_reviews: u64,
    pub application_assignment_reviews: u64,
    pub guest_user_reviews: u64,
    pub recurring_reviews: u64,
    pub one_time_reviews: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceComplianceSummary {
    pub total_managed: u64,
    pub compliant: u64,
    pub non_compliant: u64,
    pub in_grace_period: u64,
    pub not_applicable: u64,
    pub error: u64,
    pub compliance_rate: f64,
    pub corporate_owned: u64,
    pub personal_byod: u64,
    pub windows: u64,
    pub ios: u64,
    pub android: u64,
    pub macos: u64,
    pub compliance_policies_total: u64,
    pub ca_requires_compliance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupLicensingSummary {
    pub total_groups_with_licenses: u64,
    pub groups_with_errors: u64,
    pub copilot_license_groups: u64,
    pub dynamic_groups: u64,
    pub security_groups: u64,
    pub distribution_groups: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct B2bSummary {
    pub total_guests: u64,
    pub guests_with_licenses: u64,
    pub guest_invite_restrictions: String,
    pub cross_tenant_access_configured: bool,
    pub default_settings: Option<Value>,
    pub partner_configurations: u64,
}

impl Default for B2bSummary {
    fn default() -> Self {
        Self {
            total_guests: 0,
            guests_with_licenses: 0,
            guest_invite_restrictions: crate::metrics::UNKNOWN_BUCKET.to_string(),
            cross_tenant_access_configured: false,
            default_settings: None,
            partner_configurations: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsentSummary {
    pub total_apps: u64,
    pub apps_with_delegated_permissions: u64,
    pub user_consent_allowed: bool,
    pub admin_consent_required: bool,
    pub high_privilege_apps: u64,
    pub apps_with_graph_access: u64,
    pub apps_with_mail_access: u64,
    pub apps_with_files_access: u64,
    pub unverified_publishers: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthPolicySummary {
    pub guest_invite_setting: String,
    pub allow_users_to_register_apps: bool,
}

impl Default for AuthPolicySummary {
    fn default() -> Self {
        Self {
            guest_invite_setting: crate::metrics::UNKNOWN_BUCKET.to_string(),
            allow_users_to_register_apps: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SigninSummary {
    pub total_signins_sampled: u64,
    pub legacy_auth_attempts: u64,
    pub mfa_required: u64,
    pub mfa_success: u64,
    pub mfa_failure: u64,
    pub mfa_success_rate: f64,
    pub ca_success: u64,
    pub ca_failure: u64,
    pub failed_signins: u64,
    pub risky_signins: u64,
}

/// Outcome of the Global Secure Access requests behind a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AccessStatus {
    #[default]
    Success,
    PermissionDenied,
    NotLicensed,
    Error,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotLicensed => "NotLicensed",
            Self::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkAccessSummary {
    pub status: AccessStatus,
    pub error: Option<String>,
    pub enabled: bool,
    pub total_filtering_policies: u64,
    pub total_forwarding_profiles: u64,
    pub web_filtering_enabled: bool,
    pub traffic_forwarding_enabled: bool,
    pub fqdn_rules_count: u64,
    pub web_category_rules_count: u64,
    pub m365_traffic_forwarding: bool,
    pub internet_traffic_forwarding: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrivateAccessSummary {
    pub status: AccessStatus,
    pub error: Option<String>,
    pub enabled: bool,
    pub total_connectors: u64,
    pub active_connectors: u64,
    pub total_apps: u64,
}

/// Everything gathered from Graph for Entra ID posture, zero-defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntraSnapshot {
    pub available: bool,
    pub graph_available: bool,
    #[serde(flatten)]
    pub status: CollectionStatus,

    pub ca_policies: Vec<ConditionalAccessPolicy>,
    pub ca_summary: CaSummary,

    pub auth_methods_registration: Vec<RegistrationDetail>,
    pub auth_summary: AuthSummary,

    pub risky_users: Vec<RiskyUser>,
    pub risk_detections: Vec<RiskDetection>,
    pub risk_summary: RiskSummary,

    pub role_assignments: Vec<RoleAssignment>,
    pub role_eligibility_schedules: Vec<RoleSchedule>,
    pub role_assignment_schedules: Vec<RoleSchedule>,
    pub pim_summary: PimSummary,

    pub access_reviews: Vec<AccessReviewDefinition>,
    pub access_review_summary: AccessReviewSummary,

    pub managed_devices: Vec<ManagedDevice>,
    pub compliance_policies: Vec<CompliancePolicy>,
    pub device_summary: DeviceComplianceSummary,

    pub groups_with_licenses: Vec<LicensedGroup>,
    pub group_licensing_summary: GroupLicensingSummary,

    pub guest_users: Vec<GuestUser>,
    pub cross_tenant_access_policy: Option<CrossTenantAccessPolicy>,
    pub b2b_summary: B2bSummary,

    pub service_principals: Vec<ServicePrincipal>,
    pub oauth_permission_grants: Vec<OAuthGrant>,
    pub permission_grant_policies: Vec<PermissionGrantPolicy>,
    pub consent_summary: ConsentSummary,

    pub authorization_policy: Option<AuthorizationPolicy>,
    pub auth_policy_summary: AuthPolicySummary,

    pub signin_logs: Vec<SignIn>,
    pub signin_summary: SigninSummary,

    pub network_filtering_policies: Vec<FilteringPolicy>,
    pub network_forwarding_profiles: Vec<ForwardingProfile>,
    pub network_access_summary: NetworkAccessSummary,

    pub private_access_connectors: Vec<RemoteNetwork>,
    pub private_access_apps: Vec<PrivateAccessBranch>,
    pub private_access_summary: PrivateAccessSummary,
}

impl EntraSnapshot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshot_defaults() {
        let snap = EntraSnapshot::new();
        assert!(!snap.available && !snap.graph_available);
        assert_eq!(snap.ca_summary, CaSummary::default());
        assert_eq!(snap.auth_summary.mfa_registration_rate, 0.0);
        assert_eq!(snap.b2b_summary.guest_invite_restrictions, "Unknown");
        assert_eq!(snap.auth_policy_summary.guest_invite_setting, "Unknown");
        assert_eq!(snap.network_access_summary.status, AccessStatus::Success);
        assert!(snap.cross_tenant_access_policy.is_none());
    }

    #[test]
    fn test_method_counts_aliases() {
        let mut counts = MethodCounts::default();
        for method in ["microsoftAuthenticatorPush", "fido2", "windowsHelloForBusiness", "mobilePhone", "password"] {
            counts.record(method);
        }
        assert_eq!(counts.microsoft_authenticator, 1);
        assert_eq!(counts.fido2, 1);
        assert_eq!(counts.windows_hello, 1);
        assert_eq!(counts.phone, 1);
        assert_eq!(counts.email, 0);
    }

    #[test]
    fn test_method_counts_serialize_graph_names() {
        let json = serde_json::to_value(MethodCounts::default()).unwrap();
        assert!(json.get("microsoftAuthenticator").is_some());
        assert!(json.get("windowsHello").is_some());
        assert!(json.get("temporaryAccessPass").is_some());
    }

    #[test]
    fn test_access_status_strings() {
        assert_eq!(AccessStatus::NotLicensed.as_str(), "NotLicensed");
        assert_eq!(serde_json::to_value(AccessStatus::PermissionDenied).unwrap(), "PermissionDenied");
    }
}
